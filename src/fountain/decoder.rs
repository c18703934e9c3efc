use std::collections::BTreeSet;

use bitvec::prelude::*;
use log::debug;

use crate::error::{Result, RvsError};
use crate::fountain::xor_bytes;
use crate::integrity;
use crate::packet::Packet;

/// A stored packet, reduced against every chunk solved so far. The
/// decoder matrix is this flat vector of rows; cascading substitution
/// is a sweep over it, not a walk through a linked graph.
struct Row {
    mask: BitVec<u8, Lsb0>,
    payload: Vec<u8>,
}

/// Online fountain decoder.
///
/// Packets are fed in one at a time, in any order. Each is reduced
/// against already-solved chunks; singletons solve a chunk immediately
/// and cascade through the stored rows. If peeling stalls, a final
/// Gaussian elimination over GF(2) extracts whatever rank remains.
pub struct FountainDecoder {
    num_chunks: usize,
    chunk_size: usize,
    solved: Vec<Option<Vec<u8>>>,
    solved_count: usize,
    rows: Vec<Row>,
    packets_absorbed: u64,
}

impl FountainDecoder {
    pub fn new(num_chunks: usize, chunk_size: usize) -> Self {
        assert!(num_chunks > 0, "decoder needs at least one chunk");
        assert!(chunk_size > 0, "decoder needs a positive chunk size");
        Self {
            num_chunks,
            chunk_size,
            solved: vec![None; num_chunks],
            solved_count: 0,
            rows: Vec::new(),
            packets_absorbed: 0,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.solved_count == self.num_chunks
    }

    pub fn packets_absorbed(&self) -> u64 {
        self.packets_absorbed
    }

    /// Source chunks still unsolved.
    pub fn missing(&self) -> BTreeSet<u32> {
        self.solved
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_none())
            .map(|(i, _)| i as u32)
            .collect()
    }

    /// Feed one packet. Returns `Ok(true)` once all chunks are solved.
    /// Malformed packets (bad CRC, wrong geometry) are discarded; the
    /// redundancy budget exists to absorb exactly that. Packets that
    /// contradict already-solved chunks are fatal.
    pub fn absorb(&mut self, packet: Packet) -> Result<bool> {
        if self.is_complete() {
            return Ok(true);
        }

        if packet.mask.len() != self.num_chunks
            || packet.payload.len() != self.chunk_size
            || packet.mask.not_any()
        {
            debug!("discarding packet with mismatched geometry");
            return Ok(false);
        }
        if integrity::crc32(&packet.payload) != packet.xor_crc {
            debug!("discarding packet seed={} with bad payload CRC", packet.seed);
            return Ok(false);
        }
        self.packets_absorbed += 1;

        let Packet {
            mut mask,
            mut payload,
            ..
        } = packet;

        // Reduce against everything already solved.
        let set: Vec<usize> = mask.iter_ones().collect();
        for j in set {
            if let Some(known) = &self.solved[j] {
                xor_bytes(&mut payload, known);
                mask.set(j, false);
            }
        }

        match mask.count_ones() {
            0 => {
                if payload.iter().any(|&b| b != 0) {
                    return Err(RvsError::IntegrityFailure(
                        "packet contradicts solved chunks".into(),
                    ));
                }
                // Fully redundant, nothing new.
            }
            1 => {
                if let Some(j) = mask.first_one() {
                    self.solve_chunk(j, payload)?;
                }
            }
            _ => self.rows.push(Row { mask, payload }),
        }

        Ok(self.is_complete())
    }

    /// Record a solved chunk and sweep the stored rows, clearing its bit
    /// everywhere; rows that collapse to new singletons queue up behind it.
    fn solve_chunk(&mut self, index: usize, payload: Vec<u8>) -> Result<()> {
        match &self.solved[index] {
            Some(existing) if *existing != payload => {
                return Err(RvsError::IntegrityFailure(format!(
                    "conflicting solutions for chunk {index}"
                )));
            }
            Some(_) => return Ok(()),
            None => {
                self.solved[index] = Some(payload);
                self.solved_count += 1;
            }
        }

        let mut worklist = vec![index];
        while let Some(j) = worklist.pop() {
            let Some(known) = self.solved[j].clone() else {
                continue;
            };
            let stored = std::mem::take(&mut self.rows);
            for mut row in stored {
                if row.mask[j] {
                    xor_bytes(&mut row.payload, &known);
                    row.mask.set(j, false);
                }
                match row.mask.count_ones() {
                    0 => {
                        if row.payload.iter().any(|&b| b != 0) {
                            return Err(RvsError::IntegrityFailure(
                                "row contradicts solved chunks".into(),
                            ));
                        }
                    }
                    1 => {
                        let Some(k) = row.mask.first_one() else {
                            continue;
                        };
                        match &self.solved[k] {
                            Some(existing) if *existing != row.payload => {
                                return Err(RvsError::IntegrityFailure(format!(
                                    "conflicting solutions for chunk {k}"
                                )));
                            }
                            Some(_) => {}
                            None => {
                                self.solved[k] = Some(row.payload);
                                self.solved_count += 1;
                                worklist.push(k);
                            }
                        }
                    }
                    _ => self.rows.push(row),
                }
            }
        }
        Ok(())
    }

    /// Gaussian elimination over GF(2) on the stored rows, payloads XORed
    /// in lockstep. Solves systems the peeling pass stalls on whenever
    /// the received rows reach full rank.
    fn gaussian_eliminate(&mut self) -> Result<()> {
        let incoming = std::mem::take(&mut self.rows);
        let mut rows: Vec<Row> = Vec::with_capacity(incoming.len());
        let mut pivots: Vec<(usize, usize)> = Vec::new(); // (column, row index)

        // Forward pass: reduce each row by prior pivots until it either
        // vanishes or contributes a fresh pivot column.
        for mut row in incoming {
            loop {
                let Some(lead) = row.mask.first_one() else {
                    if row.payload.iter().any(|&b| b != 0) {
                        return Err(RvsError::IntegrityFailure(
                            "inconsistent packet system".into(),
                        ));
                    }
                    break;
                };
                match pivots.iter().find(|&&(col, _)| col == lead) {
                    Some(&(_, r)) => {
                        let pivot = &rows[r];
                        row.mask ^= pivot.mask.as_bitslice();
                        xor_bytes(&mut row.payload, &pivot.payload);
                    }
                    None => {
                        pivots.push((lead, rows.len()));
                        rows.push(row);
                        break;
                    }
                }
            }
        }

        // Backward pass, highest pivot column first. Afterwards each pivot
        // row holds its own column plus only pivot-less columns; rows left
        // as singletons are solved chunks.
        pivots.sort_by(|a, b| b.0.cmp(&a.0));
        for i in 0..pivots.len() {
            let (col, r) = pivots[i];
            for &(col2, r2) in &pivots[..i] {
                if col2 > col && rows[r].mask[col2] {
                    let (dst, src) = index_two(&mut rows, r, r2);
                    dst.mask ^= src.mask.as_bitslice();
                    xor_bytes(&mut dst.payload, &src.payload);
                }
            }
            if rows[r].mask.count_ones() == 1 {
                let payload = rows[r].payload.clone();
                self.solve_chunk(col, payload)?;
            }
        }

        Ok(())
    }

    /// Finish decoding and hand back the chunks in index order. Runs the
    /// elimination fallback if peeling alone did not get there; reports
    /// the missing chunk set if the received packets never reached full
    /// rank.
    pub fn into_chunks(mut self) -> Result<Vec<Vec<u8>>> {
        if !self.is_complete() {
            self.gaussian_eliminate()?;
        }
        if !self.is_complete() {
            return Err(RvsError::IncompleteRecovery {
                missing: self.missing(),
            });
        }
        Ok(self.solved.into_iter().flatten().collect())
    }
}

fn index_two(rows: &mut [Row], a: usize, b: usize) -> (&mut Row, &Row) {
    debug_assert_ne!(a, b);
    if a < b {
        let (lo, hi) = rows.split_at_mut(b);
        (&mut lo[a], &hi[0])
    } else {
        let (lo, hi) = rows.split_at_mut(a);
        (&mut hi[0], &lo[b])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunker;
    use crate::fountain::encoder::encode;

    fn mask_of(bits: &[usize], n: usize) -> BitVec<u8, Lsb0> {
        let mut mask = bitvec![u8, Lsb0; 0; n];
        for &b in bits {
            mask.set(b, true);
        }
        mask
    }

    fn combine(chunks: &[Vec<u8>], bits: &[usize]) -> Vec<u8> {
        let mut out = vec![0u8; chunks[0].len()];
        for &b in bits {
            xor_bytes(&mut out, &chunks[b]);
        }
        out
    }

    fn test_chunks(n: usize, size: usize) -> Vec<Vec<u8>> {
        (0..n)
            .map(|i| (0..size).map(|j| ((i * 37 + j * 11) % 256) as u8).collect())
            .collect()
    }

    #[test]
    fn test_systematic_only() {
        let chunks = test_chunks(4, 32);
        let mut dec = FountainDecoder::new(4, 32);
        for (i, c) in chunks.iter().enumerate() {
            dec.absorb(Packet::systematic(i as u32, 4, c.clone())).unwrap();
        }
        assert!(dec.is_complete());
        assert_eq!(dec.into_chunks().unwrap(), chunks);
    }

    #[test]
    fn test_peeling_cascade() {
        // {1}, then {0,1} peels chunk 0, then {0,2} peels chunk 2.
        let chunks = test_chunks(3, 16);
        let mut dec = FountainDecoder::new(3, 16);

        let p01 = Packet::new(10, mask_of(&[0, 1], 3), combine(&chunks, &[0, 1]));
        let p02 = Packet::new(11, mask_of(&[0, 2], 3), combine(&chunks, &[0, 2]));
        assert!(!dec.absorb(p01).unwrap());
        assert!(!dec.absorb(p02).unwrap());
        assert!(dec.absorb(Packet::systematic(1, 3, chunks[1].clone())).unwrap());

        assert_eq!(dec.into_chunks().unwrap(), chunks);
    }

    #[test]
    fn test_gaussian_elimination_rescues_stalled_peel() {
        // {0,1}, {1,2}, {0,1,2}: no singletons anywhere, yet rank 3.
        let chunks = test_chunks(3, 24);
        let mut dec = FountainDecoder::new(3, 24);
        dec.absorb(Packet::new(5, mask_of(&[0, 1], 3), combine(&chunks, &[0, 1])))
            .unwrap();
        dec.absorb(Packet::new(6, mask_of(&[1, 2], 3), combine(&chunks, &[1, 2])))
            .unwrap();
        dec.absorb(Packet::new(
            7,
            mask_of(&[0, 1, 2], 3),
            combine(&chunks, &[0, 1, 2]),
        ))
        .unwrap();

        assert!(!dec.is_complete());
        assert_eq!(dec.into_chunks().unwrap(), chunks);
    }

    #[test]
    fn test_incomplete_recovery_reports_missing() {
        let chunks = test_chunks(3, 16);
        let mut dec = FountainDecoder::new(3, 16);
        dec.absorb(Packet::new(5, mask_of(&[0, 1], 3), combine(&chunks, &[0, 1])))
            .unwrap();
        dec.absorb(Packet::new(6, mask_of(&[1, 2], 3), combine(&chunks, &[1, 2])))
            .unwrap();

        match dec.into_chunks() {
            Err(RvsError::IncompleteRecovery { missing }) => {
                assert_eq!(missing, [0u32, 1, 2].into_iter().collect());
            }
            other => panic!("expected IncompleteRecovery, got {other:?}"),
        }
    }

    #[test]
    fn test_bad_crc_packet_is_discarded() {
        let chunks = test_chunks(2, 16);
        let mut dec = FountainDecoder::new(2, 16);
        let mut pkt = Packet::systematic(0, 2, chunks[0].clone());
        pkt.xor_crc ^= 1;
        assert!(!dec.absorb(pkt).unwrap());
        assert_eq!(dec.packets_absorbed(), 0);
        assert_eq!(dec.missing().len(), 2);
    }

    #[test]
    fn test_conflicting_packet_is_integrity_failure() {
        let chunks = test_chunks(2, 16);
        let mut dec = FountainDecoder::new(2, 16);
        dec.absorb(Packet::systematic(0, 2, chunks[0].clone())).unwrap();

        let mut forged = chunks[0].clone();
        forged[3] ^= 0xFF;
        let result = dec.absorb(Packet::systematic(0, 2, forged));
        assert!(matches!(result, Err(RvsError::IntegrityFailure(_))));
    }

    #[test]
    fn test_duplicate_packets_are_harmless() {
        let chunks = test_chunks(2, 16);
        let mut dec = FountainDecoder::new(2, 16);
        let pkt = Packet::systematic(0, 2, chunks[0].clone());
        dec.absorb(pkt.clone()).unwrap();
        dec.absorb(pkt).unwrap();
        assert_eq!(dec.missing(), [1u32].into_iter().collect());
    }

    #[test]
    fn test_full_stream_decodes_in_any_order() {
        let data: Vec<u8> = (0..5000u32).map(|i| (i % 241) as u8).collect();
        let chunks = chunker::split(&data, 256);
        let n = chunks.len();
        let mut packets = encode(&chunks, 1.0, 0);
        packets.reverse();

        let mut dec = FountainDecoder::new(n, 256);
        for pkt in packets {
            if dec.absorb(pkt).unwrap() {
                break;
            }
        }
        let recovered = dec.into_chunks().unwrap();
        assert_eq!(chunker::reassemble(&recovered, data.len() as u64), data);
    }

    #[test]
    fn test_survives_losing_every_repair_packet() {
        let data = vec![0x5Au8; 4096];
        let chunks = chunker::split(&data, 512);
        let packets = encode(&chunks, 0.5, 9);

        let mut dec = FountainDecoder::new(8, 512);
        for pkt in packets.into_iter().take(8) {
            dec.absorb(pkt).unwrap();
        }
        assert!(dec.is_complete());
    }

    #[test]
    fn test_single_chunk_recovered_from_repair_alone() {
        let chunks = chunker::split(b"hello world", 4096);
        let packets = encode(&chunks, 0.3, 0);
        assert_eq!(packets.len(), 2);

        let mut dec = FountainDecoder::new(1, 4096);
        assert!(dec.absorb(packets[1].clone()).unwrap());
        let out = dec.into_chunks().unwrap();
        assert_eq!(chunker::reassemble(&out, 11), b"hello world");
    }

    #[test]
    fn test_extra_packets_after_completion_are_ignored() {
        let chunks = test_chunks(1, 8);
        let mut dec = FountainDecoder::new(1, 8);
        assert!(dec.absorb(Packet::systematic(0, 1, chunks[0].clone())).unwrap());
        assert!(dec.absorb(Packet::systematic(0, 1, vec![9u8; 8])).unwrap());
        assert_eq!(dec.into_chunks().unwrap()[0], chunks[0]);
    }
}
