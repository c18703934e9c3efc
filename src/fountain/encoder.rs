use bitvec::prelude::*;
use rayon::prelude::*;

use crate::chunker::Chunk;
use crate::config;
use crate::fountain::rng::XorShift32;
use crate::fountain::soliton::RobustSoliton;
use crate::fountain::xor_bytes;
use crate::packet::Packet;

/// Fountain-encode `chunks` into `M = ceil(N * (1 + redundancy))` packets.
///
/// The first N packets are systematic (packet i carries chunk i verbatim),
/// so a lossless channel decodes in O(N). Repair packets follow with seed
/// labels N, N+1, …: each seeds a xorshift32 with `label + stream_seed`,
/// draws a Robust Soliton degree, then that many distinct chunk indices,
/// and XORs the selected chunks together. Repair generation is pure per
/// seed, so it runs in parallel without changing the emitted sequence.
pub fn encode(chunks: &[Chunk], redundancy: f32, stream_seed: u32) -> Vec<Packet> {
    assert!(!chunks.is_empty(), "cannot encode zero chunks");

    let n = chunks.len();
    let total = (n as f64 * (1.0 + redundancy as f64)).ceil() as usize;
    let dist = RobustSoliton::new(n, config::SOLITON_C, config::SOLITON_DELTA);

    let mut packets: Vec<Packet> = chunks
        .iter()
        .map(|c| Packet::systematic(c.index, n, c.data.clone()))
        .collect();

    let repairs: Vec<Packet> = (n..total)
        .into_par_iter()
        .map(|label| repair_packet(chunks, &dist, label as u32, stream_seed))
        .collect();
    packets.extend(repairs);

    packets
}

fn repair_packet(chunks: &[Chunk], dist: &RobustSoliton, label: u32, stream_seed: u32) -> Packet {
    let n = chunks.len();
    let mut rng = XorShift32::new(label.wrapping_add(stream_seed));

    let degree = dist.sample(&mut rng).min(n);

    let mut mask = bitvec![u8, Lsb0; 0; n];
    let mut picked = 0usize;
    while picked < degree {
        let idx = rng.next_below(n);
        if !mask[idx] {
            mask.set(idx, true);
            picked += 1;
        }
    }

    let mut payload = vec![0u8; chunks[0].data.len()];
    for idx in mask.iter_ones() {
        xor_bytes(&mut payload, &chunks[idx].data);
    }

    Packet::new(label, mask, payload)
}
