use crate::integrity;

/// A fixed-size source chunk. `data` is always exactly the configured
/// chunk size; the final chunk of a file is zero-padded up to it. The
/// per-chunk CRC is diagnostic only: the wire carries CRCs over XOR
/// payloads, and whole-file truncation is governed by the metadata
/// `file_size`, not per-chunk lengths.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub index: u32,
    pub crc32: u32,
    pub data: Vec<u8>,
}

/// Split a byte buffer into `ceil(len / chunk_size)` zero-padded chunks.
pub fn split(data: &[u8], chunk_size: usize) -> Vec<Chunk> {
    assert!(chunk_size > 0, "chunk_size must be positive");

    let num_chunks = (data.len() + chunk_size - 1) / chunk_size;
    let mut chunks = Vec::with_capacity(num_chunks);

    for (i, slice) in data.chunks(chunk_size).enumerate() {
        let mut buf = vec![0u8; chunk_size];
        buf[..slice.len()].copy_from_slice(slice);
        chunks.push(Chunk {
            index: i as u32,
            crc32: integrity::crc32(&buf),
            data: buf,
        });
    }

    chunks
}

/// Reverse of [`split`]: concatenate recovered chunk payloads in index
/// order and trim the zero padding off the tail.
pub fn reassemble(chunks: &[Vec<u8>], file_size: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(chunks.iter().map(Vec::len).sum());
    for data in chunks {
        out.extend_from_slice(data);
    }
    out.truncate(file_size as usize);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_single() {
        let data = vec![7u8; 100];
        let chunks = split(&data, 1024);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].index, 0);
        assert_eq!(chunks[0].data.len(), 1024);
        assert_eq!(&chunks[0].data[..100], &data[..]);
        assert!(chunks[0].data[100..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_split_multiple() {
        let data = vec![0xABu8; 2500];
        let chunks = split(&data, 1000);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.data.len() == 1000));
        assert_eq!(chunks[2].data[499], 0xAB);
        assert_eq!(chunks[2].data[500], 0);
    }

    #[test]
    fn test_split_exact_multiple() {
        let chunks = split(&vec![1u8; 2048], 1024);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[1].data.iter().all(|&b| b == 1));
    }

    #[test]
    fn test_chunk_crc_matches_padded_payload() {
        let chunks = split(b"hello world", 16);
        assert_eq!(chunks[0].crc32, integrity::crc32(&chunks[0].data));
    }

    #[test]
    fn test_reassemble_trims_padding() {
        let data: Vec<u8> = (0..5000).map(|i| (i % 251) as u8).collect();
        let chunks = split(&data, 2000);
        let payloads: Vec<Vec<u8>> = chunks.into_iter().map(|c| c.data).collect();
        assert_eq!(reassemble(&payloads, data.len() as u64), data);
    }

    #[test]
    fn test_roundtrip_exact_boundary() {
        let data = vec![0u8; 4096];
        let chunks = split(&data, 4096);
        assert_eq!(chunks.len(), 1);
        let payloads: Vec<Vec<u8>> = chunks.into_iter().map(|c| c.data).collect();
        assert_eq!(reassemble(&payloads, 4096), data);
    }
}
