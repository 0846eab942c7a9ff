//! Uniform compress/decompress over four interchangeable algorithms.
//!
//! The chunked file store always compresses whole chunk payloads before
//! writing and decompresses them on read; which algorithm is used is a
//! per-Swamp setting, but the engine default is [`Algorithm::Snappy`] for
//! its microsecond-scale per-op latency.

use hydraide_core::error::{HydraideError, HydraideResult};
use std::io::{Read, Write};

/// A compression algorithm a chunk file may be encoded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Algorithm {
    /// Default: lowest per-op latency, modest ratio.
    Snappy,
    /// Fast, slightly better ratio than Snappy on structured data.
    Lz4,
    /// Widely compatible, slower than the others.
    Gzip,
    /// Best ratio, highest CPU cost; suited to cold/rarely-touched chunks.
    Zstd,
}

impl Default for Algorithm {
    fn default() -> Self {
        Algorithm::Snappy
    }
}

/// Compress `input` with `algorithm`. Never lossy: a failure is surfaced,
/// not swallowed or truncated.
pub fn compress(algorithm: Algorithm, input: &[u8]) -> HydraideResult<Vec<u8>> {
    match algorithm {
        Algorithm::Snappy => {
            let mut encoder = snap::raw::Encoder::new();
            encoder
                .compress_vec(input)
                .map_err(|e| HydraideError::transient_with_source("snappy compress failed", e))
        }
        Algorithm::Lz4 => Ok(lz4_flex::compress_prepend_size(input)),
        Algorithm::Gzip => {
            use flate2::write::GzEncoder;
            use flate2::Compression;
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder
                .write_all(input)
                .map_err(|e| HydraideError::transient_with_source("gzip compress failed", e))?;
            encoder
                .finish()
                .map_err(|e| HydraideError::transient_with_source("gzip compress failed", e))
        }
        Algorithm::Zstd => zstd::stream::encode_all(input, 0)
            .map_err(|e| HydraideError::transient_with_source("zstd compress failed", e)),
    }
}

/// Decompress `input`, previously produced by [`compress`] with the same
/// `algorithm`.
pub fn decompress(algorithm: Algorithm, input: &[u8]) -> HydraideResult<Vec<u8>> {
    match algorithm {
        Algorithm::Snappy => {
            let mut decoder = snap::raw::Decoder::new();
            decoder
                .decompress_vec(input)
                .map_err(|e| HydraideError::transient_with_source("snappy decompress failed", e))
        }
        Algorithm::Lz4 => lz4_flex::decompress_size_prepended(input)
            .map_err(|e| HydraideError::transient_with_source("lz4 decompress failed", e)),
        Algorithm::Gzip => {
            use flate2::read::GzDecoder;
            let mut decoder = GzDecoder::new(input);
            let mut out = Vec::new();
            decoder
                .read_to_end(&mut out)
                .map_err(|e| HydraideError::transient_with_source("gzip decompress failed", e))?;
            Ok(out)
        }
        Algorithm::Zstd => zstd::stream::decode_all(input)
            .map_err(|e| HydraideError::transient_with_source("zstd decompress failed", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(algorithm: Algorithm) {
        let input = b"the quick brown fox jumps over the lazy dog".repeat(64);
        let compressed = compress(algorithm, &input).unwrap();
        let decompressed = decompress(algorithm, &compressed).unwrap();
        assert_eq!(decompressed, input);
    }

    #[test]
    fn snappy_roundtrip() {
        roundtrip(Algorithm::Snappy);
    }

    #[test]
    fn lz4_roundtrip() {
        roundtrip(Algorithm::Lz4);
    }

    #[test]
    fn gzip_roundtrip() {
        roundtrip(Algorithm::Gzip);
    }

    #[test]
    fn zstd_roundtrip() {
        roundtrip(Algorithm::Zstd);
    }

    #[test]
    fn empty_input_roundtrips() {
        for algorithm in [Algorithm::Snappy, Algorithm::Lz4, Algorithm::Gzip, Algorithm::Zstd] {
            let compressed = compress(algorithm, &[]).unwrap();
            let decompressed = decompress(algorithm, &compressed).unwrap();
            assert!(decompressed.is_empty());
        }
    }

    #[test]
    fn corrupt_input_surfaces_an_error() {
        let garbage = vec![0xFF; 16];
        assert!(decompress(Algorithm::Snappy, &garbage).is_err());
        assert!(decompress(Algorithm::Zstd, &garbage).is_err());
    }

    #[test]
    fn default_is_snappy() {
        assert_eq!(Algorithm::default(), Algorithm::Snappy);
    }
}
