//! Content verification primitives for mirrored artifacts.
//!
//! The provider publishes one MD5 digest per package, in whatever letter case
//! it happens to emit. [`decode_hex_digest`] normalises that text into raw
//! bytes; [`Hasher`] computes digests incrementally so a transfer can be
//! verified in the same pass that writes it to disk.
//!
//! # Example
//!
//! ```
//! use hypmirror_verify::{Md5Hasher, VerifiedReader, decode_hex_digest};
//!
//! let expected = decode_hex_digest("5EB63BBBE01EEED093CB22BB8F5ACDC3", Md5Hasher::OUTPUT_LEN).unwrap();
//! let mut reader = VerifiedReader::new(&b"hello world"[..], Md5Hasher::new());
//! std::io::copy(&mut reader, &mut std::io::sink()).unwrap();
//! reader.finish(&expected).unwrap();
//! ```

pub use self::error::{Result, VerificationError};
pub use self::hasher::{Hasher, Md5Hasher};
pub use self::reader::VerifiedReader;

mod error;
mod hasher;
mod reader;

use std::path::Path;

/// Decode a hex digest of `expected_len` bytes, accepting either letter case.
pub fn decode_hex_digest(value: &str, expected_len: usize) -> Result<Vec<u8>> {
    let invalid = || VerificationError::InvalidDigest {
        value: value.to_string(),
        expected_len,
    };
    let bytes = hex::decode(value.trim()).map_err(|_| invalid())?;
    if bytes.len() != expected_len {
        return Err(invalid());
    }
    Ok(bytes)
}

/// Hash an existing file with `hasher` and compare against `expected`.
pub fn verify_file<H: Hasher>(path: impl AsRef<Path>, hasher: H, expected: &[u8]) -> Result<()> {
    let file = std::fs::File::open(path.as_ref())?;
    let mut reader = VerifiedReader::new(std::io::BufReader::new(file), hasher);
    std::io::copy(&mut reader, &mut std::io::sink())?;
    reader.finish(expected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_hex_digest_case_insensitive() {
        let lower = decode_hex_digest("5eb63bbbe01eeed093cb22bb8f5acdc3", 16).unwrap();
        let upper = decode_hex_digest("5EB63BBBE01EEED093CB22BB8F5ACDC3", 16).unwrap();
        assert_eq!(lower, upper);
    }

    #[test]
    fn test_decode_hex_digest_wrong_length() {
        assert!(matches!(
            decode_hex_digest("abcd", 16),
            Err(VerificationError::InvalidDigest { expected_len: 16, .. })
        ));
        assert!(decode_hex_digest("zz", 1).is_err());
    }

    #[test]
    fn test_verify_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("payload.bin");
        std::fs::write(&path, b"hello world").unwrap();

        let expected = Md5Hasher::digest(b"hello world");
        verify_file(&path, Md5Hasher::new(), &expected).unwrap();
        assert!(verify_file(&path, Md5Hasher::new(), &[0; 16]).is_err());
    }
}
