//! Content digests for change detection.
//!
//! SHA-256 over the full file contents. Two files are treated as identical iff
//! their digests match.

use std::{
    fmt,
    fs::File,
    io,
    path::Path,
    str::FromStr,
};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest as _, Sha256};

use crate::error::RollError;

/// SHA-256 digest of some content.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest([u8; 32]);

impl Digest {
    /// Lowercase hex encoding (64 characters).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

impl FromStr for Digest {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s.trim(), &mut bytes)
            .map_err(|e| format!("invalid sha256 digest '{s}': {e}"))?;
        Ok(Self(bytes))
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Digest of in-memory content.
pub fn digest_bytes(content: &[u8]) -> Digest {
    Digest(Sha256::digest(content).into())
}

/// Stream a file through SHA-256.
pub fn digest_file(path: &Path) -> Result<Digest, RollError> {
    let mut file = File::open(path).map_err(|e| RollError::io(path, e))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).map_err(|e| RollError::io(path, e))?;
    Ok(Digest(hasher.finalize().into()))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[test]
    fn empty_content_matches_known_vector() {
        assert_eq!(digest_bytes(b"").to_hex(), EMPTY_SHA256);
    }

    #[test]
    fn file_digest_matches_byte_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.c");
        // Larger than one chunk to exercise the streaming loop
        let content: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        fs::write(&path, &content).unwrap();

        assert_eq!(digest_file(&path).unwrap(), digest_bytes(&content));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = digest_file(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, RollError::Io { .. }));
    }

    #[test]
    fn hex_round_trip_through_from_str() {
        let digest = digest_bytes(b"int main(void) { return 0; }\n");
        let parsed: Digest = digest.to_hex().parse().unwrap();
        assert_eq!(parsed, digest);
    }

    #[test]
    fn short_hex_is_rejected() {
        assert!("deadbeef".parse::<Digest>().is_err());
    }
}
