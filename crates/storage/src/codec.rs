//! Payload codec: canonical serialization, checksums, compression, and
//! atomic body writes.
//!
//! The checksum is always computed over the canonical *uncompressed* bytes,
//! so verification is independent of whether (and at which level) the body
//! was compressed. Canonical bytes are compact JSON with sorted object keys
//! (`serde_json::Map` keeps keys ordered), so encode and verify agree on a
//! single byte form.
//!
//! Writes go to a temp file in the target directory and are renamed into
//! place, so a concurrent reader never observes a partially written body.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use telvault_core::{Error, Result};

/// Result of encoding a body to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBody {
    /// Sha-256 hex over the canonical uncompressed bytes
    pub checksum: String,
    /// Final on-disk size
    pub size_bytes: u64,
}

/// Serializes, optionally compresses, and checksums entry bodies.
#[derive(Debug, Clone, Copy)]
pub struct BodyCodec {
    level: i32,
}

impl BodyCodec {
    /// Create a codec with the given zstd compression level.
    pub fn new(level: i32) -> Self {
        Self { level }
    }

    /// Canonical byte form of a body: compact JSON, sorted keys.
    pub fn canonical_bytes(body: &Map<String, Value>) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&Value::Object(body.clone()))?)
    }

    /// Checksum of a body over its canonical bytes.
    pub fn checksum(body: &Map<String, Value>) -> Result<String> {
        let bytes = Self::canonical_bytes(body)?;
        Ok(sha256_hex(&bytes))
    }

    /// Recompute a body's checksum and compare with the expected value.
    pub fn verify(body: &Map<String, Value>, expected: &str) -> Result<bool> {
        Ok(Self::checksum(body)? == expected)
    }

    /// Serialize `body`, checksum it, optionally compress, and write it
    /// atomically to `path`.
    pub fn encode(
        &self,
        body: &Map<String, Value>,
        path: &Path,
        compress: bool,
    ) -> Result<EncodedBody> {
        let canonical = Self::canonical_bytes(body)?;
        let checksum = sha256_hex(&canonical);

        let on_disk = if compress {
            zstd::encode_all(canonical.as_slice(), self.level)
                .map_err(|e| Error::StorageWrite(format!("zstd encode: {}", e)))?
        } else {
            canonical
        };

        atomic_write(path, &on_disk)
            .map_err(|e| Error::StorageWrite(format!("write {}: {}", path.display(), e)))?;

        Ok(EncodedBody {
            checksum,
            size_bytes: on_disk.len() as u64,
        })
    }

    /// Read, decompress if flagged, and parse a body.
    ///
    /// I/O errors pass through untouched so callers can distinguish a
    /// missing file (e.g. a concurrent sweep) from a parse failure.
    pub fn decode(&self, path: &Path, compressed: bool) -> Result<Map<String, Value>> {
        let raw = std::fs::read(path)?;
        let bytes = if compressed {
            zstd::decode_all(raw.as_slice())
                .map_err(|e| Error::Serialization(format!("zstd decode {}: {}", path.display(), e)))?
        } else {
            raw
        };
        match serde_json::from_slice::<Value>(&bytes)? {
            Value::Object(map) => Ok(map),
            other => Err(Error::Serialization(format!(
                "body at {} is not a JSON object (got {})",
                path.display(),
                type_name(&other)
            ))),
        }
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Write-to-temp-then-rename so readers see all of the body or none of it.
fn atomic_write(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let parent = path.parent().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no parent")
    })?;
    let file_name = path
        .file_name()
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name"))?
        .to_string_lossy();
    let tmp = parent.join(format!(".{}.tmp", file_name));

    let mut file = File::create(&tmp)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    drop(file);

    std::fs::rename(&tmp, path)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn body() -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("device_id".to_string(), json!("d1"));
        map.insert("emotion".to_string(), json!("calm"));
        map.insert("emotion_score".to_string(), json!(0.85));
        map
    }

    #[test]
    fn checksum_is_stable_across_calls() {
        let b = body();
        assert_eq!(
            BodyCodec::checksum(&b).unwrap(),
            BodyCodec::checksum(&b).unwrap()
        );
    }

    #[test]
    fn checksum_ignores_insertion_order() {
        let mut reversed = Map::new();
        reversed.insert("emotion_score".to_string(), json!(0.85));
        reversed.insert("emotion".to_string(), json!("calm"));
        reversed.insert("device_id".to_string(), json!("d1"));
        assert_eq!(
            BodyCodec::checksum(&body()).unwrap(),
            BodyCodec::checksum(&reversed).unwrap()
        );
    }

    #[test]
    fn round_trip_uncompressed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("entry.json");
        let codec = BodyCodec::new(3);

        let encoded = codec.encode(&body(), &path, false).unwrap();
        let decoded = codec.decode(&path, false).unwrap();

        assert_eq!(decoded, body());
        assert!(BodyCodec::verify(&decoded, &encoded.checksum).unwrap());
        assert_eq!(encoded.size_bytes, std::fs::metadata(&path).unwrap().len());
    }

    #[test]
    fn round_trip_compressed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("entry.json.zst");
        let codec = BodyCodec::new(9);

        let encoded = codec.encode(&body(), &path, true).unwrap();
        let decoded = codec.decode(&path, true).unwrap();

        assert_eq!(decoded, body());
        assert!(BodyCodec::verify(&decoded, &encoded.checksum).unwrap());
    }

    #[test]
    fn checksum_is_over_uncompressed_bytes() {
        let dir = tempdir().unwrap();
        let codec_fast = BodyCodec::new(1);
        let codec_slow = BodyCodec::new(19);

        let a = codec_fast
            .encode(&body(), &dir.path().join("a.json.zst"), true)
            .unwrap();
        let b = codec_slow
            .encode(&body(), &dir.path().join("b.json.zst"), true)
            .unwrap();

        // Compression level changes the bytes on disk, never the checksum.
        assert_eq!(a.checksum, b.checksum);
    }

    #[test]
    fn tampered_body_fails_verify() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("entry.json");
        let codec = BodyCodec::new(3);
        let encoded = codec.encode(&body(), &path, false).unwrap();

        let mut decoded = codec.decode(&path, false).unwrap();
        decoded.insert("emotion".to_string(), json!("rage"));
        assert!(!BodyCodec::verify(&decoded, &encoded.checksum).unwrap());
    }

    #[test]
    fn decode_missing_file_is_io_error() {
        let codec = BodyCodec::new(3);
        let err = codec
            .decode(Path::new("/no/such/file.json"), false)
            .unwrap_err();
        match err {
            Error::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
            other => panic!("expected Io, got {other:?}"),
        }
    }

    #[test]
    fn non_object_body_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("entry.json");
        std::fs::write(&path, b"[1, 2, 3]").unwrap();

        let codec = BodyCodec::new(3);
        assert!(matches!(
            codec.decode(&path, false),
            Err(Error::Serialization(_))
        ));
    }

    #[test]
    fn atomic_write_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("entry.json");
        BodyCodec::new(3).encode(&body(), &path, false).unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["entry.json".to_string()]);
    }
}
