//! Validated view over one data file.
//!
//! Container layout (all integers little-endian):
//!
//! ```text
//! magic | u16 format version | u32 version length | version (UTF-8)
//!       | u64 payload length | payload | SHA-256 of everything before
//! ```

use crate::config::DataFileConfig;
use crate::data::loader::LoadError;
use bytes::Bytes;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Immutable, validated data generation.
///
/// Holds the whole file in memory; the payload is a zero-copy slice of it.
#[derive(Debug, Clone)]
pub struct DataManager {
    path: PathBuf,
    contents: Bytes,
    magic: Bytes,
    data_version: String,
    payload: Bytes,
    checksum: [u8; DataFileConfig::CHECKSUM_LEN],
}

impl DataManager {
    /// Validate `data` read from `path` against the expected magic marker.
    ///
    /// An empty `magic` skips the marker comparison; every structural check
    /// still applies.
    pub fn from_bytes(path: &Path, data: Bytes, magic: &[u8]) -> Result<Self, LoadError> {
        let invalid = |reason: String| LoadError::ContentInvalid {
            path: path.to_path_buf(),
            reason,
        };

        if data.len() < magic.len() || &data[..magic.len()] != magic {
            return Err(invalid(format!(
                "magic number mismatch (expected {:?})",
                String::from_utf8_lossy(magic)
            )));
        }

        if data.len() < magic.len() + DataFileConfig::CHECKSUM_LEN {
            return Err(invalid(format!("file too short ({} bytes)", data.len())));
        }
        let body_end = data.len() - DataFileConfig::CHECKSUM_LEN;
        let digest = Sha256::digest(&data[..body_end]);
        if digest.as_slice() != &data[body_end..] {
            return Err(invalid("checksum mismatch".to_string()));
        }
        let mut checksum = [0u8; DataFileConfig::CHECKSUM_LEN];
        checksum.copy_from_slice(&data[body_end..]);

        let mut cursor = Cursor::new(&data[..body_end], magic.len());

        let format_version = cursor
            .u16()
            .ok_or_else(|| invalid("truncated format version".to_string()))?;
        if format_version != DataFileConfig::FORMAT_VERSION {
            return Err(invalid(format!(
                "unsupported format version {} (expected {})",
                format_version,
                DataFileConfig::FORMAT_VERSION
            )));
        }

        let version_len = cursor
            .u32()
            .ok_or_else(|| invalid("truncated version length".to_string()))?
            as usize;
        if version_len > DataFileConfig::MAX_VERSION_LEN {
            return Err(invalid(format!("version string too long ({})", version_len)));
        }
        let version_bytes = cursor
            .take(version_len)
            .ok_or_else(|| invalid("truncated version string".to_string()))?;
        let data_version = std::str::from_utf8(version_bytes)
            .map_err(|e| invalid(format!("version is not UTF-8: {}", e)))?
            .to_string();

        let payload_len = cursor
            .u64()
            .ok_or_else(|| invalid("truncated payload length".to_string()))?;
        let payload_len = usize::try_from(payload_len)
            .map_err(|_| invalid(format!("payload length {} overflows", payload_len)))?;
        let payload_start = cursor.position();
        cursor
            .take(payload_len)
            .ok_or_else(|| invalid("truncated payload".to_string()))?;
        if cursor.remaining() != 0 {
            return Err(invalid(format!(
                "{} unexpected bytes after payload",
                cursor.remaining()
            )));
        }

        Ok(Self {
            path: path.to_path_buf(),
            magic: data.slice(..magic.len()),
            data_version,
            payload: data.slice(payload_start..payload_start + payload_len),
            checksum,
            contents: data,
        })
    }

    /// Rebind this generation to `path`, which must hold a copy of
    /// [`contents`](Self::contents).
    pub fn relocated(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    /// File this generation was loaded from.
    pub fn filename(&self) -> &Path {
        &self.path
    }

    /// The validated container, byte for byte.
    pub fn contents(&self) -> &[u8] {
        &self.contents
    }

    pub fn data_version(&self) -> &str {
        &self.data_version
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn magic(&self) -> &[u8] {
        &self.magic
    }

    /// Size of the whole container in bytes.
    pub fn size(&self) -> usize {
        self.contents.len()
    }

    pub fn checksum_hex(&self) -> String {
        hex::encode(self.checksum)
    }
}

/// Bounds-checked little-endian reader.
struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8], pos: usize) -> Self {
        Self { buf, pos }
    }

    fn position(&self) -> usize {
        self.pos
    }

    fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    fn take(&mut self, len: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(len)?;
        let slice = self.buf.get(self.pos..end)?;
        self.pos = end;
        Some(slice)
    }

    fn array<const N: usize>(&mut self) -> Option<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Some(out)
    }

    fn u16(&mut self) -> Option<u16> {
        self.array().map(u16::from_le_bytes)
    }

    fn u32(&mut self) -> Option<u32> {
        self.array().map(u32::from_le_bytes)
    }

    fn u64(&mut self) -> Option<u64> {
        self.array().map(u64::from_le_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DataFileWriter;

    const MAGIC: &[u8] = b"MOCK";

    fn encoded() -> Vec<u8> {
        DataFileWriter::new(MAGIC)
            .data_version("24.1.0")
            .payload(b"dictionary bytes".to_vec())
            .encode()
    }

    fn parse(data: Vec<u8>, magic: &[u8]) -> Result<DataManager, LoadError> {
        DataManager::from_bytes(Path::new("mock.data"), Bytes::from(data), magic)
    }

    fn assert_invalid(result: Result<DataManager, LoadError>) {
        match result {
            Err(LoadError::ContentInvalid { .. }) => {}
            other => panic!("expected ContentInvalid, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_container() {
        let manager = parse(encoded(), MAGIC).unwrap();
        assert_eq!(manager.data_version(), "24.1.0");
        assert_eq!(manager.payload(), b"dictionary bytes");
        assert_eq!(manager.magic(), MAGIC);
        assert_eq!(manager.filename(), Path::new("mock.data"));
        assert_eq!(manager.checksum_hex().len(), 64);
        assert_eq!(manager.contents(), encoded().as_slice());
        assert_eq!(manager.size(), encoded().len());
    }

    #[test]
    fn test_relocated_keeps_contents() {
        let manager = parse(encoded(), MAGIC).unwrap().relocated("/installed/mock.data");
        assert_eq!(manager.filename(), Path::new("/installed/mock.data"));
        assert_eq!(manager.data_version(), "24.1.0");
        assert_eq!(manager.contents(), encoded().as_slice());
    }

    #[test]
    fn test_empty_magic_skips_marker_check() {
        let manager = parse(encoded(), b"").unwrap();
        assert_eq!(manager.magic(), b"");
    }

    #[test]
    fn test_magic_mismatch() {
        assert_invalid(parse(encoded(), b"NOPE"));
    }

    #[test]
    fn test_corrupted_payload_fails_checksum() {
        let mut data = encoded();
        let mid = data.len() / 2;
        data[mid] ^= 0xff;
        assert_invalid(parse(data, MAGIC));
    }

    #[test]
    fn test_truncated_file() {
        let data = encoded();
        assert_invalid(parse(data[..10].to_vec(), MAGIC));
        assert_invalid(parse(MAGIC.to_vec(), MAGIC));
    }

    #[test]
    fn test_unsupported_format_version() {
        let data = DataFileWriter::new(MAGIC)
            .format_version(DataFileConfig::FORMAT_VERSION + 1)
            .encode();
        assert_invalid(parse(data, MAGIC));
    }

    #[test]
    fn test_plain_text_is_rejected() {
        assert_invalid(parse(b"MOCK but not a container at all".to_vec(), MAGIC));
    }
}
