//! Encoder for the data container read by [`crate::data::FileBundleLoader`].

use crate::config::DataFileConfig;
use crate::error::{ReloadError, Result};
use sha2::{Digest, Sha256};
use std::path::Path;

/// Builds a data container.
///
/// # Example
///
/// ```
/// use reload_core::data::DataFileWriter;
///
/// let bytes = DataFileWriter::new(b"MOCK")
///     .data_version("24.1.0")
///     .payload(b"payload".to_vec())
///     .encode();
/// assert!(bytes.starts_with(b"MOCK"));
/// ```
#[derive(Debug, Clone)]
pub struct DataFileWriter {
    magic: Vec<u8>,
    format_version: u16,
    data_version: String,
    payload: Vec<u8>,
}

impl DataFileWriter {
    pub fn new(magic: impl AsRef<[u8]>) -> Self {
        Self {
            magic: magic.as_ref().to_vec(),
            format_version: DataFileConfig::FORMAT_VERSION,
            data_version: String::new(),
            payload: Vec::new(),
        }
    }

    pub fn data_version(mut self, version: impl Into<String>) -> Self {
        self.data_version = version.into();
        self
    }

    pub fn payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    /// Override the container format version. Only useful to produce files
    /// the loader must reject.
    pub fn format_version(mut self, version: u16) -> Self {
        self.format_version = version;
        self
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            self.magic.len()
                + DataFileConfig::FORMAT_VERSION_LEN
                + DataFileConfig::VERSION_LEN_FIELD
                + self.data_version.len()
                + DataFileConfig::PAYLOAD_LEN_FIELD
                + self.payload.len()
                + DataFileConfig::CHECKSUM_LEN,
        );
        out.extend_from_slice(&self.magic);
        out.extend_from_slice(&self.format_version.to_le_bytes());
        out.extend_from_slice(&(self.data_version.len() as u32).to_le_bytes());
        out.extend_from_slice(self.data_version.as_bytes());
        out.extend_from_slice(&(self.payload.len() as u64).to_le_bytes());
        out.extend_from_slice(&self.payload);
        let digest = Sha256::digest(&out);
        out.extend_from_slice(&digest);
        out
    }

    /// Encode and write to `path` (not atomically).
    pub fn write_to(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.encode()).map_err(|e| ReloadError::io_with_path(e, path))
    }
}
