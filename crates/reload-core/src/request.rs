//! Reload request records and their fingerprint ids.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU64;

/// Which variant of data manager and modules a request builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineType {
    Desktop,
    Mobile,
}

impl EngineType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineType::Desktop => "desktop",
            EngineType::Mobile => "mobile",
        }
    }

    /// Stable tag used in the canonical form.
    fn tag(&self) -> u8 {
        match self {
            EngineType::Desktop => 1,
            EngineType::Mobile => 2,
        }
    }
}

impl Default for EngineType {
    fn default() -> Self {
        EngineType::Desktop
    }
}

impl fmt::Display for EngineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A request to load (and optionally install) a data file.
///
/// Two requests with equal fields are the same request: they share a
/// [`RequestId`] and occupy a single registry slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReloadRequest {
    pub engine_type: EngineType,
    pub file_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_location: Option<String>,
    #[serde(default)]
    pub magic_number: String,
    /// Lower values are more urgent.
    #[serde(default)]
    pub priority: i32,
}

impl ReloadRequest {
    pub fn new(engine_type: EngineType, file_path: impl Into<String>) -> Self {
        Self {
            engine_type,
            file_path: file_path.into(),
            install_location: None,
            magic_number: String::new(),
            priority: 0,
        }
    }

    pub fn with_install_location(mut self, location: impl Into<String>) -> Self {
        self.install_location = Some(location.into());
        self
    }

    pub fn with_magic_number(mut self, magic: impl Into<String>) -> Self {
        self.magic_number = magic.into();
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Canonical byte form hashed into the request id.
    ///
    /// Every field is length-prefixed so that no two distinct requests share
    /// an encoding.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            32 + self.file_path.len()
                + self.magic_number.len()
                + self.install_location.as_ref().map_or(0, String::len),
        );
        out.push(self.engine_type.tag());
        push_str(&mut out, &self.file_path);
        match &self.install_location {
            Some(location) => {
                out.push(1);
                push_str(&mut out, location);
            }
            None => out.push(0),
        }
        push_str(&mut out, &self.magic_number);
        out.extend_from_slice(&self.priority.to_le_bytes());
        out
    }

    /// Fingerprint of this request.
    pub fn id(&self) -> RequestId {
        RequestId::fingerprint(&self.canonical_bytes())
    }
}

fn push_str(out: &mut Vec<u8>, value: &str) {
    out.extend_from_slice(&(value.len() as u64).to_le_bytes());
    out.extend_from_slice(value.as_bytes());
}

/// Opaque 64-bit request handle.
///
/// Zero is reserved for "no pending request", so the sentinel is expressed as
/// `Option<RequestId>::None` and converted with [`RequestId::to_raw`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct RequestId(NonZeroU64);

impl RequestId {
    /// Hash canonical request bytes into an id.
    ///
    /// # Panics
    ///
    /// Panics if the digest truncates to zero. The sentinel can never be a real
    /// id, and silently remapping it would break dedup.
    pub fn fingerprint(canonical: &[u8]) -> Self {
        let digest = blake3::hash(canonical);
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest.as_bytes()[..8]);
        match NonZeroU64::new(u64::from_le_bytes(head)) {
            Some(value) => Self(value),
            None => panic!(
                "request fingerprint collided with the reserved zero id (digest {})",
                digest.to_hex()
            ),
        }
    }

    /// Rebuild an id from its raw value; zero yields `None`.
    pub fn from_raw(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    /// Raw value of an optional id, with `None` encoded as zero.
    pub fn to_raw(id: Option<Self>) -> u64 {
        id.map_or(0, Self::get)
    }

    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl From<RequestId> for u64 {
    fn from(id: RequestId) -> Self {
        id.get()
    }
}

impl TryFrom<u64> for RequestId {
    type Error = String;

    fn try_from(raw: u64) -> std::result::Result<Self, Self::Error> {
        Self::from_raw(raw).ok_or_else(|| "request id 0 is reserved".to_string())
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0.get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(path: &str, priority: i32) -> ReloadRequest {
        ReloadRequest::new(EngineType::Desktop, path)
            .with_magic_number("MOCK")
            .with_priority(priority)
    }

    #[test]
    fn test_identical_requests_share_id() {
        assert_eq!(request("a.data", 3).id(), request("a.data", 3).id());
    }

    #[test]
    fn test_every_field_affects_id() {
        let base = request("a.data", 3);
        let variants = [
            request("b.data", 3),
            request("a.data", 4),
            base.clone().with_magic_number("OTHER"),
            base.clone().with_install_location("dst.data"),
            ReloadRequest {
                engine_type: EngineType::Mobile,
                ..base.clone()
            },
        ];
        for variant in variants {
            assert_ne!(base.id(), variant.id(), "{variant:?}");
        }
    }

    #[test]
    fn test_field_boundaries_are_unambiguous() {
        let a = ReloadRequest::new(EngineType::Desktop, "ab").with_magic_number("c");
        let b = ReloadRequest::new(EngineType::Desktop, "a").with_magic_number("bc");
        assert_ne!(a.canonical_bytes(), b.canonical_bytes());
    }

    #[test]
    fn test_raw_conversion() {
        let id = request("a.data", 0).id();
        assert_eq!(RequestId::from_raw(id.get()), Some(id));
        assert_eq!(RequestId::from_raw(0), None);
        assert_eq!(RequestId::to_raw(None), 0);
        assert_eq!(RequestId::to_raw(Some(id)), id.get());
    }

    #[test]
    fn test_request_serde_roundtrip_uses_snake_case_engine() {
        let req = request("a.data", -1).with_install_location("dst.data");
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"engine_type\":\"desktop\""));
        let back: ReloadRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, req);
    }

    #[test]
    fn test_zero_id_rejected_by_serde() {
        assert!(serde_json::from_str::<RequestId>("0").is_err());
        assert!(serde_json::from_str::<RequestId>("42").is_ok());
    }
}
