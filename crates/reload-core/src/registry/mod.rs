//! Pending reload requests and winner selection.
//!
//! Requests are deduplicated by their fingerprint id. The winner is the live
//! entry with the lowest priority value; among equal priorities the most
//! recently (re-)registered entry wins. Entries leave the registry only
//! through [`RequestRegistry::report_load_failure`] or a full clear.

mod request_registry;

pub use request_registry::{RegistryEntry, RequestRegistry};
