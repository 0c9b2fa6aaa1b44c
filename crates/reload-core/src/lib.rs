//! Reload Core - asynchronous reload scheduler for versioned data files.
//!
//! Callers register possibly conflicting reload requests; the registry
//! coalesces them into one winner (lowest priority value, most recent on
//! ties). Building the winner loads and validates the file on a background
//! thread, optionally installs it atomically, and delivers a
//! [`ReloadResponse`] through a one-shot [`ResultFuture`].
//!
//! # Example
//!
//! ```rust,ignore
//! use reload_core::{EngineType, ModulesSlot, ReloadRequest, ReloadScheduler};
//!
//! let scheduler = ReloadScheduler::new();
//! scheduler.register_request(
//!     ReloadRequest::new(EngineType::Desktop, "/data/next.data")
//!         .with_magic_number("MOCK")
//!         .with_install_location("/data/current.data"),
//! );
//!
//! let live = ModulesSlot::new();
//! if let Some(response) = scheduler.reload_winner(&live) {
//!     println!("Reloaded {}", response.id());
//! }
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod modules;
pub mod notify;
pub mod pipeline;
pub mod registry;
pub mod request;

mod scheduler;

// Re-export commonly used types
pub use data::{BundleLoader, DataFileWriter, DataManager, FileBundleLoader, LoadError};
pub use error::{ReloadError, Result};
pub use modules::{Modules, ModulesSlot, PredictorKind};
pub use notify::{NoopNotifier, ReloadNotifier};
pub use pipeline::{
    BuildPipeline, InstallReport, InstallStep, ReloadResponse, ReloadStatus, ResultFuture,
};
pub use registry::{RegistryEntry, RequestRegistry};
pub use request::{EngineType, ReloadRequest, RequestId};
pub use scheduler::{ReloadScheduler, ReloadSchedulerBuilder};
