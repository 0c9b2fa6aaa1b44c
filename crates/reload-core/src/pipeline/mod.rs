//! Build pipeline: load, validate, install and hand the result back.
//!
//! This module provides:
//! - [`BuildPipeline`] running one background job per build
//! - [`InstallStep`] for the atomic copy into an install location
//! - [`ResultFuture`] carrying the [`ReloadResponse`] to the caller

mod build;
mod future;
mod install;
mod response;

pub use build::BuildPipeline;
pub use future::ResultFuture;
pub use install::{InstallReport, InstallStep};
pub use response::{ReloadResponse, ReloadStatus};
