//! Build outcomes.

use crate::modules::Modules;
use crate::request::{ReloadRequest, RequestId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of one build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReloadStatus {
    /// Data loaded and modules built.
    ReloadReady,
    /// Content failed the magic marker or structural checks.
    DataBroken,
    /// No request is registered under the id.
    DataMissing,
    /// The data file could not be opened or read.
    MmapFailure,
    /// Validated data could not be installed at the target location.
    InstallFailure,
}

impl ReloadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReloadStatus::ReloadReady => "RELOAD_READY",
            ReloadStatus::DataBroken => "DATA_BROKEN",
            ReloadStatus::DataMissing => "DATA_MISSING",
            ReloadStatus::MmapFailure => "MMAP_FAILURE",
            ReloadStatus::InstallFailure => "INSTALL_FAILURE",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ReloadStatus::ReloadReady)
    }
}

impl fmt::Display for ReloadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result delivered through a [`crate::ResultFuture`].
///
/// Carries modules if and only if the status is [`ReloadStatus::ReloadReady`].
/// Serializes without the modules, which are a process-local handle.
#[derive(Debug, Clone, Serialize)]
pub struct ReloadResponse {
    status: ReloadStatus,
    id: RequestId,
    #[serde(skip_serializing_if = "Option::is_none")]
    request: Option<ReloadRequest>,
    #[serde(skip)]
    modules: Option<Modules>,
}

impl ReloadResponse {
    pub(crate) fn ready(id: RequestId, request: ReloadRequest, modules: Modules) -> Self {
        Self {
            status: ReloadStatus::ReloadReady,
            id,
            request: Some(request),
            modules: Some(modules),
        }
    }

    /// Failure response; `status` must not be a success status.
    pub(crate) fn failure(
        status: ReloadStatus,
        id: RequestId,
        request: Option<ReloadRequest>,
    ) -> Self {
        debug_assert!(!status.is_success());
        Self {
            status,
            id,
            request,
            modules: None,
        }
    }

    pub fn status(&self) -> ReloadStatus {
        self.status
    }

    /// Id the build was started for.
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Request the build ran, absent when the id was unknown.
    pub fn request(&self) -> Option<&ReloadRequest> {
        self.request.as_ref()
    }

    pub fn modules(&self) -> Option<&Modules> {
        self.modules.as_ref()
    }

    pub fn into_modules(self) -> Option<Modules> {
        self.modules
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}
