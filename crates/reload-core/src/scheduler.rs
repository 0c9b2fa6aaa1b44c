//! Entry point tying the registry to the build pipeline.

use crate::data::{BundleLoader, FileBundleLoader};
use crate::modules::ModulesSlot;
use crate::notify::{NoopNotifier, ReloadNotifier};
use crate::pipeline::{BuildPipeline, InstallStep, ReloadResponse, ResultFuture};
use crate::registry::RequestRegistry;
use crate::request::{ReloadRequest, RequestId};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Coalesces reload requests and builds the winning one.
///
/// # Example
///
/// ```rust,ignore
/// use reload_core::{EngineType, ReloadRequest, ReloadScheduler};
///
/// let scheduler = ReloadScheduler::new();
/// let request = ReloadRequest::new(EngineType::Desktop, "/data/dict.data")
///     .with_magic_number("MOCK");
/// if let Some(winner) = scheduler.register_request(request) {
///     let response = scheduler.build(winner).into_response();
///     if !response.is_success() {
///         scheduler.report_load_failure(winner);
///     }
/// }
/// ```
#[derive(Clone)]
pub struct ReloadScheduler {
    registry: RequestRegistry,
    pipeline: BuildPipeline,
}

impl ReloadScheduler {
    /// Scheduler with the file loader and no notifier.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> ReloadSchedulerBuilder {
        ReloadSchedulerBuilder::new()
    }

    /// Register a request and return the id of the current winner.
    pub fn register_request(&self, request: ReloadRequest) -> Option<RequestId> {
        self.registry.register(request)
    }

    /// Evict a failed request and return the next winner.
    pub fn report_load_failure(&self, id: RequestId) -> Option<RequestId> {
        self.registry.report_load_failure(id)
    }

    pub fn winner(&self) -> Option<RequestId> {
        self.registry.winner()
    }

    /// Start a background build of `id`.
    pub fn build(&self, id: RequestId) -> ResultFuture {
        self.pipeline.build(id)
    }

    pub fn registry(&self) -> &RequestRegistry {
        &self.registry
    }

    pub fn clear(&self) {
        self.registry.clear();
    }

    /// Build winners until one succeeds and install it into `slot`.
    ///
    /// Each failed winner is reported and evicted before the next one is
    /// tried, so a permanently broken file cannot stall the loop. The previous
    /// generation in `slot` is retired only once the new one is ready.
    /// Returns `None` when no request is pending.
    ///
    /// Blocks the calling thread; do not call from inside an async runtime.
    pub fn reload_winner(&self, slot: &ModulesSlot) -> Option<ReloadResponse> {
        let mut next = self.registry.winner();
        while let Some(id) = next {
            let response = self.pipeline.build(id).into_response();
            if let Some(modules) = response.modules() {
                slot.replace(modules.clone());
                info!(%id, "Reloaded data from winning request");
                return Some(response);
            }
            next = self.registry.report_load_failure(id);
            warn!(
                %id,
                status = %response.status(),
                next = RequestId::to_raw(next),
                "Winning request failed, trying next"
            );
        }
        debug!("No pending reload request");
        None
    }
}

impl Default for ReloadScheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for configuring a [`ReloadScheduler`].
pub struct ReloadSchedulerBuilder {
    loader: Arc<dyn BundleLoader>,
    notifier: Arc<dyn ReloadNotifier>,
    install_backup: bool,
}

impl ReloadSchedulerBuilder {
    pub fn new() -> Self {
        Self {
            loader: Arc::new(FileBundleLoader::new()),
            notifier: Arc::new(NoopNotifier),
            install_backup: false,
        }
    }

    /// Loader used to read and validate data files.
    ///
    /// Default: [`FileBundleLoader`]
    pub fn loader(mut self, loader: impl BundleLoader + 'static) -> Self {
        self.loader = Arc::new(loader);
        self
    }

    /// Callback invoked after every successful build.
    ///
    /// Default: [`NoopNotifier`]
    pub fn notifier(mut self, notifier: impl ReloadNotifier + 'static) -> Self {
        self.notifier = Arc::new(notifier);
        self
    }

    /// Keep the replaced install target as `<target>.bak`.
    ///
    /// Default: `false`
    pub fn install_backup(mut self, enable: bool) -> Self {
        self.install_backup = enable;
        self
    }

    pub fn build(self) -> ReloadScheduler {
        let registry = RequestRegistry::new();
        let pipeline = BuildPipeline::new(
            registry.clone(),
            self.loader,
            self.notifier,
            InstallStep::new().keep_backup(self.install_backup),
        );
        ReloadScheduler { registry, pipeline }
    }
}

impl Default for ReloadSchedulerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
