//! Background build of a registered request.

use crate::config::PipelineConfig;
use crate::data::{BundleLoader, DataManager};
use crate::error::{ReloadError, Result};
use crate::modules::Modules;
use crate::notify::ReloadNotifier;
use crate::pipeline::future::{result_channel, ResultPromise};
use crate::pipeline::install::InstallStep;
use crate::pipeline::{ReloadResponse, ReloadStatus, ResultFuture};
use crate::registry::RequestRegistry;
use crate::request::{ReloadRequest, RequestId};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use tracing::{debug, error, info, warn};

/// Loads, validates and installs registered requests off the caller's thread.
///
/// Builds for different ids run independently; the caller is expected to
/// build the current winner rather than every registered id.
#[derive(Clone)]
pub struct BuildPipeline {
    registry: RequestRegistry,
    loader: Arc<dyn BundleLoader>,
    notifier: Arc<dyn ReloadNotifier>,
    installer: InstallStep,
}

impl BuildPipeline {
    pub fn new(
        registry: RequestRegistry,
        loader: Arc<dyn BundleLoader>,
        notifier: Arc<dyn ReloadNotifier>,
        installer: InstallStep,
    ) -> Self {
        Self {
            registry,
            loader,
            notifier,
            installer,
        }
    }

    /// Start building `id` and return a handle to the outcome.
    ///
    /// Never fails directly: an unknown id yields a future already resolved
    /// with [`ReloadStatus::DataMissing`].
    pub fn build(&self, id: RequestId) -> ResultFuture {
        let Some(request) = self.registry.get(id) else {
            warn!(%id, "Build requested for unregistered id");
            return ResultFuture::ready(ReloadResponse::failure(
                ReloadStatus::DataMissing,
                id,
                None,
            ));
        };

        let (promise, future) = result_channel(id);
        let job = BuildJob {
            id,
            request,
            loader: Arc::clone(&self.loader),
            notifier: Arc::clone(&self.notifier),
            installer: self.installer,
        };
        dispatch(job, promise);
        future
    }
}

type PendingJob = Arc<Mutex<Option<(BuildJob, ResultPromise)>>>;

/// Run the job on a dedicated build thread, or inline if no thread can be
/// spawned. Either way the promise is resolved exactly once.
fn dispatch(job: BuildJob, promise: ResultPromise) {
    let id = job.id;
    let pending: PendingJob = Arc::new(Mutex::new(Some((job, promise))));
    let spawned = {
        let pending = Arc::clone(&pending);
        thread::Builder::new()
            .name(PipelineConfig::BUILD_THREAD_NAME.to_string())
            .spawn(move || run_pending(&pending))
    };
    match spawned {
        Ok(_) => debug!(%id, "Dispatched build job"),
        Err(e) => {
            warn!(%id, "Failed to spawn build thread, building inline: {}", e);
            run_pending(&pending);
        }
    }
}

fn run_pending(pending: &Mutex<Option<(BuildJob, ResultPromise)>>) {
    let taken = pending.lock().unwrap_or_else(PoisonError::into_inner).take();
    if let Some((job, promise)) = taken {
        promise.resolve(job.run());
    }
}

struct BuildJob {
    id: RequestId,
    request: ReloadRequest,
    loader: Arc<dyn BundleLoader>,
    notifier: Arc<dyn ReloadNotifier>,
    installer: InstallStep,
}

impl BuildJob {
    fn run(self) -> ReloadResponse {
        debug!(id = %self.id, path = %self.request.file_path, "Building data generation");
        match self.load() {
            Ok(data_manager) => {
                let modules = Modules::create(self.request.engine_type, data_manager);
                info!(
                    id = %self.id,
                    engine = %modules.engine_type(),
                    predictor = %modules.predictor(),
                    version = modules.data_manager().data_version(),
                    "Data generation ready"
                );
                self.notifier.data_ready(self.id, &modules);
                ReloadResponse::ready(self.id, self.request, modules)
            }
            Err(err) => {
                let status = err.status();
                match &err {
                    ReloadError::Install { .. } => {
                        error!(id = %self.id, %status, "Install failed: {}", err)
                    }
                    _ => warn!(id = %self.id, %status, "Load failed: {}", err),
                }
                ReloadResponse::failure(status, self.id, Some(self.request))
            }
        }
    }

    /// Load and validate the source, then install it if requested. The
    /// returned data is bound to the installed copy when there is one.
    ///
    /// The installed bytes are exactly the ones that passed validation.
    fn load(&self) -> Result<DataManager> {
        let magic = self.request.magic_number.as_bytes();
        let source = Path::new(&self.request.file_path);
        let data_manager = self.loader.load(source, magic)?;

        let Some(location) = &self.request.install_location else {
            return Ok(data_manager);
        };
        let target = PathBuf::from(location);
        let report = self
            .installer
            .install(data_manager.contents(), source, &target)?;
        debug!(
            id = %self.id,
            target = %report.target.display(),
            bytes = report.bytes,
            backup = ?report.backup,
            "Install step finished"
        );
        Ok(data_manager.relocated(report.target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DataFileWriter, FileBundleLoader, LoadError};
    use crate::notify::NoopNotifier;
    use crate::request::EngineType;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    const MAGIC: &str = "MOCK";

    fn pipeline(registry: &RequestRegistry) -> BuildPipeline {
        BuildPipeline::new(
            registry.clone(),
            Arc::new(FileBundleLoader::new()),
            Arc::new(NoopNotifier),
            InstallStep::new(),
        )
    }

    fn write_data(path: &Path, version: &str) {
        DataFileWriter::new(MAGIC)
            .data_version(version)
            .payload(b"payload".to_vec())
            .write_to(path)
            .unwrap();
    }

    #[test]
    fn test_unknown_id_is_data_missing() {
        let registry = RequestRegistry::new();
        let id = ReloadRequest::new(EngineType::Desktop, "a.data").id();

        let mut future = pipeline(&registry).build(id);
        assert!(future.is_ready());
        let response = future.get();
        assert_eq!(response.status(), ReloadStatus::DataMissing);
        assert_eq!(response.id(), id);
        assert!(response.modules().is_none());
        assert!(response.request().is_none());
    }

    #[test]
    fn test_successful_build() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("mock.data");
        write_data(&path, "7");

        let registry = RequestRegistry::new();
        let request = ReloadRequest::new(EngineType::Mobile, path.to_string_lossy())
            .with_magic_number(MAGIC);
        let id = registry.register(request.clone()).unwrap();

        let response = pipeline(&registry).build(id).into_response();

        assert_eq!(response.status(), ReloadStatus::ReloadReady);
        assert_eq!(response.id(), id);
        assert_eq!(response.request(), Some(&request));
        let modules = response.modules().unwrap();
        assert_eq!(modules.data_manager().data_version(), "7");
        assert_eq!(modules.data_manager().filename(), path.as_path());
        assert_eq!(modules.engine_type(), EngineType::Mobile);
        // Success does not evict.
        assert!(registry.contains(id));
    }

    #[test]
    fn test_missing_file_is_mmap_failure() {
        let temp_dir = TempDir::new().unwrap();
        let registry = RequestRegistry::new();
        let id = registry
            .register(
                ReloadRequest::new(
                    EngineType::Desktop,
                    temp_dir.path().join("nope.data").to_string_lossy(),
                )
                .with_magic_number(MAGIC),
            )
            .unwrap();

        let response = pipeline(&registry).build(id).into_response();
        assert_eq!(response.status(), ReloadStatus::MmapFailure);
        assert!(response.modules().is_none());
    }

    #[test]
    fn test_install_failure_is_reported_separately() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("src.data");
        write_data(&src, "1");
        let occupied = temp_dir.path().join("occupied");
        std::fs::create_dir(&occupied).unwrap();
        std::fs::write(occupied.join("inner"), b"x").unwrap();

        let registry = RequestRegistry::new();
        let id = registry
            .register(
                ReloadRequest::new(EngineType::Desktop, src.to_string_lossy())
                    .with_magic_number(MAGIC)
                    .with_install_location(occupied.to_string_lossy()),
            )
            .unwrap();

        let response = pipeline(&registry).build(id).into_response();
        assert_eq!(response.status(), ReloadStatus::InstallFailure);
        assert!(response.modules().is_none());
        assert!(occupied.is_dir());
    }

    /// Validates the file, then overwrites it before the build continues.
    struct RewritingLoader;

    impl BundleLoader for RewritingLoader {
        fn load(&self, path: &Path, magic: &[u8]) -> std::result::Result<DataManager, LoadError> {
            let data_manager = FileBundleLoader::new().load(path, magic)?;
            std::fs::write(path, b"garbage not a container").unwrap();
            Ok(data_manager)
        }
    }

    #[test]
    fn test_install_uses_validated_bytes() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("src.data");
        let dst = temp_dir.path().join("dst.data");
        write_data(&src, "new-good");
        write_data(&dst, "old-good");

        let registry = RequestRegistry::new();
        let id = registry
            .register(
                ReloadRequest::new(EngineType::Desktop, src.to_string_lossy())
                    .with_magic_number(MAGIC)
                    .with_install_location(dst.to_string_lossy()),
            )
            .unwrap();
        let pipeline = BuildPipeline::new(
            registry.clone(),
            Arc::new(RewritingLoader),
            Arc::new(NoopNotifier),
            InstallStep::new(),
        );

        let response = pipeline.build(id).into_response();

        assert_eq!(response.status(), ReloadStatus::ReloadReady);
        let data_manager = response.modules().unwrap().data_manager();
        assert_eq!(data_manager.filename(), dst.as_path());
        assert_eq!(data_manager.data_version(), "new-good");
        assert_eq!(std::fs::read(&src).unwrap(), b"garbage not a container");
        let installed = FileBundleLoader::new()
            .load(&dst, MAGIC.as_bytes())
            .unwrap();
        assert_eq!(installed.data_version(), "new-good");
        assert_eq!(installed.contents(), data_manager.contents());
    }

    struct CountingLoader {
        calls: AtomicUsize,
    }

    impl BundleLoader for CountingLoader {
        fn load(&self, path: &Path, _magic: &[u8]) -> std::result::Result<DataManager, LoadError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(LoadError::ContentInvalid {
                path: path.to_path_buf(),
                reason: "rejected by test loader".into(),
            })
        }
    }

    #[test]
    fn test_custom_loader_and_notifier() {
        let registry = RequestRegistry::new();
        let id = registry
            .register(ReloadRequest::new(EngineType::Desktop, "whatever.data"))
            .unwrap();
        let loader = Arc::new(CountingLoader {
            calls: AtomicUsize::new(0),
        });
        let notified = Arc::new(AtomicUsize::new(0));
        let notified_clone = Arc::clone(&notified);
        let pipeline = BuildPipeline::new(
            registry.clone(),
            loader.clone(),
            Arc::new(move |_id: RequestId, _modules: &Modules| {
                notified_clone.fetch_add(1, Ordering::SeqCst);
            }),
            InstallStep::new(),
        );

        let response = pipeline.build(id).into_response();
        assert_eq!(response.status(), ReloadStatus::DataBroken);
        assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
        assert_eq!(notified.load(Ordering::SeqCst), 0);
    }
}
