//! Outward notification when a new data generation is ready.
//!
//! Telling a UI process that data changed is platform plumbing that lives
//! outside this crate. The pipeline only calls a [`ReloadNotifier`] and never
//! depends on what it does.

use crate::modules::Modules;
use crate::request::RequestId;

/// Receives a callback after every successful build.
pub trait ReloadNotifier: Send + Sync {
    fn data_ready(&self, id: RequestId, modules: &Modules);
}

/// Notifier that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl ReloadNotifier for NoopNotifier {
    fn data_ready(&self, _id: RequestId, _modules: &Modules) {}
}

impl<F> ReloadNotifier for F
where
    F: Fn(RequestId, &Modules) + Send + Sync,
{
    fn data_ready(&self, id: RequestId, modules: &Modules) {
        self(id, modules)
    }
}
