//! Data files: the on-disk container, its validated view and the loader
//! contract used by the build pipeline.

mod data_manager;
mod loader;
mod writer;

pub use data_manager::DataManager;
pub use loader::{BundleLoader, FileBundleLoader, LoadError};
pub use writer::DataFileWriter;
