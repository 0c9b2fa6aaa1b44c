//! Runtime bundles built from validated data.

use crate::data::DataManager;
use crate::request::EngineType;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::info;

/// Prediction subsystem attached to a bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictorKind {
    Default,
    Mobile,
}

impl PredictorKind {
    pub fn name(&self) -> &'static str {
        match self {
            PredictorKind::Default => "DefaultPredictor",
            PredictorKind::Mobile => "MobilePredictor",
        }
    }
}

impl fmt::Display for PredictorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug)]
struct ModulesInner {
    data_manager: Arc<DataManager>,
    engine_type: EngineType,
    predictor: PredictorKind,
    loaded_at: DateTime<Utc>,
}

/// Fully constructed, immutable data generation.
///
/// Cloning is cheap and yields another handle to the same generation.
#[derive(Debug, Clone)]
pub struct Modules {
    inner: Arc<ModulesInner>,
}

impl Modules {
    /// Build the bundle for `engine_type` on top of validated data.
    pub fn create(engine_type: EngineType, data_manager: DataManager) -> Self {
        match engine_type {
            EngineType::Desktop => Self::desktop(data_manager),
            EngineType::Mobile => Self::mobile(data_manager),
        }
    }

    pub fn desktop(data_manager: DataManager) -> Self {
        Self::assemble(EngineType::Desktop, PredictorKind::Default, data_manager)
    }

    pub fn mobile(data_manager: DataManager) -> Self {
        Self::assemble(EngineType::Mobile, PredictorKind::Mobile, data_manager)
    }

    fn assemble(
        engine_type: EngineType,
        predictor: PredictorKind,
        data_manager: DataManager,
    ) -> Self {
        Self {
            inner: Arc::new(ModulesInner {
                data_manager: Arc::new(data_manager),
                engine_type,
                predictor,
                loaded_at: Utc::now(),
            }),
        }
    }

    pub fn data_manager(&self) -> &DataManager {
        &self.inner.data_manager
    }

    pub fn engine_type(&self) -> EngineType {
        self.inner.engine_type
    }

    pub fn predictor(&self) -> PredictorKind {
        self.inner.predictor
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.inner.loaded_at
    }

    /// Whether both handles point at the same generation.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

#[derive(Debug, Default)]
struct SlotState {
    current: Option<Modules>,
    generation: u64,
}

/// Holder of the live generation.
///
/// Readers clone the current handle and keep using it even after a newer
/// generation replaces it; the old bundle is released once its last reader
/// drops it.
#[derive(Debug, Default)]
pub struct ModulesSlot {
    state: RwLock<SlotState>,
}

impl ModulesSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live generation, if any has been installed.
    pub fn current(&self) -> Option<Modules> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .current
            .clone()
    }

    /// Number of generations installed so far.
    pub fn generation(&self) -> u64 {
        self.state.read().unwrap_or_else(PoisonError::into_inner).generation
    }

    /// Swap in a ready generation and return the retired one.
    pub fn replace(&self, modules: Modules) -> Option<Modules> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.generation += 1;
        info!(
            generation = state.generation,
            version = modules.data_manager().data_version(),
            path = %modules.data_manager().filename().display(),
            "Installed new data generation"
        );
        state.current.replace(modules)
    }
}
