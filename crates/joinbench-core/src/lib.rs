pub mod types;
pub mod plan;
pub mod datagen;
pub mod variant;
pub mod store;
pub mod harness;
pub mod report;

pub use types::{DatasetSize, Department, Employee, ExecutionResult, JoinMethod, Pass, QueryDescriptor, Table};
pub use plan::{parse_actual_time, NodeTiming, PlanParseError, PlanTiming};
pub use datagen::DataGenerator;
pub use variant::{IndexDef, VariantConfig, VariantKind};
pub use store::{JoinStore, Measurement};
pub use store::mock::{FailPoint, MockJoinStore, PlanStyle, StoreEvent};
pub use harness::{BenchmarkHarness, BenchmarkRun};
pub use report::{JsonReport, PresenterChain, RunPresenter, SummaryPrinter};

use thiserror::Error;

/// Core error type for benchmark runs
#[derive(Error, Debug)]
pub enum BenchError {
    #[error("Storage Error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("Plan Parse Error: {0}")]
    PlanParse(#[from] PlanParseError),
    #[error("Planner Configuration Error ({method}): {reason}")]
    PlannerConfig { method: JoinMethod, reason: String },
    #[error("Invalid Configuration: {0}")]
    InvalidConfig(String),
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Report Error: {0}")]
    Report(#[from] serde_json::Error),
}

impl BenchError {
    pub fn storage<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        BenchError::Storage(err.into())
    }
}

pub type Result<T> = std::result::Result<T, BenchError>;
