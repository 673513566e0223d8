pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_utils;

#[cfg(feature = "cli")]
pub use config::cli::CliConfig;

pub use adapters::HttpFetcher;
pub use config::{ClinicConfig, FailurePolicy};
pub use crate::core::{
    pipeline::AggregationPipeline,
    refresh::{PendingRefresh, RefreshController},
    store::{FetchState, RefreshOutcome, SnapshotStore},
};
pub use domain::model::{Department, Doctor, Service, Snapshot};
pub use utils::error::{ClinicError, Result};
