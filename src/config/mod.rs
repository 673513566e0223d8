#[cfg(feature = "cli")]
pub mod cli;
pub mod shapes;
pub mod toml_config;

pub use shapes::{ShapeSet, DEFAULT_SERVICE_CATEGORY};
pub use toml_config::{
    ClinicConfig, DepartmentSeed, DepartmentSourceKind, DepartmentsConfig, ExtractConfig,
    FailurePolicy, RefreshConfig, SourceConfig,
};
