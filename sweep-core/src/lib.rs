//! This library implements replicated experiment runs against external
//! simulations.
//!
//! The simulation itself is treated as a black box reachable only through
//! the [`SimAdapter`] trait. Everything around it lives here: selecting
//! parameter values from an [`ExperimentDesign`], running a batch of
//! independent replications with a [`Runner`], merging the per-replication
//! time series into a single [`AggregatedResult`] and writing that table to
//! disk with a [`Persister`].
//!
//! The [`sweep`] module ties these together. A single simulation session is
//! opened once, reused sequentially for every replication of every batch, and
//! closed once at the end, whether the sweep succeeded or not.
//!
//! # Networking
//!
//! By itself, this library does not talk to any simulation. Adapter
//! implementations are expected to come from elsewhere, for example the
//! `RemoteSim` adapter found in `sweep-net`.
//!
//! # Example
//!
//! ```ignore
//! use sweep_core::{sweep, ExperimentDesign, SweepConfig, SweepPlan};
//!
//! let config = SweepConfig::from_path("sweep.toml".into())?;
//! let design = ExperimentDesign::from_path(config.design_path()?)?;
//! let handles = sweep::execute(
//!     adapter,
//!     &config,
//!     Some(&design),
//!     None,
//!     SweepPlan::Experiment { variant: 2 },
//!     None,
//! )?;
//! ```
//!
//! [`SimAdapter`]: adapter/trait.SimAdapter.html
//! [`ExperimentDesign`]: design/struct.ExperimentDesign.html
//! [`Runner`]: runner/struct.Runner.html
//! [`AggregatedResult`]: aggregate/struct.AggregatedResult.html
//! [`Persister`]: persist/struct.Persister.html
//! [`sweep`]: sweep/index.html

#[macro_use]
extern crate serde;
#[macro_use]
extern crate log;

// reexports
pub use adapter::{with_session, SampleRow, Session, SimAdapter};
pub use aggregate::{combine, AggregatedResult, ColumnKey};
pub use design::{ExperimentDesign, SensitivityEntry, SensitivityTable};
pub use error::{Call, Error, Result};
pub use param::ParameterSet;
pub use persist::{Artifact, ArtifactCategory, ArtifactHandle, ArtifactMetadata, Persister};
pub use runner::{ReplicationResult, Replications, Runner};
pub use schema::{ParameterSchema, ParameterSpec};
pub use sweep::{SweepConfig, SweepPlan};
pub use value::{Value, ValueType};

pub mod adapter;
pub mod aggregate;
pub mod design;
pub mod error;
pub mod param;
pub mod persist;
pub mod runner;
pub mod schema;
pub mod sweep;
pub mod value;

mod util;

#[cfg(test)]
pub(crate) mod testing;

pub const FEATURE_NAME_LZ4: &str = "lz4";
#[cfg(feature = "lz4")]
pub const FEATURE_LZ4: bool = true;
#[cfg(not(feature = "lz4"))]
pub const FEATURE_LZ4: bool = false;

pub const FEATURE_NAME_YAML: &str = "yaml";
#[cfg(feature = "yaml")]
pub const FEATURE_YAML: bool = true;
#[cfg(not(feature = "yaml"))]
pub const FEATURE_YAML: bool = false;

pub const VERSION: &'static str = env!("CARGO_PKG_VERSION");

/// Name of the sweep manifest file looked up in a project directory.
pub const SWEEP_MANIFEST_FILE: &str = "sweep.toml";

/// Name of the directory holding experiment artifacts.
pub const EXPERIMENTS_DIR_NAME: &str = "experiments";
/// Name of the directory holding sensitivity artifacts.
pub const SENSITIVITY_DIR_NAME: &str = "sensitivity";

/// Extension used for persisted result tables.
pub const ARTIFACT_FILE_EXTENSION: &str = "series";

/// Floating point number type used for all sampled reporter values.
pub type Float = f64;
/// Integer number type used for integer parameter values.
pub type Int = i64;
