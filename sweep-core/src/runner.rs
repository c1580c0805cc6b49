//! Replication batches.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use fnv::FnvHashSet;

use crate::adapter::{check_rows, SampleRow, SimAdapter};
use crate::error::{Error, Result};
use crate::{Float, ParameterSet};

/// Time series produced by a single replication.
///
/// Holds exactly `ticks` values for each reporter, in tick order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplicationResult {
    reporters: Vec<String>,
    /// One column per reporter, in reporter order
    columns: Vec<Vec<Float>>,
    ticks: usize,
}

impl ReplicationResult {
    /// Builds the result from per-step sample rows.
    ///
    /// Every row must contain a value for every reporter.
    pub fn from_rows(reporters: &[String], rows: &[SampleRow]) -> Result<Self> {
        check_unique(reporters)?;
        check_rows(rows, reporters, rows.len())?;
        let columns = reporters
            .iter()
            .map(|r| rows.iter().map(|row| row[r]).collect())
            .collect();
        Ok(ReplicationResult {
            reporters: reporters.to_vec(),
            columns,
            ticks: rows.len(),
        })
    }

    /// Builds the result from reporter columns. All columns must have the
    /// same length.
    pub fn from_columns(reporters: Vec<String>, columns: Vec<Vec<Float>>) -> Result<Self> {
        if reporters.len() != columns.len() {
            return Err(Error::InconsistentReplications(format!(
                "{} reporters with {} columns",
                reporters.len(),
                columns.len()
            )));
        }
        check_unique(&reporters)?;
        let ticks = columns.first().map(|c| c.len()).unwrap_or(0);
        if columns.iter().any(|c| c.len() != ticks) {
            return Err(Error::InconsistentReplications(
                "columns of unequal length".to_string(),
            ));
        }
        Ok(ReplicationResult {
            reporters,
            columns,
            ticks,
        })
    }

    pub fn reporters(&self) -> &[String] {
        &self.reporters
    }

    pub fn ticks(&self) -> usize {
        self.ticks
    }

    pub fn column(&self, reporter: &str) -> Option<&[Float]> {
        self.reporters
            .iter()
            .position(|r| r == reporter)
            .map(|i| self.columns[i].as_slice())
    }

    /// Values of all reporters at the given tick, in reporter order.
    pub fn row(&self, tick: usize) -> Option<Vec<Float>> {
        if tick >= self.ticks {
            return None;
        }
        Some(self.columns.iter().map(|c| c[tick]).collect())
    }

    pub(crate) fn into_columns(self) -> (Vec<String>, Vec<Vec<Float>>) {
        (self.reporters, self.columns)
    }
}

/// Results of all replications of a batch, keyed by replication index.
pub type Replications = BTreeMap<usize, ReplicationResult>;

/// Runs a fixed number of independent replications of one parameter set.
///
/// # All or nothing
///
/// The returned mapping is only handed out once all replications are done.
/// Any failing adapter call aborts the whole batch, no partial results are
/// returned. The session is not assumed to be usable after a failure.
#[derive(Debug, Clone)]
pub struct Runner {
    pub replications: usize,
    pub ticks: usize,
    /// Cleared from outside to stop the batch before the next replication
    running: Option<Arc<AtomicBool>>,
}

impl Runner {
    pub fn new(replications: usize, ticks: usize) -> Self {
        Runner {
            replications,
            ticks,
            running: None,
        }
    }

    /// Makes the runner check the flag before each replication and abort
    /// once it's been set to false.
    pub fn with_running_flag(mut self, running: Arc<AtomicBool>) -> Self {
        self.running = Some(running);
        self
    }

    /// Runs the batch.
    ///
    /// For each replication, starting from index 0: every parameter is
    /// applied in set order, the model is reset, and all reporters are
    /// sampled over `ticks` steps.
    pub fn run<A: SimAdapter + ?Sized>(
        &self,
        sim: &mut A,
        params: &ParameterSet,
        reporters: &[String],
    ) -> Result<Replications> {
        check_reporters(reporters)?;
        if self.replications == 0 {
            return Err(Error::ConfigError(
                "replication count must be at least 1".to_string(),
            ));
        }

        let mut out = Replications::new();
        for index in 0..self.replications {
            if let Some(running) = &self.running {
                if !running.load(Ordering::SeqCst) {
                    return Err(Error::Interrupted.in_replication(index));
                }
            }
            let start = Instant::now();
            let result = self
                .run_single(sim, params, reporters)
                .map_err(|e| e.in_replication(index))?;
            out.insert(index, result);
            info!(
                "finished run {} of {} ({} ms)",
                index + 1,
                self.replications,
                start.elapsed().as_millis()
            );
        }
        Ok(out)
    }

    fn run_single<A: SimAdapter + ?Sized>(
        &self,
        sim: &mut A,
        params: &ParameterSet,
        reporters: &[String],
    ) -> Result<ReplicationResult> {
        for (name, value) in params {
            trace!("set {} {}", name, value);
            sim.apply_parameter(name, value)?;
        }
        sim.reset()?;
        let rows = sim.sample_over_steps(reporters, self.ticks)?;
        check_rows(&rows, reporters, self.ticks)?;
        ReplicationResult::from_rows(reporters, &rows)
    }
}

/// Reporters must be a non-empty list without duplicates.
pub(crate) fn check_reporters(reporters: &[String]) -> Result<()> {
    if reporters.is_empty() {
        return Err(Error::ConfigError("no reporters given".to_string()));
    }
    match first_duplicate(reporters) {
        Some(dup) => Err(Error::ConfigError(format!("duplicate reporter: {}", dup))),
        None => Ok(()),
    }
}

/// Each reporter may hold at most one column of a result.
pub(crate) fn check_unique(reporters: &[String]) -> Result<()> {
    match first_duplicate(reporters) {
        Some(dup) => Err(Error::InconsistentReplications(format!(
            "duplicate reporter: {}",
            dup
        ))),
        None => Ok(()),
    }
}

fn first_duplicate(reporters: &[String]) -> Option<&str> {
    let mut seen = FnvHashSet::default();
    reporters
        .iter()
        .map(|r| r.as_str())
        .find(|r| !seen.insert(*r))
}
