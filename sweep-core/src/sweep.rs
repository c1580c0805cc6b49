//! Sweep orchestration.
//!
//! A sweep opens one simulation session, runs one or more batches of
//! replications on it in sequence and persists one artifact per batch.
//!
//! Batches are planned and validated completely before the session is
//! opened, so bad configuration never reaches the simulation. Once running,
//! the first failure aborts the sweep: the failed batch is not persisted,
//! batches already persisted are left in place, and the session is closed.

use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use linked_hash_map::LinkedHashMap;

use crate::adapter::{with_session, SimAdapter};
use crate::aggregate::combine;
use crate::error::{Error, Result};
use crate::persist::{ArtifactCategory, ArtifactHandle, Persister};
use crate::runner::{check_reporters, Runner};
use crate::{util, ExperimentDesign, ParameterSchema, ParameterSet, SensitivityTable, Value};

/// Sweep manifest as found on disk.
#[derive(Debug, Clone, Deserialize)]
struct SweepManifest {
    model: PathBuf,
    reporters: Vec<String>,
    replications: usize,
    ticks: usize,
    #[serde(default)]
    output: Option<PathBuf>,
    #[serde(default = "default_compress")]
    compress: bool,
    #[serde(default)]
    design: Option<PathBuf>,
    #[serde(default)]
    sensitivity: Option<PathBuf>,
    #[serde(default)]
    schema: Option<ParameterSchema>,
}

fn default_compress() -> bool {
    true
}

/// Settings shared by every batch of a sweep.
///
/// Relative paths read from a manifest are resolved against the manifest's
/// directory.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepConfig {
    pub model: PathBuf,
    pub reporters: Vec<String>,
    pub replications: usize,
    pub ticks: usize,
    /// Root directory for persisted artifacts
    pub output: PathBuf,
    pub compress: bool,
    pub design: Option<PathBuf>,
    pub sensitivity: Option<PathBuf>,
    pub schema: Option<ParameterSchema>,
}

impl SweepConfig {
    pub fn new(model: impl Into<PathBuf>, reporters: Vec<String>, replications: usize, ticks: usize) -> Self {
        SweepConfig {
            model: model.into(),
            reporters,
            replications,
            ticks,
            output: PathBuf::from("."),
            compress: default_compress(),
            design: None,
            sensitivity: None,
            schema: None,
        }
    }

    /// Reads the config from a toml or yaml manifest.
    pub fn from_path(path: PathBuf) -> Result<Self> {
        let manifest: SweepManifest = util::deser_struct_from_path(&path)?;
        Ok(Self::from_manifest(manifest, &path))
    }

    fn from_manifest(manifest: SweepManifest, manifest_path: &Path) -> Self {
        let resolve = |p: &Path| util::resolve_relative(manifest_path, p);
        SweepConfig {
            model: resolve(&manifest.model),
            reporters: manifest.reporters,
            replications: manifest.replications,
            ticks: manifest.ticks,
            output: resolve(&manifest.output.unwrap_or_else(|| PathBuf::from("."))),
            compress: manifest.compress,
            design: manifest.design.as_deref().map(resolve),
            sensitivity: manifest.sensitivity.as_deref().map(resolve),
            schema: manifest.schema,
        }
    }

    pub fn with_replications(mut self, replications: usize) -> Self {
        self.replications = replications;
        self
    }

    pub fn with_ticks(mut self, ticks: usize) -> Self {
        self.ticks = ticks;
        self
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = output.into();
        self
    }

    pub fn with_compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    pub fn with_schema(mut self, schema: ParameterSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn design_path(&self) -> Result<&Path> {
        self.design
            .as_deref()
            .ok_or_else(|| Error::ConfigError("no experiment design configured".to_string()))
    }

    pub fn table_path(&self) -> Result<&Path> {
        self.sensitivity
            .as_deref()
            .ok_or_else(|| Error::ConfigError("no sensitivity table configured".to_string()))
    }

    /// Checks the settings that don't depend on a particular batch.
    pub fn validate(&self) -> Result<()> {
        check_reporters(&self.reporters)?;
        if self.replications == 0 {
            return Err(Error::ConfigError(
                "replication count must be at least 1".to_string(),
            ));
        }
        if let Some(schema) = &self.schema {
            schema.validate_reporters(&self.reporters)?;
        }
        Ok(())
    }
}

/// What a sweep should run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SweepPlan {
    /// Single batch using the given design variant
    Experiment { variant: usize },
    /// One batch for each level of the selected sensitivity table entry
    Sensitivity { index: usize },
}

/// Single batch of replications along with where its result goes.
#[derive(Debug, Clone)]
struct Batch {
    label: String,
    category: ArtifactCategory,
    name: String,
    value: Option<Value>,
    params: ParameterSet,
    overrides: LinkedHashMap<String, Value>,
}

fn plan_batches(
    design: Option<&ExperimentDesign>,
    table: Option<&SensitivityTable>,
    plan: SweepPlan,
) -> Result<Vec<Batch>> {
    match plan {
        SweepPlan::Experiment { variant } => {
            let design = design.ok_or_else(|| {
                Error::ConfigError("experiment plan requires a design".to_string())
            })?;
            let name = design.variant_label(variant);
            Ok(vec![Batch {
                label: format!("experiment {}", name),
                category: ArtifactCategory::Experiment,
                params: design.resolve(variant)?,
                overrides: design.overrides(variant)?,
                name,
                value: None,
            }])
        }
        SweepPlan::Sensitivity { index } => {
            let table = table.ok_or_else(|| {
                Error::ConfigError("sensitivity plan requires a sensitivity table".to_string())
            })?;
            let entry = table.select(index)?;
            let empty = ExperimentDesign::default();
            let design = design.unwrap_or(&empty);
            Ok(entry
                .levels()
                .iter()
                .map(|level| {
                    let mut overrides = LinkedHashMap::new();
                    overrides.insert(entry.variable.clone(), (*level).clone());
                    Batch {
                        label: format!("sensitivity {}={}", entry.variable, level.to_label()),
                        category: ArtifactCategory::Sensitivity,
                        name: entry.variable.clone(),
                        value: Some((*level).clone()),
                        params: design.resolve_sensitivity(level, &entry.variable),
                        overrides,
                    }
                })
                .collect())
        }
    }
}

/// Checks the config, the plan and every planned parameter set without
/// touching any simulation.
///
/// Lets callers catch configuration errors before connecting to a remote
/// simulation. `execute` performs the same checks.
pub fn check(
    config: &SweepConfig,
    design: Option<&ExperimentDesign>,
    table: Option<&SensitivityTable>,
    plan: SweepPlan,
) -> Result<()> {
    prepare(config, design, table, plan).map(|_| ())
}

fn prepare(
    config: &SweepConfig,
    design: Option<&ExperimentDesign>,
    table: Option<&SensitivityTable>,
    plan: SweepPlan,
) -> Result<Vec<Batch>> {
    config.validate()?;
    let batches = plan_batches(design, table, plan)?;
    if let Some(schema) = &config.schema {
        for batch in &batches {
            schema
                .validate(&batch.params)
                .map_err(|e| e.in_batch(&batch.label))?;
        }
    }
    Ok(batches)
}

/// Runs the planned batches on a single session of the given adapter.
///
/// Returns handles to the persisted artifacts, one per batch, in run order.
pub fn execute<A: SimAdapter>(
    adapter: A,
    config: &SweepConfig,
    design: Option<&ExperimentDesign>,
    table: Option<&SensitivityTable>,
    plan: SweepPlan,
    running: Option<Arc<AtomicBool>>,
) -> Result<Vec<ArtifactHandle>> {
    let batches = prepare(config, design, table, plan)?;

    let mut runner = Runner::new(config.replications, config.ticks);
    if let Some(running) = running {
        runner = runner.with_running_flag(running);
    }
    let persister = Persister::new(&config.output, config.compress);

    with_session(adapter, &config.model, |session| {
        let mut handles = Vec::with_capacity(batches.len());
        for batch in &batches {
            info!(
                "Starting {} with {} runs of {} ticks.",
                batch.label, config.replications, config.ticks
            );
            for (name, value) in &batch.overrides {
                info!("Using {} = {}", name, value);
            }
            let handle = run_batch(&runner, session.adapter_mut(), &persister, config, batch)
                .map_err(|e| e.in_batch(&batch.label))?;
            handles.push(handle);
        }
        Ok(handles)
    })
}

fn run_batch<A: SimAdapter>(
    runner: &Runner,
    sim: &mut A,
    persister: &Persister,
    config: &SweepConfig,
    batch: &Batch,
) -> Result<ArtifactHandle> {
    let replications = runner.run(sim, &batch.params, &config.reporters)?;
    let table = combine(replications)?;
    persister.save(
        &table,
        batch.category,
        &batch.name,
        batch.value.as_ref(),
        config.replications,
        &batch.params,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ParameterSpec;
    use crate::testing::{Log, StubAdapter};
    use crate::{SensitivityEntry, ValueType, EXPERIMENTS_DIR_NAME, SENSITIVITY_DIR_NAME};
    use std::fs;

    fn design() -> ExperimentDesign {
        let mut defaults = LinkedHashMap::new();
        defaults.insert("amount-of-shared-cars".to_string(), Value::Int(8));
        defaults.insert("days-in-month".to_string(), Value::Int(31));
        let mut sweep = LinkedHashMap::new();
        sweep.insert(
            "amount-of-shared-cars".to_string(),
            vec![Value::Int(8), Value::Int(32)],
        );
        ExperimentDesign::new(defaults, sweep, vec!["default".to_string(), "more-cars".to_string()])
            .unwrap()
    }

    fn table() -> SensitivityTable {
        SensitivityTable {
            entries: vec![SensitivityEntry {
                variable: "amount-of-shared-cars".to_string(),
                low: Value::Int(5),
                high: Value::Int(50),
            }],
        }
    }

    fn config(output: &Path, replications: usize) -> SweepConfig {
        SweepConfig::new("model.nlogo", vec!["x".to_string(), "y".to_string()], replications, 3)
            .with_output(output)
    }

    #[test]
    fn experiment_persists_single_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let sim = StubAdapter::linear();
        let log = sim.log();
        let handles = execute(
            sim,
            &config(dir.path(), 2),
            Some(&design()),
            None,
            SweepPlan::Experiment { variant: 1 },
            None,
        )
        .unwrap();
        assert_eq!(handles.len(), 1);
        assert_eq!(handles[0].id, "exp_series_1_more-cars_2r");

        let artifact = Persister::load(&handles[0].path).unwrap();
        let table = artifact.table;
        assert_eq!(table.column_count(), 4);
        assert_eq!(table.column("x", 1), Some(&[0., 1., 2.][..]));
        assert_eq!(table.column("y", 0), Some(&[0., 2., 4.][..]));
        assert_eq!(log.count(&Log::LoadModel), 1);
        assert_eq!(log.count(&Log::Close), 1);
        assert_eq!(
            log.count(&Log::Apply("amount-of-shared-cars".to_string(), Value::Int(32))),
            2
        );
    }

    #[test]
    fn sensitivity_persists_one_artifact_per_level() {
        let dir = tempfile::tempdir().unwrap();
        let sim = StubAdapter::linear();
        let log = sim.log();
        let handles = execute(
            sim,
            &config(dir.path(), 4),
            Some(&design()),
            Some(&table()),
            SweepPlan::Sensitivity { index: 0 },
            None,
        )
        .unwrap();
        let ids: Vec<&str> = handles.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "sens_series_amount-of-shared-cars_5_4r",
                "sens_series_amount-of-shared-cars_50_4r",
            ]
        );
        for handle in &handles {
            assert!(handle.path.exists());
            let artifact = Persister::load(&handle.path).unwrap();
            assert_eq!(artifact.table.replications(), 4);
        }
        assert_eq!(log.count(&Log::Reset), 8);
        assert_eq!(log.count(&Log::LoadModel), 1);
        assert_eq!(log.count(&Log::Close), 1);
    }

    #[test]
    fn failed_batch_is_not_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let sim = StubAdapter::linear().fail_on_sample(2);
        let log = sim.log();
        let err = execute(
            sim,
            &config(dir.path(), 5),
            Some(&design()),
            None,
            SweepPlan::Experiment { variant: 0 },
            None,
        )
        .unwrap_err();
        match &err {
            Error::Batch { label, source } => {
                assert_eq!(label, "experiment 0_default");
                assert!(matches!(**source, Error::Replication { index: 2, .. }));
            }
            e => panic!("unexpected error: {:?}", e),
        }
        assert!(!dir.path().join(EXPERIMENTS_DIR_NAME).exists());
        assert_eq!(log.count(&Log::Sample(3)), 3);
        assert_eq!(log.count(&Log::Close), 1);
    }

    #[test]
    fn schema_checked_before_session_opens() {
        let dir = tempfile::tempdir().unwrap();
        let mut schema = ParameterSchema::default();
        schema.parameters.insert(
            "amount-of-shared-car".to_string(),
            ParameterSpec {
                type_: ValueType::Int,
                min: None,
                max: None,
            },
        );
        let sim = StubAdapter::linear();
        let log = sim.log();
        let err = execute(
            sim,
            &config(dir.path(), 2).with_schema(schema),
            Some(&design()),
            Some(&table()),
            SweepPlan::Sensitivity { index: 0 },
            None,
        )
        .unwrap_err();
        assert!(err.is_config());
        assert!(log.entries().is_empty());
        assert!(!dir.path().join(SENSITIVITY_DIR_NAME).exists());
    }

    #[test]
    fn check_runs_without_adapter() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), 2);
        assert!(check(&cfg, Some(&design()), None, SweepPlan::Experiment { variant: 1 }).is_ok());
        assert!(check(&cfg, None, None, SweepPlan::Experiment { variant: 0 })
            .unwrap_err()
            .is_config());

        let mut schema = ParameterSchema::default();
        schema.parameters.insert(
            "amount-of-shared-cars".to_string(),
            ParameterSpec {
                type_: ValueType::Int,
                min: Some(0.0),
                max: Some(10.0),
            },
        );
        let err = check(
            &cfg.with_schema(schema),
            Some(&design()),
            Some(&table()),
            SweepPlan::Sensitivity { index: 0 },
        )
        .unwrap_err();
        assert!(err.is_config());
        assert!(!dir.path().join(SENSITIVITY_DIR_NAME).exists());
    }

    #[test]
    fn missing_design_or_table_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), 1);
        let err = execute(
            StubAdapter::linear(),
            &cfg,
            None,
            None,
            SweepPlan::Experiment { variant: 0 },
            None,
        )
        .unwrap_err();
        assert!(err.is_config());
        let err = execute(
            StubAdapter::linear(),
            &cfg,
            Some(&design()),
            Some(&table()),
            SweepPlan::Sensitivity { index: 3 },
            None,
        )
        .unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn manifest_paths_resolved_against_manifest_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sweep.toml");
        fs::write(
            &path,
            r#"
            model = "models/parking.nlogo"
            reporters = ["mean-income", "modal-split"]
            replications = 24
            ticks = 8640
            design = "design.toml"
            output = "results"
            compress = false

            [schema]
            reporters = ["mean-income", "modal-split"]

            [schema.parameters.amount-of-shared-cars]
            type = "int"
            min = 0
            "#,
        )
        .unwrap();
        let config = SweepConfig::from_path(path).unwrap();
        assert_eq!(config.model, dir.path().join("models/parking.nlogo"));
        assert_eq!(config.output, dir.path().join("results"));
        assert_eq!(config.design_path().unwrap(), dir.path().join("design.toml"));
        assert!(config.table_path().is_err());
        assert!(!config.compress);
        assert_eq!(config.replications, 24);
        let schema = config.schema.as_ref().unwrap();
        assert_eq!(schema.parameters["amount-of-shared-cars"].min, Some(0.0));
        assert!(config.validate().is_ok());
        assert!(config.with_replications(0).validate().unwrap_err().is_config());
    }
}
