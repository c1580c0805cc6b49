//! Experiment design definitions: default parameter values, swept variables
//! and the sensitivity bounds table.

mod deser;

use std::path::Path;

use linked_hash_map::LinkedHashMap;

use crate::error::{Error, Result};
use crate::{util, ParameterSet, Value};

pub use deser::{DesignManifest, SensitivityManifest};

/// Default parameter values together with a set of swept variables.
///
/// Every swept variable holds an ordered sequence of candidate values. A
/// *variant* is a column through all those sequences: variant `n` assigns
/// the `n`-th candidate to each swept variable.
///
/// # Sensitivity mode
///
/// For one-variable sensitivity runs the swept variables are not used.
/// Instead a single variable is set to one of the levels found in a
/// [`SensitivityTable`], on top of the same defaults.
///
/// [`SensitivityTable`]: struct.SensitivityTable.html
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExperimentDesign {
    pub defaults: LinkedHashMap<String, Value>,
    pub sweep: LinkedHashMap<String, Vec<Value>>,
    pub names: Vec<String>,
}

impl ExperimentDesign {
    /// Creates a new design, checking that all candidate sequences (and the
    /// list of names, if given) have the same length.
    pub fn new(
        defaults: LinkedHashMap<String, Value>,
        sweep: LinkedHashMap<String, Vec<Value>>,
        names: Vec<String>,
    ) -> Result<Self> {
        let design = ExperimentDesign {
            defaults,
            sweep,
            names,
        };
        design.check()?;
        Ok(design)
    }

    /// Reads the design from a toml or yaml manifest.
    pub fn from_path(path: &Path) -> Result<Self> {
        let manifest: DesignManifest = util::deser_struct_from_path(path)?;
        Self::from_manifest(manifest)
    }

    pub fn from_manifest(manifest: DesignManifest) -> Result<Self> {
        let mut defaults = LinkedHashMap::new();
        for (name, value) in &manifest.defaults {
            defaults.insert(name.clone(), value_at(name, value)?);
        }
        let mut sweep = LinkedHashMap::new();
        for (name, values) in &manifest.sweep.values {
            let values = values
                .iter()
                .map(|v| value_at(name, v))
                .collect::<Result<Vec<Value>>>()?;
            sweep.insert(name.clone(), values);
        }
        Self::new(defaults, sweep, manifest.sweep.names)
    }

    fn check(&self) -> Result<()> {
        let mut lengths = self.sweep.iter().map(|(n, v)| (n, v.len()));
        if let Some((first_name, first_len)) = lengths.next() {
            if first_len == 0 {
                return Err(Error::ConfigError(format!(
                    "swept variable {} has no candidate values",
                    first_name
                )));
            }
            for (name, len) in lengths {
                if len != first_len {
                    return Err(Error::ConfigError(format!(
                        "swept variable {} has {} candidate values, {} has {}",
                        name, len, first_name, first_len
                    )));
                }
            }
        }
        if !self.names.is_empty() && self.names.len() != self.variant_count() {
            return Err(Error::ConfigError(format!(
                "{} variant names given for {} variants",
                self.names.len(),
                self.variant_count()
            )));
        }
        Ok(())
    }

    /// Number of variants defined by the swept variables.
    pub fn variant_count(&self) -> usize {
        self.sweep
            .values()
            .next()
            .map(|v| v.len())
            .unwrap_or(if self.names.is_empty() { 0 } else { self.names.len() })
    }

    /// Label identifying the variant, `<index>_<name>` if the variant is
    /// named, just the index otherwise.
    pub fn variant_label(&self, variant: usize) -> String {
        match self.names.get(variant) {
            Some(name) => format!("{}_{}", variant, name),
            None => variant.to_string(),
        }
    }

    /// Values assigned to swept variables by the given variant.
    pub fn overrides(&self, variant: usize) -> Result<LinkedHashMap<String, Value>> {
        let mut overrides = LinkedHashMap::new();
        for (name, values) in &self.sweep {
            let value = values.get(variant).ok_or_else(|| {
                Error::ConfigError(format!(
                    "variant {} not defined for {} ({} candidate values)",
                    variant,
                    name,
                    values.len()
                ))
            })?;
            overrides.insert(name.clone(), value.clone());
        }
        Ok(overrides)
    }

    /// Resolves the full parameter set for the given variant.
    ///
    /// Parameter names are not validated here.
    pub fn resolve(&self, variant: usize) -> Result<ParameterSet> {
        if self.sweep.is_empty() && variant >= self.variant_count().max(1) {
            return Err(Error::ConfigError(format!(
                "variant {} not defined, design has no swept variables",
                variant
            )));
        }
        let overrides = self.overrides(variant)?;
        Ok(ParameterSet::merge(&self.defaults, &overrides))
    }

    /// Resolves the parameter set for a single sensitivity level.
    pub fn resolve_sensitivity(&self, level: &Value, variable: &str) -> ParameterSet {
        let mut overrides = LinkedHashMap::new();
        overrides.insert(variable.to_string(), level.clone());
        ParameterSet::merge(&self.defaults, &overrides)
    }
}

/// One row of the sensitivity design table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityEntry {
    pub variable: String,
    pub low: Value,
    pub high: Value,
}

impl SensitivityEntry {
    /// Levels to run, in order.
    pub fn levels(&self) -> [&Value; 2] {
        [&self.low, &self.high]
    }
}

/// Read-only table of variables with their low and high bounds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SensitivityTable {
    pub entries: Vec<SensitivityEntry>,
}

impl SensitivityTable {
    pub fn from_path(path: &Path) -> Result<Self> {
        let manifest: SensitivityManifest = util::deser_struct_from_path(path)?;
        Self::from_manifest(manifest)
    }

    pub fn from_manifest(manifest: SensitivityManifest) -> Result<Self> {
        let entries = manifest
            .entries
            .iter()
            .map(|raw| {
                Ok(SensitivityEntry {
                    variable: raw.variable.clone(),
                    low: value_at(&raw.variable, &raw.low)?,
                    high: value_at(&raw.variable, &raw.high)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(SensitivityTable { entries })
    }

    /// Selects the entry at the given index.
    pub fn select(&self, index: usize) -> Result<&SensitivityEntry> {
        self.entries.get(index).ok_or_else(|| {
            Error::ConfigError(format!(
                "sensitivity index {} out of range, table has {} entries",
                index,
                self.entries.len()
            ))
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn value_at(name: &str, value: &toml::Value) -> Result<Value> {
    Value::from_toml(value).map_err(|e| Error::ConfigError(format!("{}: {}", name, e)))
}
