//! Explicit parameter schema checked before any adapter call is made.
//!
//! Simulations usually identify their inputs with loosely typed names, so a
//! misspelled parameter would otherwise only surface as an engine-side
//! failure halfway through a sweep. With a schema in place such mistakes are
//! reported as configuration errors up front.

use linked_hash_map::LinkedHashMap;

use crate::error::{Error, Result};
use crate::{Float, ParameterSet, ValueType};

/// Minimum similarity score for a known name to be suggested as a fix.
const SUGGESTION_THRESHOLD: f64 = 0.8;

/// Accepted type and optional range of a single parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    #[serde(rename = "type")]
    pub type_: ValueType,
    #[serde(default)]
    pub min: Option<Float>,
    #[serde(default)]
    pub max: Option<Float>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    #[serde(default)]
    pub parameters: LinkedHashMap<String, ParameterSpec>,
    /// Reporters known to exist in the model. Empty list disables the check.
    #[serde(default)]
    pub reporters: Vec<String>,
}

impl ParameterSchema {
    /// Checks every entry of the set against the schema.
    pub fn validate(&self, set: &ParameterSet) -> Result<()> {
        for (name, value) in set {
            let spec = match self.parameters.get(name) {
                Some(s) => s,
                None => {
                    return Err(Error::UnknownParameter {
                        name: name.clone(),
                        suggestion: suggest(name, self.parameters.keys()),
                    })
                }
            };
            let found = value.get_type();
            // integers are accepted wherever floats are
            let type_ok = found == spec.type_
                || (spec.type_ == ValueType::Float && found == ValueType::Int);
            if !type_ok {
                return Err(Error::ParameterTypeMismatch {
                    name: name.clone(),
                    expected: spec.type_,
                    found,
                });
            }
            if let Some(v) = value.as_float() {
                let below = spec.min.map(|min| v < min).unwrap_or(false);
                let above = spec.max.map(|max| v > max).unwrap_or(false);
                if below || above {
                    return Err(Error::ParameterOutOfRange {
                        name: name.clone(),
                        value: value.to_string(),
                        min: bound_str(spec.min),
                        max: bound_str(spec.max),
                    });
                }
            }
        }
        Ok(())
    }

    /// Checks requested reporters against the list of known ones.
    pub fn validate_reporters(&self, reporters: &[String]) -> Result<()> {
        if self.reporters.is_empty() {
            return Ok(());
        }
        for reporter in reporters {
            if !self.reporters.contains(reporter) {
                return Err(Error::UnknownReporter(reporter.clone()));
            }
        }
        Ok(())
    }
}

fn bound_str(bound: Option<Float>) -> String {
    bound.map(|b| b.to_string()).unwrap_or_else(|| "-".to_string())
}

/// Finds the most similar known name, if any is close enough.
fn suggest<'a>(name: &str, known: impl Iterator<Item = &'a String>) -> Option<String> {
    known
        .map(|k| (strsim::jaro_winkler(name, k), k))
        .filter(|(score, _)| *score >= SUGGESTION_THRESHOLD)
        .fold(None, |best: Option<(f64, &String)>, (score, k)| match best {
            Some((s, _)) if s >= score => best,
            _ => Some((score, k)),
        })
        .map(|(_, k)| k.clone())
}
