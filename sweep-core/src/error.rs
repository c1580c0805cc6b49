//! Error types.

use std::fmt;
use std::io;

use crate::ValueType;

pub type Result<T> = core::result::Result<T, Error>;

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self::IoError(e.to_string())
    }
}

/// Adapter call that was being made when something went wrong.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    LoadModel,
    ApplyParameter(String),
    Reset,
    SampleOverSteps,
    Close,
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Call::LoadModel => write!(f, "load_model"),
            Call::ApplyParameter(name) => write!(f, "apply_parameter({})", name),
            Call::Reset => write!(f, "reset"),
            Call::SampleOverSteps => write!(f, "sample_over_steps"),
            Call::Close => write!(f, "close"),
        }
    }
}

fn suggestion_hint(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(s) => format!(" (did you mean `{}`?)", s),
        None => String::new(),
    }
}

/// Crate-wide error type.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("io error: {0}")]
    IoError(String),

    #[cfg(feature = "yaml")]
    #[error("yaml deserialization error: {0}")]
    YamlDeserError(#[from] serde_yaml::Error),
    #[error("toml deserialization error: {0}")]
    TomlDeserError(#[from] toml::de::Error),

    #[error("configuration error: {0}")]
    ConfigError(String),
    #[error("unknown parameter: {name}{}", suggestion_hint(.suggestion))]
    UnknownParameter {
        name: String,
        suggestion: Option<String>,
    },
    #[error("parameter {name}: expected {expected}, got {found}")]
    ParameterTypeMismatch {
        name: String,
        expected: ValueType,
        found: ValueType,
    },
    #[error("parameter {name}: value {value} outside of allowed range [{min}, {max}]")]
    ParameterOutOfRange {
        name: String,
        value: String,
        min: String,
        max: String,
    },
    #[error("unknown reporter: {0}")]
    UnknownReporter(String),

    #[error("simulation rejected {call}: {reason}")]
    SimulationCommand { call: Call, reason: String },
    #[error("simulation did not respond to {call}")]
    SimulationTimeout { call: Call },

    #[error("inconsistent replications: {0}")]
    InconsistentReplications(String),

    #[error("persistence error: {0}")]
    PersistenceError(String),

    #[error("replication {index} failed")]
    Replication {
        index: usize,
        #[source]
        source: Box<Error>,
    },
    #[error("batch {label} failed")]
    Batch {
        label: String,
        #[source]
        source: Box<Error>,
    },
    #[error("interrupted")]
    Interrupted,
}

impl Error {
    pub fn command(call: Call, reason: impl Into<String>) -> Self {
        Self::SimulationCommand {
            call,
            reason: reason.into(),
        }
    }

    /// Wraps the error with the index of the replication it happened in.
    pub fn in_replication(self, index: usize) -> Self {
        Self::Replication {
            index,
            source: Box::new(self),
        }
    }

    /// Wraps the error with the label of the batch it happened in.
    pub fn in_batch(self, label: &str) -> Self {
        Self::Batch {
            label: label.to_string(),
            source: Box::new(self),
        }
    }

    /// Innermost error, skipping replication and batch context.
    pub fn root(&self) -> &Error {
        match self {
            Error::Replication { source, .. } | Error::Batch { source, .. } => source.root(),
            _ => self,
        }
    }

    /// Returns true for errors caused by invalid configuration input.
    pub fn is_config(&self) -> bool {
        match self.root() {
            Error::ConfigError(_)
            | Error::UnknownParameter { .. }
            | Error::ParameterTypeMismatch { .. }
            | Error::ParameterOutOfRange { .. }
            | Error::UnknownReporter(_)
            | Error::TomlDeserError(_) => true,
            #[cfg(feature = "yaml")]
            Error::YamlDeserError(_) => true,
            _ => false,
        }
    }
}

#[test]
fn root_skips_context() {
    let err = Error::command(Call::Reset, "no model loaded")
        .in_replication(2)
        .in_batch("experiment 1");
    match err.root() {
        Error::SimulationCommand { call, .. } => assert_eq!(call, &Call::Reset),
        e => panic!("unexpected root: {:?}", e),
    }
    assert!(!err.is_config());
    assert_eq!(err.to_string(), "batch experiment 1 failed");
}
