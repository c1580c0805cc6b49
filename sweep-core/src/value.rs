//! Scalar parameter values and their transformations.

use std::fmt;

use crate::error::{Error, Result};
use crate::{Float, Int};

const STR_VALUE_TYPE_NAME: &str = "str";
const STR_VALUE_TYPE_NAME_ALT: &str = "string";
const INT_VALUE_TYPE_NAME: &str = "int";
const INT_VALUE_TYPE_NAME_ALT: &str = "integer";
const FLOAT_VALUE_TYPE_NAME: &str = "float";
const FLOAT_VALUE_TYPE_NAME_ALT: &str = "flt";
const BOOL_VALUE_TYPE_NAME: &str = "bool";
const BOOL_VALUE_TYPE_NAME_ALT: &str = "boolean";

/// Defines all possible types of parameter values.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum ValueType {
    #[serde(alias = "string")]
    #[serde(rename = "str")]
    String,
    #[serde(alias = "integer")]
    #[serde(rename = "int")]
    Int,
    #[serde(alias = "flt")]
    #[serde(rename = "float")]
    Float,
    #[serde(alias = "boolean")]
    #[serde(rename = "bool")]
    Bool,
}

impl fmt::Display for ValueType {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> std::result::Result<(), fmt::Error> {
        write!(formatter, "{}", self.to_str())
    }
}

impl ValueType {
    /// Creates new `ValueType` from str.
    pub fn from_str(s: &str) -> Result<ValueType> {
        let value_type = match s {
            STR_VALUE_TYPE_NAME | STR_VALUE_TYPE_NAME_ALT => ValueType::String,
            INT_VALUE_TYPE_NAME | INT_VALUE_TYPE_NAME_ALT => ValueType::Int,
            FLOAT_VALUE_TYPE_NAME | FLOAT_VALUE_TYPE_NAME_ALT => ValueType::Float,
            BOOL_VALUE_TYPE_NAME | BOOL_VALUE_TYPE_NAME_ALT => ValueType::Bool,
            _ => return Err(Error::ConfigError(format!("invalid value type: {}", s))),
        };
        Ok(value_type)
    }

    /// Returns string literal name of the `ValueType`.
    pub fn to_str(&self) -> &str {
        match self {
            ValueType::String => STR_VALUE_TYPE_NAME,
            ValueType::Int => INT_VALUE_TYPE_NAME,
            ValueType::Float => FLOAT_VALUE_TYPE_NAME,
            ValueType::Bool => BOOL_VALUE_TYPE_NAME,
        }
    }
}

/// Single scalar value assigned to a simulation parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    String(String),
    Int(Int),
    Float(Float),
    Bool(bool),
}

impl Value {
    pub fn get_type(&self) -> ValueType {
        match self {
            Value::String(_) => ValueType::String,
            Value::Int(_) => ValueType::Int,
            Value::Float(_) => ValueType::Float,
            Value::Bool(_) => ValueType::Bool,
        }
    }

    /// Numeric view of the value, used for range checks.
    pub fn as_float(&self) -> Option<Float> {
        match self {
            Value::Int(i) => Some(*i as Float),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Converts a scalar toml value. Tables, arrays and datetimes are
    /// rejected.
    pub fn from_toml(value: &toml::Value) -> Result<Value> {
        match value {
            toml::Value::String(s) => Ok(Value::String(s.clone())),
            toml::Value::Integer(i) => Ok(Value::Int(*i)),
            toml::Value::Float(f) => Ok(Value::Float(*f)),
            toml::Value::Boolean(b) => Ok(Value::Bool(*b)),
            other => Err(Error::ConfigError(format!(
                "expected scalar value, got {}",
                other.type_str()
            ))),
        }
    }

    /// Representation used when embedding the value in an artifact
    /// identifier. Strings are left unquoted, integral floats keep their
    /// fractional part so they don't collide with ints.
    pub fn to_label(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Float(f) if f.is_finite() && f.fract() == 0.0 => format!("{:.1}", f),
            _ => self.to_string(),
        }
    }
}

/// Formats the value the way it is written in a simulation command.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(fl) => write!(f, "{}", fl),
            Value::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<Int> for Value {
    fn from(i: Int) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as Int)
    }
}

impl From<Float> for Value {
    fn from(f: Float) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

#[test]
fn value_from_toml_scalars() {
    let table: toml::Value = toml::from_str("a = 3\nb = 11.25\nc = true\nd = 'x'").unwrap();
    let get = |k: &str| Value::from_toml(&table[k]).unwrap();
    assert_eq!(get("a"), Value::Int(3));
    assert_eq!(get("b"), Value::Float(11.25));
    assert_eq!(get("c"), Value::Bool(true));
    assert_eq!(get("d"), Value::String("x".to_string()));
    assert!(Value::from_toml(&toml::Value::Array(vec![])).is_err());
}

#[test]
fn value_labels() {
    assert_eq!(Value::from(50).to_label(), "50");
    assert_eq!(Value::from(11.25).to_label(), "11.25");
    assert_eq!(Value::from("low").to_label(), "low");
    assert_eq!(Value::from(25.0).to_label(), "25.0");
    assert_eq!(Value::from(-3.0).to_label(), "-3.0");
    assert_ne!(Value::from(25).to_label(), Value::from(25.0).to_label());
    assert_eq!(Value::from("low").to_string(), "\"low\"");
}

#[test]
fn value_type_names() {
    assert_eq!(ValueType::from_str("integer").unwrap(), ValueType::Int);
    assert_eq!(ValueType::Float.to_str(), "float");
    assert!(ValueType::from_str("grid").is_err());
}
