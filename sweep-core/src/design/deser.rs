//! Contains structs used for procedural deserialization.
//!
//! Values inside user files are not statically typed, a generic _Value_
//! object from the toml crate is used instead and later turned into a proper
//! [`Value`]. This lets the same manifests be read from yaml files as well.
//!
//! [`Value`]: ../../value/enum.Value.html

use linked_hash_map::LinkedHashMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DesignManifest {
    #[serde(default)]
    pub defaults: LinkedHashMap<String, toml::Value>,
    #[serde(default)]
    pub sweep: SweepSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SweepSection {
    /// Optional human-readable variant names
    #[serde(default)]
    pub names: Vec<String>,
    /// Candidate values per swept variable, indexed by variant number
    #[serde(default)]
    pub values: LinkedHashMap<String, Vec<toml::Value>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SensitivityManifest {
    #[serde(default, rename = "entry")]
    pub entries: Vec<SensitivityEntryRaw>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityEntryRaw {
    pub variable: String,
    pub low: toml::Value,
    pub high: toml::Value,
}
