//! Initialize new sweep projects based on templates.

mod templates;

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Error, Result};

/// Creates a new project directory at the given path, filled with files
/// from the selected template.
pub fn init_at_path(path_str: &str, template_str: &str) -> Result<()> {
    info!(
        "initiating new sweep project at: {path} (template: {template})",
        path = path_str,
        template = template_str
    );

    let path = Path::new(path_str);
    if path.exists() {
        return Err(Error::msg(format!(
            "can't initialize project, directory already exists ({}), try another path",
            path_str
        )));
    }

    let template_files = collect_template_files(template_str).ok_or_else(|| {
        Error::msg(format!("unknown project template: \"{}\"", template_str))
    })?;

    fs::create_dir_all(path)?;
    create_template_files(path, template_files)?;
    Ok(())
}

/// Writes the template files out, relative to the project directory.
fn create_template_files(path: &Path, files: HashMap<&'static str, String>) -> Result<()> {
    for (name, content) in files {
        let file_full_path = path.join(name);
        if let Some(parent) = file_full_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&file_full_path, content).map_err(|e| {
            Error::msg(format!(
                "failed creating template file {}: {}",
                file_full_path.to_string_lossy(),
                e
            ))
        })?;
    }
    Ok(())
}

fn collect_template_files(template_str: &str) -> Option<HashMap<&'static str, String>> {
    match template_str {
        "commented" => Some(templates::commented()),
        "minimal" => Some(templates::minimal()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sweep_core::{ExperimentDesign, SensitivityTable, SweepConfig, Value};

    #[test]
    fn templates_load_back() {
        let dir = tempfile::tempdir().unwrap();
        for template in &["commented", "minimal"] {
            let project = dir.path().join(template);
            init_at_path(&project.to_string_lossy(), template).unwrap();

            let config =
                SweepConfig::from_path(project.join(sweep_core::SWEEP_MANIFEST_FILE)).unwrap();
            config.validate().unwrap();
            assert_eq!(config.model, project.join("model.nlogo"));

            let design = ExperimentDesign::from_path(config.design_path().unwrap()).unwrap();
            assert_eq!(design.variant_count(), 3);
            let set = design.resolve(1).unwrap();
            assert_eq!(set.get("amount-of-shared-cars"), Some(&Value::Int(32)));
            if let Some(schema) = &config.schema {
                schema.validate(&set).unwrap();
            }

            let table = SensitivityTable::from_path(config.table_path().unwrap()).unwrap();
            assert!(!table.is_empty());
        }
    }

    #[test]
    fn existing_dir_untouched() {
        let dir = tempfile::tempdir().unwrap();
        assert!(init_at_path(&dir.path().to_string_lossy(), "minimal").is_err());
        assert!(init_at_path(&dir.path().join("x").to_string_lossy(), "fancy").is_err());
    }
}
