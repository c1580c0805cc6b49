//! Human readable rendering of persisted artifacts.

use std::fmt::Write;

use sweep_core::Artifact;

/// Renders artifact metadata followed by the first `rows` rows of the table.
pub fn render(artifact: &Artifact, rows: usize) -> String {
    let meta = &artifact.metadata;
    let table = &artifact.table;
    let mut out = String::new();

    let _ = writeln!(out, "category:     {:?}", meta.category);
    let _ = writeln!(out, "name:         {}", meta.name);
    if let Some(value) = &meta.value {
        let _ = writeln!(out, "value:        {}", value);
    }
    let _ = writeln!(out, "created:      {}", meta.created.to_rfc3339());
    let _ = writeln!(out, "replications: {}", meta.replications);
    let _ = writeln!(out, "ticks:        {}", meta.ticks);
    let _ = writeln!(out, "parameters:");
    for (name, value) in &meta.parameters {
        let _ = writeln!(out, "    {} = {}", name, value);
    }
    let _ = writeln!(out, "metrics:      {}", table.metrics().join(", "));

    let header: Vec<String> = table
        .columns()
        .iter()
        .map(|key| format!("{}[{}]", key.metric, key.replication))
        .collect();
    let _ = writeln!(out, "\ntick\t{}", header.join("\t"));
    for tick in 0..rows.min(table.ticks()) {
        if let Some(row) = table.row(tick) {
            let cells: Vec<String> = row.iter().map(|v| v.to_string()).collect();
            let _ = writeln!(out, "{}\t{}", tick, cells.join("\t"));
        }
    }
    if table.ticks() > rows {
        let _ = writeln!(out, "... {} more rows", table.ticks() - rows);
    }
    out
}
