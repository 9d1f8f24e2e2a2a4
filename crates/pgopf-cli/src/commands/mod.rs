pub mod features;
pub mod forward;
pub mod inspect;
pub mod models;

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use ndarray::Array2;
use pgopf_io::{
    builtin_case_text, network_from_matpower_str, parse_matpower, ImportResult, BUILTIN_CASES,
};
use serde::Serialize;
use tracing::warn;

/// Resolve `case` as a file path first, then as a built-in case name.
pub fn load_case(case: &str) -> Result<ImportResult> {
    let path = Path::new(case);
    let result = if path.exists() {
        parse_matpower(path)?
    } else if let Some(text) = builtin_case_text(case) {
        network_from_matpower_str(text)
            .with_context(|| format!("building built-in case {case}"))?
    } else {
        bail!(
            "'{case}' is neither a file nor a built-in case (available: {})",
            BUILTIN_CASES.join(", ")
        );
    };

    for issue in result.diagnostics.warnings() {
        warn!("{issue}");
    }
    if result.diagnostics.has_errors() {
        bail!(
            "case '{case}' failed validation: {}",
            result
                .diagnostics
                .errors()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ")
        );
    }
    Ok(result)
}

/// Row-major nested vectors, the JSON shape users expect for a matrix.
pub fn matrix_rows(m: &Array2<f64>) -> Vec<Vec<f64>> {
    m.outer_iter().map(|row| row.to_vec()).collect()
}

/// Pretty JSON to `out`, or stdout when `out` is `None`.
pub fn write_json<T: Serialize>(value: &T, out: Option<&Path>) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    match out {
        Some(path) => {
            fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
            println!("wrote {}", path.display());
        }
        None => println!("{text}"),
    }
    Ok(())
}
