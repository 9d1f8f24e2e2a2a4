//! Built-in reference cases.

use anyhow::{bail, Result};
use pgopf_core::Network;

use crate::importers::network_from_matpower_str;

/// Wood & Wollenberg 6-bus, 3-generator case (MATPOWER `case6ww`).
pub const CASE6WW: &str = include_str!("../tests/data/case6ww.m");

/// Names accepted by [`builtin_case`].
pub const BUILTIN_CASES: &[&str] = &["case6ww"];

/// MATPOWER source text of a bundled case.
pub fn builtin_case_text(name: &str) -> Option<&'static str> {
    match name {
        "case6ww" => Some(CASE6WW),
        _ => None,
    }
}

/// Build one of the bundled cases by name.
pub fn builtin_case(name: &str) -> Result<Network> {
    let Some(text) = builtin_case_text(name) else {
        bail!(
            "unknown built-in case '{name}' (available: {})",
            BUILTIN_CASES.join(", ")
        );
    };
    Ok(network_from_matpower_str(text)?.network)
}

/// The 6-bus Wood & Wollenberg network.
pub fn case6ww() -> Result<Network> {
    builtin_case("case6ww")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case6ww_shape() {
        let network = case6ww().unwrap();
        let stats = network.stats();
        assert_eq!(stats.num_buses, 6);
        assert_eq!(stats.num_gens, 3);
        assert_eq!(stats.num_loads, 3);
        assert_eq!(stats.num_branches, 11);
        assert_eq!(stats.total_load_mw, 210.0);
        assert_eq!(network.base_mva.value(), 100.0);
    }

    #[test]
    fn test_unknown_case() {
        let err = builtin_case("case9999").unwrap_err();
        assert!(err.to_string().contains("case6ww"));
    }
}
