//! Embedded compile test suite
//!
//! A named list of source snippets with an expected compile outcome,
//! shipped inside the binary as a TOML manifest. The `rill test`
//! subcommand runs every case through the full front end (lexer through
//! object code) and compares success/failure against the expectation.

use crate::compile_to_assembly;
use serde::Deserialize;

/// Embedded default cases
pub static DEFAULT_CASES: &str = include_str!("cases.toml");

/// A single test case from the manifest
#[derive(Debug, Clone, Deserialize)]
pub struct SuiteCase {
    /// Short identifier
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// Source snippet to compile
    pub code: String,
    /// Whether compilation is expected to succeed
    pub expect_success: bool,
}

/// The whole manifest
#[derive(Debug, Clone, Deserialize)]
pub struct Suite {
    #[serde(rename = "case")]
    pub cases: Vec<SuiteCase>,
}

impl Suite {
    /// Parse a manifest from TOML text.
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("failed to parse test manifest: {}", e))
    }

    /// Load the embedded default manifest.
    pub fn embedded() -> Result<Self, String> {
        Self::from_toml(DEFAULT_CASES)
    }
}

/// Outcome of one case
#[derive(Debug, Clone)]
pub struct CaseOutcome {
    pub name: String,
    pub description: String,
    pub passed: bool,
    /// Compile error text, when compilation failed
    pub error: Option<String>,
}

/// Run the suite, optionally filtering case names by substring.
pub fn run_suite(suite: &Suite, filter: Option<&str>) -> Vec<CaseOutcome> {
    suite
        .cases
        .iter()
        .filter(|case| filter.is_none_or(|f| case.name.contains(f)))
        .map(|case| {
            let result = compile_to_assembly(&case.code);
            let succeeded = result.is_ok();
            CaseOutcome {
                name: case.name.clone(),
                description: case.description.clone(),
                passed: succeeded == case.expect_success,
                error: result.err().map(|e| e.to_string()),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_manifest_parses() {
        let suite = Suite::embedded().expect("manifest parses");
        assert!(suite.cases.len() >= 20);
        assert!(suite.cases.iter().any(|c| c.name == "basic_addition"));
    }

    #[test]
    fn test_all_embedded_cases_pass() {
        let suite = Suite::embedded().expect("manifest parses");
        let outcomes = run_suite(&suite, None);
        let failed: Vec<&CaseOutcome> = outcomes.iter().filter(|o| !o.passed).collect();
        assert!(failed.is_empty(), "failing cases: {:?}", failed);
    }

    #[test]
    fn test_filter_limits_cases() {
        let suite = Suite::embedded().expect("manifest parses");
        let outcomes = run_suite(&suite, Some("if_else"));
        assert!(!outcomes.is_empty());
        assert!(outcomes.iter().all(|o| o.name.contains("if_else")));
    }

    #[test]
    fn test_expected_failure_counts_as_pass() {
        let suite = Suite::from_toml(
            r#"
            [[case]]
            name = "undeclared"
            description = "undeclared variable must fail"
            code = "int a = b + 1;"
            expect_success = false
            "#,
        )
        .expect("parses");
        let outcomes = run_suite(&suite, None);
        assert!(outcomes[0].passed);
        assert!(outcomes[0].error.is_some());
    }
}
