// Normalization configuration: header aliases and state-name cleanup rules.
//
// The built-in tables match the source database's exports. Both can be
// replaced from a JSON file without touching code.
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{TableError, TableResult};
use crate::util::title_case;

static DEFAULT_COLUMN_NAMES: Lazy<BTreeMap<String, String>> = Lazy::new(|| {
    [
        ("states", "States"),
        ("years", "Years"),
        ("quarter", "Quarter"),
        ("transaction_type", "Transaction_type"),
        ("transaction_count", "Transaction_count"),
        ("transaction_amount", "Transaction_amount"),
        ("brands", "Brands"),
        ("percentage", "Percentage"),
        ("districts", "Districts"),
        ("registeredusers", "RegisteredUsers"),
        ("appopens", "AppOpens"),
        ("pincodes", "Pincodes"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
});

static DEFAULT_STATE_RULES: Lazy<Vec<StateRule>> = Lazy::new(|| {
    vec![
        StateRule::replace("andaman & nicobar", "Andaman & Nicobar"),
        StateRule::replace("-", " "),
        StateRule::TitleCase,
        StateRule::replace(
            "Dadra & Nagar Haveli & Daman & Diu",
            "Dadra and Nagar Haveli and Daman and Diu",
        ),
        StateRule::replace("Nct Of Delhi", "NCT of Delhi"),
        StateRule::replace("Orissa", "Odisha"),
        StateRule::replace("Arunanchal Pradesh", "Arunachal Pradesh"),
        StateRule::replace("Jammu & Kashmir", "Jammu and Kashmir"),
    ]
});

/// One step of state-name cleanup. Replacements are literal substring
/// replacements, not patterns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum StateRule {
    Replace { from: String, to: String },
    TitleCase,
}

impl StateRule {
    pub fn replace(from: &str, to: &str) -> Self {
        StateRule::Replace {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    fn apply(&self, s: String) -> String {
        match self {
            StateRule::Replace { from, .. } if from.is_empty() => s,
            StateRule::Replace { from, to } => s.replace(from.as_str(), to),
            StateRule::TitleCase => title_case(&s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeConfig {
    /// Lowercase header -> canonical column name.
    pub column_names: BTreeMap<String, String>,
    /// Applied in order; each rule sees the previous rule's output.
    pub state_rules: Vec<StateRule>,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        NormalizeConfig {
            column_names: DEFAULT_COLUMN_NAMES.clone(),
            state_rules: DEFAULT_STATE_RULES.clone(),
        }
    }
}

impl NormalizeConfig {
    /// Load a configuration from JSON. Missing fields fall back to the
    /// built-in tables.
    pub fn from_json_file(path: impl AsRef<Path>) -> TableResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| TableError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> TableResult<Self> {
        let mut cfg: NormalizeConfig =
            serde_json::from_str(text).map_err(|e| TableError::Config(e.to_string()))?;
        // Lookups are case-insensitive, so store keys lowercased.
        cfg.column_names = cfg
            .column_names
            .into_iter()
            .map(|(k, v)| (k.to_lowercase(), v))
            .collect();
        Ok(cfg)
    }

    /// Resolve a header to its canonical name. Unmapped headers come back
    /// unchanged.
    pub fn canonical_column<'a>(&'a self, header: &'a str) -> &'a str {
        let trimmed = header.trim();
        self.column_names
            .get(&trimmed.to_lowercase())
            .map(String::as_str)
            .unwrap_or(trimmed)
    }

    pub fn normalize_state(&self, raw: &str) -> String {
        self.state_rules
            .iter()
            .fold(raw.to_string(), |acc, rule| rule.apply(acc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_headers_case_insensitively() {
        let cfg = NormalizeConfig::default();
        assert_eq!(cfg.canonical_column("states"), "States");
        assert_eq!(cfg.canonical_column("APPOPENS"), "AppOpens");
        assert_eq!(cfg.canonical_column(" RegisteredUsers "), "RegisteredUsers");
        assert_eq!(cfg.canonical_column("extra_col"), "extra_col");
    }

    #[test]
    fn default_rules_clean_source_state_names() {
        let cfg = NormalizeConfig::default();
        assert_eq!(cfg.normalize_state("andaman-&-nicobar-islands"), "Andaman & Nicobar Islands");
        assert_eq!(cfg.normalize_state("delhi"), "Delhi");
        assert_eq!(cfg.normalize_state("nct-of-delhi"), "NCT of Delhi");
        assert_eq!(
            cfg.normalize_state("dadra-&-nagar-haveli-&-daman-&-diu"),
            "Dadra and Nagar Haveli and Daman and Diu"
        );
        assert_eq!(cfg.normalize_state("orissa"), "Odisha");
        assert_eq!(cfg.normalize_state("arunanchal-pradesh"), "Arunachal Pradesh");
        assert_eq!(cfg.normalize_state("jammu-&-kashmir"), "Jammu and Kashmir");
    }

    #[test]
    fn later_rules_see_earlier_output() {
        let cfg = NormalizeConfig {
            column_names: BTreeMap::new(),
            state_rules: vec![StateRule::replace("a", "b"), StateRule::replace("bb", "c")],
        };
        assert_eq!(cfg.normalize_state("ab"), "c");
    }

    #[test]
    fn json_overrides_rules_and_keeps_default_aliases() {
        let cfg = NormalizeConfig::from_json_str(
            r#"{"state_rules": [{"op": "replace", "from": "Bombay", "to": "Mumbai"}, {"op": "title_case"}]}"#,
        )
        .unwrap();
        assert_eq!(cfg.state_rules.len(), 2);
        assert_eq!(cfg.normalize_state("bombay"), "Bombay");
        assert_eq!(cfg.normalize_state("Bombay"), "Mumbai");
        assert_eq!(cfg.canonical_column("pincodes"), "Pincodes");
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let err = NormalizeConfig::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, TableError::Config(_)));
    }
}
