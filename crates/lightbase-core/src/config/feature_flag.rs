//! Declared feature flags.

use serde::{Deserialize, Serialize};

/// Reserved prefix for internal platform flags. Flags with this prefix are
/// always part of the declared set.
pub const INTERNAL_FLAG_PREFIX: &str = "__FEATURE_LPC_";

/// Seed flag guaranteeing the declared set is never empty.
pub const EXAMPLE_FLAG: &str = "__FEATURE_LPC_EXAMPLE_FLAG";

/// Flag coalescing several password-flow errors into generic ones to defeat
/// account enumeration.
pub const REDUCE_ERROR_KEY_INFO_FLAG: &str = "__FEATURE_LPC_AUTH_REDUCE_ERROR_KEY_INFO";

/// Declared feature flags synchronized to storage at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureFlagConfig {
    /// Application-declared flags. Internal flags are appended automatically.
    #[serde(default)]
    pub flags: Vec<FlagDeclaration>,
}

/// A single declared flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlagDeclaration {
    /// Unique flag name.
    pub name: String,
    /// Operator-facing description.
    #[serde(default)]
    pub description: String,
}

impl FeatureFlagConfig {
    /// The full declared set: configured flags plus the internal reserved
    /// flags, deduplicated, with the seed flag guaranteeing non-emptiness.
    pub fn declared_names(&self) -> Vec<String> {
        let mut names: Vec<String> = vec![
            EXAMPLE_FLAG.to_string(),
            REDUCE_ERROR_KEY_INFO_FLAG.to_string(),
        ];
        for flag in &self.flags {
            if !names.contains(&flag.name) {
                names.push(flag.name.clone());
            }
        }
        names
    }

    /// Description for a declared flag name, empty for internal flags.
    pub fn description_for(&self, name: &str) -> String {
        self.flags
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.description.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_set_always_contains_internal_flags() {
        let config = FeatureFlagConfig::default();
        let names = config.declared_names();
        assert!(names.contains(&EXAMPLE_FLAG.to_string()));
        assert!(names.contains(&REDUCE_ERROR_KEY_INFO_FLAG.to_string()));
    }

    #[test]
    fn duplicates_are_collapsed() {
        let config = FeatureFlagConfig {
            flags: vec![
                FlagDeclaration {
                    name: "betaSearch".into(),
                    description: "New search".into(),
                },
                FlagDeclaration {
                    name: "betaSearch".into(),
                    description: String::new(),
                },
            ],
        };
        let count = config
            .declared_names()
            .iter()
            .filter(|n| n.as_str() == "betaSearch")
            .count();
        assert_eq!(count, 1);
    }
}
