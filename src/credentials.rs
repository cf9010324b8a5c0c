//! Credentials resolved once at startup
//!
//! API keys are read from the environment exactly once and carried in a
//! [`Credentials`] value passed to whatever needs them. Nothing writes back to
//! the process environment.

use crate::config::ConfigError;
use std::collections::HashMap;
use std::fmt;

#[derive(Clone, Default)]
pub struct Credentials {
    values: HashMap<String, String>,
}

impl Credentials {
    /// Read every named variable; a missing or empty one is an error
    pub fn from_env<I, S>(names: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::resolve(names, |name| std::env::var(name).ok())
    }

    /// Resolve variables through an arbitrary lookup (used by tests)
    pub fn resolve<I, S, F>(names: I, lookup: F) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        F: Fn(&str) -> Option<String>,
    {
        let mut values = HashMap::new();
        for name in names {
            let name = name.as_ref();
            match lookup(name) {
                Some(value) if !value.trim().is_empty() => {
                    values.insert(name.to_string(), value);
                }
                _ => return Err(ConfigError::EnvVarNotFound(name.to_string())),
            }
        }
        Ok(Self { values })
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Result<&str, ConfigError> {
        self.values
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| ConfigError::EnvVarNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.values.keys().collect();
        names.sort();
        f.debug_struct("Credentials")
            .field("names", &names)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_all_present() {
        let credentials = Credentials::resolve(["OPENAI_API_KEY", "SERPER_API_KEY"], |name| {
            Some(format!("value-of-{name}"))
        })
        .unwrap();

        assert_eq!(
            credentials.get("SERPER_API_KEY").unwrap(),
            "value-of-SERPER_API_KEY"
        );
        assert!(credentials.contains("OPENAI_API_KEY"));
    }

    #[test]
    fn test_resolve_missing_names_the_variable() {
        let result = Credentials::resolve(["OPENAI_API_KEY", "SERPER_API_KEY"], |name| {
            (name == "OPENAI_API_KEY").then(|| "sk-test".to_string())
        });

        match result {
            Err(ConfigError::EnvVarNotFound(name)) => assert_eq!(name, "SERPER_API_KEY"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_blank_value_counts_as_missing() {
        let result = Credentials::resolve(["OPENAI_API_KEY"], |_| Some("  ".to_string()));
        assert!(matches!(result, Err(ConfigError::EnvVarNotFound(_))));
    }

    #[test]
    fn test_debug_hides_values() {
        let credentials = Credentials::from_pairs([("OPENAI_API_KEY", "sk-very-secret")]);
        let debug = format!("{credentials:?}");
        assert!(debug.contains("OPENAI_API_KEY"));
        assert!(!debug.contains("sk-very-secret"));
    }
}
