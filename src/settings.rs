use config::{Config, Environment};
use serde::Deserialize;

use crate::cve::DEFAULT_BASE_URL;

pub const DEFAULT_FORMAT: &str =
    "*{{.cve.cveMetadata.cveId}}*: {{(index .cve.containers.cna.descriptions 0).value}}\n";

const ENV_PREFIX: &str = "CVECAT";

/// Process-wide configuration, resolved once at startup.
///
/// Precedence, lowest first: built-in defaults, `CVECAT_*` environment
/// variables, command-line flags.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub format: String,
    pub base_url: String,
    pub verbose: u8,
    pub dryrun: bool,
}

impl Settings {
    pub fn from_env() -> crate::Result<Self> {
        Self::from_environment(Environment::with_prefix(ENV_PREFIX))
    }

    pub fn from_environment(environment: Environment) -> crate::Result<Self> {
        let settings: Settings = Config::builder()
            .set_default("format", DEFAULT_FORMAT)?
            .set_default("base_url", DEFAULT_BASE_URL)?
            .set_default("verbose", 0)?
            .set_default("dryrun", false)?
            .add_source(environment.try_parsing(true))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            format: DEFAULT_FORMAT.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            verbose: 0,
            dryrun: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn environment(vars: &[(&str, &str)]) -> Environment {
        let mut map = config::Map::new();
        for (key, value) in vars {
            map.insert(key.to_string(), value.to_string());
        }
        Environment::with_prefix(ENV_PREFIX).source(Some(map))
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_environment(environment(&[])).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_environment_overrides() {
        let settings = Settings::from_environment(environment(&[
            ("CVECAT_FORMAT", "{{.cve.cveMetadata.cveId}}\n"),
            ("CVECAT_VERBOSE", "2"),
            ("CVECAT_DRYRUN", "true"),
            ("CVECAT_BASE_URL", "http://mirror.local/cves"),
            ("OTHER_FORMAT", "ignored"),
        ]))
        .unwrap();

        assert_eq!(settings.format, "{{.cve.cveMetadata.cveId}}\n");
        assert_eq!(settings.verbose, 2);
        assert!(settings.dryrun);
        assert_eq!(settings.base_url, "http://mirror.local/cves");
    }

    #[test]
    fn test_invalid_environment_value() {
        let result = Settings::from_environment(environment(&[("CVECAT_VERBOSE", "loud")]));
        assert!(matches!(result, Err(crate::error::CvecatError::Config(_))));
    }
}
