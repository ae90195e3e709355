//! IEBC credential resolution
//!
//! Each credential is taken from the first source that sets it:
//! command line, then environment, then the `[iebc]` table of the TOML file.

use pombola_common::config::TomlConfig;
use pombola_common::{Error, Result};
use tracing::{info, warn};

pub const API_ID_ENV: &str = "POMBOLA_IEBC_API_ID";
pub const API_SECRET_ENV: &str = "POMBOLA_IEBC_API_SECRET";

/// Application id and shared secret issued by the IEBC
#[derive(Clone)]
pub struct IebcCredentials {
    pub api_id: String,
    pub api_secret: String,
}

impl std::fmt::Debug for IebcCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IebcCredentials")
            .field("api_id", &self.api_id)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

impl IebcCredentials {
    pub fn resolve(
        cli_api_id: Option<&str>,
        cli_api_secret: Option<&str>,
        toml_config: &TomlConfig,
    ) -> Result<Self> {
        let api_id = resolve_value(
            "IEBC API id",
            cli_api_id,
            API_ID_ENV,
            toml_config.iebc.api_id.as_deref(),
            "api_id",
        )?;
        let api_secret = resolve_value(
            "IEBC API secret",
            cli_api_secret,
            API_SECRET_ENV,
            toml_config.iebc.api_secret.as_deref(),
            "api_secret",
        )?;
        Ok(Self { api_id, api_secret })
    }
}

/// Non-empty, non-whitespace
pub fn is_valid_value(value: &str) -> bool {
    !value.trim().is_empty()
}

fn resolve_value(
    label: &str,
    cli: Option<&str>,
    env_var: &str,
    toml: Option<&str>,
    toml_key: &str,
) -> Result<String> {
    let env = std::env::var(env_var).ok();

    let candidates = [
        ("command line", cli.map(str::to_string)),
        ("environment", env),
        ("TOML", toml.map(str::to_string)),
    ];

    let valid: Vec<(&str, String)> = candidates
        .into_iter()
        .filter_map(|(source, value)| value.filter(|v| is_valid_value(v)).map(|v| (source, v)))
        .collect();

    if valid.len() > 1 {
        let sources: Vec<&str> = valid.iter().map(|(source, _)| *source).collect();
        warn!(
            "{} found in multiple sources: {}. Using {} (highest priority).",
            label,
            sources.join(", "),
            sources[0]
        );
    }

    match valid.into_iter().next() {
        Some((source, value)) => {
            info!("{} loaded from {}", label, source);
            Ok(value.trim().to_string())
        }
        None => Err(Error::Config(format!(
            "{} not configured. Set it using one of:\n\
             1. Command line option\n\
             2. Environment: {}=...\n\
             3. TOML config: [iebc] {} = \"...\"",
            label, env_var, toml_key
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn toml_with(api_id: Option<&str>, api_secret: Option<&str>) -> TomlConfig {
        let mut config = TomlConfig::default();
        config.iebc.api_id = api_id.map(str::to_string);
        config.iebc.api_secret = api_secret.map(str::to_string);
        config
    }

    fn clear_env() {
        std::env::remove_var(API_ID_ENV);
        std::env::remove_var(API_SECRET_ENV);
    }

    #[test]
    #[serial]
    fn test_toml_only() {
        clear_env();
        let creds = IebcCredentials::resolve(None, None, &toml_with(Some("mz"), Some("s3"))).unwrap();
        assert_eq!(creds.api_id, "mz");
        assert_eq!(creds.api_secret, "s3");
    }

    #[test]
    #[serial]
    fn test_env_overrides_toml() {
        clear_env();
        std::env::set_var(API_ID_ENV, "from-env");
        let creds = IebcCredentials::resolve(None, None, &toml_with(Some("mz"), Some("s3"))).unwrap();
        clear_env();

        assert_eq!(creds.api_id, "from-env");
        assert_eq!(creds.api_secret, "s3");
    }

    #[test]
    #[serial]
    fn test_cli_overrides_everything() {
        clear_env();
        std::env::set_var(API_SECRET_ENV, "from-env");
        let creds =
            IebcCredentials::resolve(Some("cli-id"), Some("cli-secret"), &toml_with(Some("mz"), Some("s3")))
                .unwrap();
        clear_env();

        assert_eq!(creds.api_id, "cli-id");
        assert_eq!(creds.api_secret, "cli-secret");
    }

    #[test]
    #[serial]
    fn test_blank_values_ignored_and_missing_is_error() {
        clear_env();
        std::env::set_var(API_ID_ENV, "   ");
        let result = IebcCredentials::resolve(None, None, &toml_with(None, Some("s3")));
        clear_env();

        match result {
            Err(Error::Config(message)) => assert!(message.contains(API_ID_ENV)),
            other => panic!("expected config error, got {:?}", other),
        }
    }

    #[test]
    fn test_debug_redacts_secret() {
        let creds = IebcCredentials {
            api_id: "mz".into(),
            api_secret: "hunter2".into(),
        };
        assert!(!format!("{:?}", creds).contains("hunter2"));
    }
}
