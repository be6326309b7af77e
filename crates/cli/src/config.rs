//! Connection settings: a TOML file when `--config` is given, the SAP_*
//! environment variables otherwise.

use std::path::{Path, PathBuf};

use stockwise_odata::{ConfigError, ConfigFile, ErpConfig};

#[derive(Debug, thiserror::Error)]
pub(crate) enum LoadError {
    #[error("cannot read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config file '{path}': {source}")]
    Toml {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

pub(crate) fn load(path: Option<&Path>) -> Result<ErpConfig, LoadError> {
    let config = match path {
        Some(path) => from_file(path)?,
        None => ErpConfig::from_env()?,
    };
    tracing::debug!(host = %config.host, format = ?config.format, "loaded ERP settings");
    Ok(config)
}

fn from_file(path: &Path) -> Result<ErpConfig, LoadError> {
    let raw = std::fs::read_to_string(path).map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&raw).map_err(|e| match e {
        LoadError::Toml { source, .. } => LoadError::Toml {
            path: path.to_path_buf(),
            source,
        },
        other => other,
    })
}

fn parse(raw: &str) -> Result<ErpConfig, LoadError> {
    let file: ConfigFile = toml::from_str(raw).map_err(|source| LoadError::Toml {
        path: PathBuf::new(),
        source,
    })?;
    Ok(file.into_config()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use stockwise_odata::{Credentials, ResponseFormat};

    #[test]
    fn parses_full_file() {
        let config = parse(
            r#"
host = "https://erp.example.com/"
client = "100"
format = "xml"

[credentials]
user = "PURCHASER"
password = "secret"

[retry]
max_attempts = 5
initial_backoff_ms = 100
"#,
        )
        .unwrap();
        assert_eq!(config.host, "erp.example.com");
        assert_eq!(config.client.as_deref(), Some("100"));
        assert_eq!(config.format, ResponseFormat::Xml);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.initial_backoff, Duration::from_millis(100));
        assert!(matches!(config.credentials, Credentials::Basic { .. }));
    }

    #[test]
    fn bearer_token_wins_over_user() {
        let config = parse(
            r#"
host = "erp"
[credentials]
token = "abc"
user = "ignored"
"#,
        )
        .unwrap();
        assert!(matches!(config.credentials, Credentials::Bearer { .. }));
    }

    #[test]
    fn missing_credentials_is_config_error() {
        let err = parse("host = \"erp\"\n[credentials]\n").unwrap_err();
        assert!(matches!(err, LoadError::Config(ConfigError::Missing(_))));
    }

    #[test]
    fn malformed_toml_is_reported() {
        assert!(matches!(parse("host = "), Err(LoadError::Toml { .. })));
    }
}
