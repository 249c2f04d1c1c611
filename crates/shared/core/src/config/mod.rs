use config::{Config, Environment, File};
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::path::Path;
use tracing::info;

const DEFAULT_FILE: &str = "veil";
const ENV_PREFIX: &str = "VEIL";

#[veil_derive::veil_error]
pub enum ConfigError {
    #[error("Config error{}: {source}", format_context(.context))]
    Config { source: config::ConfigError, context: Option<Cow<'static, str>> },
}

/// Loads configuration from a file layered under environment variables.
///
/// 1. **File**: `path` if given (it must exist; the format follows the extension), otherwise
///    an optional `veil.{toml,yaml,json}` in the working directory.
/// 2. **Environment**: variables prefixed with `VEIL__`, nested with `__`
///    (`VEIL__STORE__PORT=6380` sets `store.port`). `VEIL__STORE__NODES` is a
///    comma-separated list.
///
/// # Errors
/// [`ConfigError::Config`] if a given file is missing, or the merged sources do not
/// deserialize into `T`.
///
/// # Example
/// ```rust
/// use veil_core::config::load_config;
///
/// #[derive(Default, serde::Deserialize)]
/// struct Settings {
///     port: u16,
/// }
///
/// let settings: Settings = load_config(None::<&str>).unwrap_or_default();
/// ```
pub fn load_config<T>(path: Option<impl AsRef<Path>>) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    load_layered(path, None)
}

/// `env` replaces the process environment when given.
fn load_layered<T>(
    path: Option<impl AsRef<Path>>,
    env: Option<config::Map<String, String>>,
) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    let file = match &path {
        Some(path) => {
            info!("Loading config from {}", path.as_ref().display());
            File::from(path.as_ref()).required(true)
        },
        None => File::with_name(DEFAULT_FILE).required(false),
    };

    let config = Config::builder()
        .add_source(file)
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .convert_case(config::Case::Snake)
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("store.nodes")
                .source(env),
        )
        .build()
        .context("Failed to build config")?
        .try_deserialize::<T>()
        .context("Failed to deserialize config")?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use veil_domain::config::{AppConfig, StoreBackend, StoreTopology};
    use veil_domain::{ScoreScheme, ValueScheme};

    fn write_toml(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    #[serial]
    fn test_file_values_loaded() {
        let file = write_toml(
            r#"
            [store]
            backend = "memory"
            port = 7000

            [keys]
            master_secret = "master"
            salt = "salt"

            [scheme]
            values = "envelope"
            scores = "plain"
            "#,
        );
        let config: AppConfig = load_config(Some(file.path())).unwrap();
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.store.port, 7000);
        assert_eq!(config.store.host, "localhost");
        assert_eq!(config.keys.master_secret, "master");
        assert_eq!(config.scheme.values, ValueScheme::Envelope);
        assert_eq!(config.scheme.scores, ScoreScheme::Plain);
    }

    #[test]
    #[serial]
    fn test_missing_explicit_file_fails() {
        let result: Result<AppConfig, _> = load_config(Some("/nonexistent/veil.toml"));
        assert!(matches!(result, Err(ConfigError::Config { .. })));
    }

    #[test]
    #[serial]
    fn test_env_overrides_file() {
        let file = write_toml("[store]\nport = 7000\nhost = \"redis.internal\"\n");
        let env = [
            ("VEIL__STORE__PORT", "7001"),
            ("VEIL__STORE__TOPOLOGY", "cluster"),
            ("VEIL__STORE__NODES", "a:1,b:2"),
            ("OTHER__STORE__PORT", "1"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .collect();

        let config: AppConfig = load_layered(Some(file.path()), Some(env)).unwrap();
        assert_eq!(config.store.port, 7001);
        assert_eq!(config.store.host, "redis.internal");
        assert_eq!(config.store.topology, StoreTopology::Cluster);
        assert_eq!(config.store.nodes, vec!["a:1".to_owned(), "b:2".to_owned()]);
    }

    #[test]
    #[serial]
    fn test_defaults_without_any_source() {
        let config: AppConfig = load_layered(None::<&str>, Some(config::Map::new())).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.scheme.values, ValueScheme::Homomorphic);
    }
}
