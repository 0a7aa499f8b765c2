use jarvis_core::engine::RetryPolicy;
use jarvis_core::providers::{ProviderConfig, ProviderKind};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
    #[error("Failed to load env file {0}: {1}")]
    EnvFile(PathBuf, String),
}

/// Holds all configuration loaded from the environment at startup.
///
/// Missing credentials are not errors: the affected provider is simply
/// disabled when the session is assembled.
#[derive(Clone, Debug)]
pub struct Config {
    pub username: String,
    pub assistant_name: String,
    /// One entry per known provider, ranked by `PROVIDER_PRIORITY`.
    pub providers: Vec<ProviderConfig>,
    pub classifier_provider: ProviderKind,
    pub min_call_interval: Duration,
    pub retry: RetryPolicy,
    pub history_window: usize,
    pub chat_log_path: PathBuf,
    pub data_dir: PathBuf,
    pub log_level: Level,
}

impl Config {
    /// Loads configuration from environment variables, reading `.env` first.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_vars()
    }

    /// Loads configuration after reading an explicit env file.
    pub fn from_env_file(path: &Path) -> Result<Self, ConfigError> {
        dotenvy::from_path(path)
            .map_err(|e| ConfigError::EnvFile(path.to_path_buf(), e.to_string()))?;
        Self::from_vars()
    }

    fn from_vars() -> Result<Self, ConfigError> {
        let username = var_or("Username", "User");
        let assistant_name = var_or("Assistantname", "Jarvis");

        let timeout = Duration::from_secs(parse_var("REQUEST_TIMEOUT_SECS", 10)?);
        let order = provider_priority()?;
        let providers = order
            .iter()
            .enumerate()
            .map(|(rank, &kind)| {
                let mut provider = ProviderConfig::new(kind, credential(kind), rank);
                provider.model = var_or(model_var(kind), kind.default_model());
                provider.timeout = timeout;
                provider
            })
            .collect();

        let classifier_str = var_or("CLASSIFIER_PROVIDER", ProviderKind::Cohere.name());
        let classifier_provider = ProviderKind::from_name(&classifier_str).ok_or_else(|| {
            ConfigError::InvalidValue(
                "CLASSIFIER_PROVIDER".to_string(),
                format!("'{}' is not a known provider", classifier_str),
            )
        })?;

        let min_call_interval = Duration::from_millis(parse_var("MIN_CALL_INTERVAL_MS", 1500)?);
        let retry = RetryPolicy {
            max_retries: parse_var("MAX_RETRIES", 2)?,
            backoff: Duration::from_millis(parse_var("RETRY_BACKOFF_MS", 1000)?),
        };
        let history_window = parse_var("HISTORY_WINDOW", 10)?;

        let chat_log_path = PathBuf::from(var_or("CHAT_LOG_PATH", "Data/ChatLog.json"));
        let data_dir = PathBuf::from(var_or("DATA_DIR", "Data"));

        let log_level_str = var_or("RUST_LOG", "WARN");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            username,
            assistant_name,
            providers,
            classifier_provider,
            min_call_interval,
            retry,
            history_window,
            chat_log_path,
            data_dir,
            log_level,
        })
    }

    pub fn provider(&self, kind: ProviderKind) -> Option<&ProviderConfig> {
        self.providers.iter().find(|p| p.kind == kind)
    }
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw.trim().parse::<T>().map_err(|_| {
            ConfigError::InvalidValue(name.to_string(), format!("'{}' is not a valid number", raw))
        }),
        _ => Ok(default),
    }
}

fn credential_var(kind: ProviderKind) -> &'static str {
    match kind {
        ProviderKind::Cohere => "CohereAPIKey",
        ProviderKind::Groq => "GroqAPIKey",
        ProviderKind::OpenAI => "OPENAI_API_KEY",
    }
}

fn model_var(kind: ProviderKind) -> &'static str {
    match kind {
        ProviderKind::Cohere => "COHERE_MODEL",
        ProviderKind::Groq => "GROQ_MODEL",
        ProviderKind::OpenAI => "OPENAI_MODEL",
    }
}

fn credential(kind: ProviderKind) -> Option<String> {
    std::env::var(credential_var(kind)).ok()
}

/// Providers named in `PROVIDER_PRIORITY` come first, in the given order;
/// unnamed ones follow in their default order.
fn provider_priority() -> Result<Vec<ProviderKind>, ConfigError> {
    let raw = var_or("PROVIDER_PRIORITY", "cohere,groq,openai");
    let mut order = Vec::with_capacity(ProviderKind::ALL.len());
    for name in raw.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        let kind = ProviderKind::from_name(name).ok_or_else(|| {
            ConfigError::InvalidValue(
                "PROVIDER_PRIORITY".to_string(),
                format!("'{}' is not a known provider", name),
            )
        })?;
        if !order.contains(&kind) {
            order.push(kind);
        }
    }
    for kind in ProviderKind::ALL {
        if !order.contains(&kind) {
            order.push(kind);
        }
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use std::io::Write;

    const VARS: [&str; 17] = [
        "CohereAPIKey",
        "GroqAPIKey",
        "OPENAI_API_KEY",
        "Username",
        "Assistantname",
        "COHERE_MODEL",
        "GROQ_MODEL",
        "OPENAI_MODEL",
        "PROVIDER_PRIORITY",
        "CLASSIFIER_PROVIDER",
        "MIN_CALL_INTERVAL_MS",
        "MAX_RETRIES",
        "RETRY_BACKOFF_MS",
        "REQUEST_TIMEOUT_SECS",
        "HISTORY_WINDOW",
        "CHAT_LOG_PATH",
        "DATA_DIR",
    ];

    fn clear_env_vars() {
        unsafe {
            for var in VARS {
                env::remove_var(var);
            }
            env::remove_var("RUST_LOG");
        }
    }

    fn kinds(config: &Config) -> Vec<ProviderKind> {
        config.providers.iter().map(|p| p.kind).collect()
    }

    #[test]
    fn test_config_error_display() {
        let invalid_value =
            ConfigError::InvalidValue("MAX_RETRIES".to_string(), "bad_value".to_string());
        assert_eq!(
            format!("{}", invalid_value),
            "Invalid value for environment variable MAX_RETRIES: bad_value"
        );
    }

    #[test]
    #[serial]
    fn test_defaults_without_credentials() {
        clear_env_vars();

        let config = Config::from_env().expect("Config should load without any variables");

        assert_eq!(config.username, "User");
        assert_eq!(config.assistant_name, "Jarvis");
        assert_eq!(
            kinds(&config),
            vec![ProviderKind::Cohere, ProviderKind::Groq, ProviderKind::OpenAI]
        );
        assert!(config.providers.iter().all(|p| !p.is_enabled()));
        assert_eq!(config.classifier_provider, ProviderKind::Cohere);
        assert_eq!(config.min_call_interval, Duration::from_millis(1500));
        assert_eq!(config.retry, RetryPolicy::default());
        assert_eq!(config.history_window, 10);
        assert_eq!(config.chat_log_path, PathBuf::from("Data/ChatLog.json"));
        assert_eq!(config.data_dir, PathBuf::from("Data"));
        assert_eq!(config.log_level, Level::WARN);
    }

    #[test]
    #[serial]
    fn test_custom_values() {
        clear_env_vars();
        unsafe {
            env::set_var("CohereAPIKey", "cohere-key");
            env::set_var("GroqAPIKey", "   ");
            env::set_var("Username", "Ada");
            env::set_var("Assistantname", "Friday");
            env::set_var("GROQ_MODEL", "llama-3.1-8b-instant");
            env::set_var("PROVIDER_PRIORITY", "groq, openai");
            env::set_var("CLASSIFIER_PROVIDER", "Groq");
            env::set_var("MIN_CALL_INTERVAL_MS", "250");
            env::set_var("MAX_RETRIES", "4");
            env::set_var("REQUEST_TIMEOUT_SECS", "5");
            env::set_var("RUST_LOG", "debug");
        }

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.username, "Ada");
        assert_eq!(config.assistant_name, "Friday");
        assert_eq!(
            kinds(&config),
            vec![ProviderKind::Groq, ProviderKind::OpenAI, ProviderKind::Cohere]
        );
        assert_eq!(config.classifier_provider, ProviderKind::Groq);
        assert_eq!(config.min_call_interval, Duration::from_millis(250));
        assert_eq!(config.retry.max_retries, 4);
        assert_eq!(config.log_level, Level::DEBUG);

        let cohere = config.provider(ProviderKind::Cohere).unwrap();
        assert_eq!(cohere.credential(), Some("cohere-key"));
        assert_eq!(cohere.priority_rank, 2);
        assert_eq!(cohere.timeout, Duration::from_secs(5));

        let groq = config.provider(ProviderKind::Groq).unwrap();
        assert!(!groq.is_enabled());
        assert_eq!(groq.model, "llama-3.1-8b-instant");
    }

    #[test]
    #[serial]
    fn test_unknown_provider_in_priority() {
        clear_env_vars();
        unsafe {
            env::set_var("PROVIDER_PRIORITY", "cohere,gemini");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "PROVIDER_PRIORITY"),
            _ => panic!("Expected InvalidValue for PROVIDER_PRIORITY"),
        }
    }

    #[test]
    #[serial]
    fn test_invalid_interval() {
        clear_env_vars();
        unsafe {
            env::set_var("MIN_CALL_INTERVAL_MS", "soon");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "MIN_CALL_INTERVAL_MS"),
            _ => panic!("Expected InvalidValue for MIN_CALL_INTERVAL_MS"),
        }
    }

    #[test]
    #[serial]
    fn test_invalid_log_level() {
        clear_env_vars();
        unsafe {
            env::set_var("RUST_LOG", "not-a-level");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "RUST_LOG"),
            _ => panic!("Expected InvalidValue for RUST_LOG"),
        }
    }

    #[test]
    #[serial]
    fn test_env_file_is_read() {
        clear_env_vars();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Assistantname=Edith").unwrap();
        writeln!(file, "OPENAI_API_KEY=sk-test").unwrap();

        let config = Config::from_env_file(file.path()).expect("Config should load from file");
        clear_env_vars();

        assert_eq!(config.assistant_name, "Edith");
        assert!(config.provider(ProviderKind::OpenAI).unwrap().is_enabled());
    }

    #[test]
    #[serial]
    fn test_missing_env_file() {
        clear_env_vars();
        let err = Config::from_env_file(Path::new("/nonexistent/jarvis.env")).unwrap_err();
        assert!(matches!(err, ConfigError::EnvFile(..)));
    }
}
