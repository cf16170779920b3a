use gemini_realtime::{ApiKey, ConfigError as KeyError, LiveConfig, config as live};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::{Level, info, warn};

/// The system instruction used when no `system_prompt.md` is found.
pub const DEFAULT_SYSTEM_PROMPT: &str = include_str!("../../../prompts/system_prompt.md");

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub gemini_api_key: ApiKey,
    pub gemini_model: String,
    pub gemini_voice: String,
    pub gemini_ws_url: String,
    pub log_level: Level,
    pub prompts_path: PathBuf,
    pub public_dir: PathBuf,
    pub environment: String,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address_str = match (std::env::var("BIND_ADDRESS"), std::env::var("PORT")) {
            (Ok(address), _) => address,
            (Err(_), Ok(port)) => {
                let port = port.parse::<u16>().map_err(|e| {
                    ConfigError::InvalidValue("PORT".to_string(), e.to_string())
                })?;
                format!("0.0.0.0:{}", port)
            }
            _ => "0.0.0.0:3000".to_string(),
        };
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let raw_key = std::env::var("GEMINI_API_KEY").unwrap_or_default();
        let gemini_api_key = ApiKey::parse(&raw_key).map_err(|e| match e {
            KeyError::MissingApiKey => ConfigError::MissingVar("GEMINI_API_KEY".to_string()),
            KeyError::MalformedApiKey => ConfigError::InvalidValue(
                "GEMINI_API_KEY".to_string(),
                format!("should start with \"{}\"", live::API_KEY_PREFIX),
            ),
        })?;

        let gemini_model =
            std::env::var("GEMINI_MODEL").unwrap_or_else(|_| live::DEFAULT_MODEL.to_string());
        let gemini_voice =
            std::env::var("GEMINI_VOICE").unwrap_or_else(|_| live::DEFAULT_VOICE.to_string());
        let gemini_ws_url =
            std::env::var("GEMINI_WS_URL").unwrap_or_else(|_| live::DEFAULT_ENDPOINT.to_string());

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let prompts_path = std::env::var("PROMPTS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./prompts"));
        let public_dir = std::env::var("PUBLIC_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./public"));
        let environment = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        Ok(Self {
            bind_address,
            gemini_api_key,
            gemini_model,
            gemini_voice,
            gemini_ws_url,
            log_level,
            prompts_path,
            public_dir,
            environment,
        })
    }

    /// Builds the immutable upstream session configuration shared by all clients.
    pub fn live_config(&self, system_prompt: impl Into<String>) -> LiveConfig {
        LiveConfig::new(self.gemini_api_key.expose(), system_prompt)
            .with_model(self.gemini_model.clone())
            .with_voice(self.gemini_voice.clone())
            .with_endpoint(self.gemini_ws_url.clone())
    }
}

/// Reads `system_prompt.md` from the prompts directory, falling back to the built-in prompt.
pub fn load_system_prompt(prompts_path: &Path) -> String {
    let path = prompts_path.join("system_prompt.md");
    match std::fs::read_to_string(&path) {
        Ok(prompt) if !prompt.trim().is_empty() => {
            info!(path = %path.display(), "Loaded system prompt");
            prompt
        }
        Ok(_) => {
            warn!(path = %path.display(), "System prompt file is empty; using built-in prompt");
            DEFAULT_SYSTEM_PROMPT.to_string()
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "System prompt not readable; using built-in prompt");
            DEFAULT_SYSTEM_PROMPT.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use tracing::Level;

    fn clear_env_vars() {
        unsafe {
            env::remove_var("BIND_ADDRESS");
            env::remove_var("PORT");
            env::remove_var("GEMINI_API_KEY");
            env::remove_var("GEMINI_MODEL");
            env::remove_var("GEMINI_VOICE");
            env::remove_var("GEMINI_WS_URL");
            env::remove_var("RUST_LOG");
            env::remove_var("PROMPTS_PATH");
            env::remove_var("PUBLIC_DIR");
            env::remove_var("APP_ENV");
        }
    }

    fn set_minimal_env() {
        unsafe {
            env::set_var("GEMINI_API_KEY", "AIzaTestKey");
        }
    }

    #[test]
    fn test_config_error_display() {
        let missing_var = ConfigError::MissingVar("TEST_VAR".to_string());
        assert_eq!(
            format!("{}", missing_var),
            "Missing environment variable: TEST_VAR"
        );

        let invalid_value =
            ConfigError::InvalidValue("TEST_VAR".to_string(), "bad_value".to_string());
        assert_eq!(
            format!("{}", invalid_value),
            "Invalid value for environment variable TEST_VAR: bad_value"
        );
    }

    #[test]
    #[serial]
    fn test_config_from_env_minimal() {
        clear_env_vars();
        set_minimal_env();

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.bind_address.to_string(), "0.0.0.0:3000");
        assert_eq!(config.gemini_api_key.expose(), "AIzaTestKey");
        assert_eq!(config.gemini_model, "gemini-2.0-flash-live-001");
        assert_eq!(config.gemini_voice, "Aoede");
        assert_eq!(config.gemini_ws_url, live::DEFAULT_ENDPOINT);
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.prompts_path, PathBuf::from("./prompts"));
        assert_eq!(config.public_dir, PathBuf::from("./public"));
        assert_eq!(config.environment, "development");
    }

    #[test]
    #[serial]
    fn test_config_from_env_custom_values() {
        clear_env_vars();
        unsafe {
            env::set_var("BIND_ADDRESS", "127.0.0.1:8080");
            env::set_var("GEMINI_API_KEY", "AIzaCustom");
            env::set_var("GEMINI_MODEL", "gemini-live-2.5-flash-preview");
            env::set_var("GEMINI_VOICE", "Puck");
            env::set_var("GEMINI_WS_URL", "ws://127.0.0.1:9999/live");
            env::set_var("RUST_LOG", "debug");
            env::set_var("PROMPTS_PATH", "/custom/prompts");
            env::set_var("PUBLIC_DIR", "/srv/public");
            env::set_var("APP_ENV", "production");
        }

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.bind_address.to_string(), "127.0.0.1:8080");
        assert_eq!(config.gemini_model, "gemini-live-2.5-flash-preview");
        assert_eq!(config.gemini_voice, "Puck");
        assert_eq!(config.gemini_ws_url, "ws://127.0.0.1:9999/live");
        assert_eq!(config.log_level, Level::DEBUG);
        assert_eq!(config.prompts_path, PathBuf::from("/custom/prompts"));
        assert_eq!(config.public_dir, PathBuf::from("/srv/public"));
        assert_eq!(config.environment, "production");
    }

    #[test]
    #[serial]
    fn test_config_port_fallback() {
        clear_env_vars();
        set_minimal_env();
        unsafe {
            env::set_var("PORT", "8088");
        }

        let config = Config::from_env().expect("Config should load successfully");
        assert_eq!(config.bind_address.to_string(), "0.0.0.0:8088");
    }

    #[test]
    #[serial]
    fn test_config_invalid_port() {
        clear_env_vars();
        set_minimal_env();
        unsafe {
            env::set_var("PORT", "eighty");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "PORT"),
            _ => panic!("Expected InvalidValue for PORT"),
        }
    }

    #[test]
    #[serial]
    fn test_config_invalid_bind_address() {
        clear_env_vars();
        set_minimal_env();
        unsafe {
            env::set_var("BIND_ADDRESS", "not-a-valid-address");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "BIND_ADDRESS"),
            _ => panic!("Expected InvalidValue for BIND_ADDRESS"),
        }
    }

    #[test]
    #[serial]
    fn test_config_invalid_log_level() {
        clear_env_vars();
        set_minimal_env();
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
    fn test_config_missing_api_key() {
        clear_env_vars();

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::MissingVar(msg) => assert!(msg.contains("GEMINI_API_KEY")),
            _ => panic!("Expected MissingVar for GEMINI_API_KEY"),
        }
    }

    #[test]
    #[serial]
    fn test_config_malformed_api_key() {
        clear_env_vars();
        unsafe {
            env::set_var("GEMINI_API_KEY", "sk-not-a-gemini-key");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, reason) => {
                assert_eq!(var, "GEMINI_API_KEY");
                assert!(reason.contains("\"AI\""));
            }
            _ => panic!("Expected InvalidValue for GEMINI_API_KEY"),
        }
    }

    #[test]
    #[serial]
    fn test_live_config_uses_env_values() {
        clear_env_vars();
        set_minimal_env();
        unsafe {
            env::set_var("GEMINI_VOICE", "Kore");
        }

        let config = Config::from_env().expect("Config should load successfully");
        let live_config = config.live_config("Be brief.");
        assert_eq!(live_config.api_key, "AIzaTestKey");
        assert_eq!(live_config.voice, "Kore");
        assert_eq!(live_config.system_instruction, "Be brief.");
        assert_eq!(live_config.reconnect.max_attempts, 3);
    }

    #[test]
    fn test_load_system_prompt_falls_back() {
        let prompt = load_system_prompt(Path::new("/definitely/not/a/prompts/dir"));
        assert_eq!(prompt, DEFAULT_SYSTEM_PROMPT);
        assert!(prompt.contains("Revolt Motors"));
    }
}
