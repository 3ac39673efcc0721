//! Agent configuration.
//!
//! Configuration is loaded explicitly at process start and returned as an
//! immutable value. Priority: YAML file > environment variables (including
//! values from a `.env` file loaded in `main`) > defaults.

use std::env;
use std::path::PathBuf;

mod yaml;

use crate::errors::{AgentError, AgentResult};

/// Default Gemini Live model, matching the deployed agent.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-native-audio-preview-12-2025";

/// Default voice for generated speech.
pub const DEFAULT_VOICE: &str = "Puck";

/// Default sampling temperature for reply generation.
pub const DEFAULT_TEMPERATURE: f32 = 0.8;

/// Process configuration for the agent worker.
///
/// Constructed once per process and never mutated afterwards. Per-job state
/// lives in [`crate::worker::JobContext`], not here.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// LiveKit server URL (ws:// or wss://, http(s) accepted and normalized)
    pub livekit_url: String,
    /// LiveKit API key used to mint worker and room tokens
    pub livekit_api_key: Option<String>,
    /// LiveKit API secret used to mint worker and room tokens
    pub livekit_api_secret: Option<String>,
    /// Google AI Studio API key for the Gemini Live API
    pub google_api_key: Option<String>,
    /// Agent name announced during worker registration (empty = unnamed)
    pub agent_name: String,
    /// Gemini Live model identifier
    pub model: String,
    /// Voice identifier for generated speech
    pub voice: String,
    /// Sampling temperature for reply generation
    pub temperature: f32,
}

/// Zeroize secret fields when the config is dropped.
impl Drop for AgentConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        if let Some(ref mut secret) = self.livekit_api_secret {
            secret.zeroize();
        }
        if let Some(ref mut key) = self.livekit_api_key {
            key.zeroize();
        }
        if let Some(ref mut key) = self.google_api_key {
            key.zeroize();
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            livekit_url: "ws://localhost:7880".to_string(),
            livekit_api_key: None,
            livekit_api_secret: None,
            google_api_key: None,
            agent_name: String::new(),
            model: DEFAULT_MODEL.to_string(),
            voice: DEFAULT_VOICE.to_string(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

impl AgentConfig {
    /// Load configuration from environment variables with defaults.
    pub fn from_env() -> AgentResult<Self> {
        let mut config = Self::default();

        if let Ok(url) = env::var("LIVEKIT_URL") {
            config.livekit_url = url;
        }
        config.livekit_api_key = env::var("LIVEKIT_API_KEY").ok().filter(|v| !v.is_empty());
        config.livekit_api_secret = env::var("LIVEKIT_API_SECRET").ok().filter(|v| !v.is_empty());
        // GOOGLE_API_KEY is the documented name; GEMINI_API_KEY is accepted as
        // an alias because the AI Studio tooling exports it under that name.
        config.google_api_key = env::var("GOOGLE_API_KEY")
            .or_else(|_| env::var("GEMINI_API_KEY"))
            .ok()
            .filter(|v| !v.is_empty());
        if let Ok(name) = env::var("AGENT_NAME") {
            config.agent_name = name;
        }
        if let Ok(model) = env::var("GEMINI_MODEL") {
            if !model.is_empty() {
                config.model = model;
            }
        }
        if let Ok(voice) = env::var("GEMINI_VOICE") {
            if !voice.is_empty() {
                config.voice = voice;
            }
        }
        if let Ok(temp) = env::var("GEMINI_TEMPERATURE") {
            config.temperature = temp
                .parse()
                .map_err(|_| AgentError::Config(format!("Invalid GEMINI_TEMPERATURE: {temp}")))?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable base.
    ///
    /// Environment variables (and `.env` values loaded in `main`) provide the
    /// base configuration; the YAML file overrides specific values.
    pub fn from_file(path: &PathBuf) -> AgentResult<Self> {
        let overrides = yaml::YamlConfig::from_file(path)?;
        let mut config = Self::from_env()?;
        overrides.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> AgentResult<()> {
        let url = &self.livekit_url;
        if !(url.starts_with("ws://")
            || url.starts_with("wss://")
            || url.starts_with("http://")
            || url.starts_with("https://"))
        {
            return Err(AgentError::Config(format!(
                "LIVEKIT_URL must be a ws(s):// or http(s):// URL, got '{url}'"
            )));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(AgentError::Config(format!(
                "Temperature must be in [0.0, 2.0], got {}",
                self.temperature
            )));
        }
        Ok(())
    }

    /// LiveKit URL normalized to a WebSocket scheme, without a trailing slash.
    pub fn livekit_ws_url(&self) -> String {
        let url = self.livekit_url.trim_end_matches('/');
        if let Some(rest) = url.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = url.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            url.to_string()
        }
    }

    /// LiveKit credentials, required to run the worker.
    pub fn require_livekit_credentials(&self) -> AgentResult<(String, String)> {
        let key = self
            .livekit_api_key
            .clone()
            .ok_or_else(|| AgentError::Config("LIVEKIT_API_KEY is required".to_string()))?;
        let secret = self
            .livekit_api_secret
            .clone()
            .ok_or_else(|| AgentError::Config("LIVEKIT_API_SECRET is required".to_string()))?;
        Ok((key, secret))
    }

    /// Google API key, required to reach the Gemini Live API.
    pub fn require_google_api_key(&self) -> AgentResult<String> {
        self.google_api_key
            .clone()
            .ok_or_else(|| AgentError::Config("GOOGLE_API_KEY is required".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    fn clear_agent_env() {
        for var in [
            "LIVEKIT_URL",
            "LIVEKIT_API_KEY",
            "LIVEKIT_API_SECRET",
            "GOOGLE_API_KEY",
            "GEMINI_API_KEY",
            "AGENT_NAME",
            "GEMINI_MODEL",
            "GEMINI_VOICE",
            "GEMINI_TEMPERATURE",
        ] {
            unsafe { env::remove_var(var) };
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_agent_env();
        let config = AgentConfig::from_env().unwrap();
        assert_eq!(config.livekit_url, "ws://localhost:7880");
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.voice, "Puck");
        assert_eq!(config.temperature, 0.8);
        assert!(config.livekit_api_key.is_none());
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_agent_env();
        unsafe {
            env::set_var("LIVEKIT_URL", "wss://cloud.example.com");
            env::set_var("LIVEKIT_API_KEY", "key");
            env::set_var("LIVEKIT_API_SECRET", "secret");
            env::set_var("GEMINI_VOICE", "Kore");
        }
        let config = AgentConfig::from_env().unwrap();
        assert_eq!(config.livekit_url, "wss://cloud.example.com");
        assert_eq!(config.voice, "Kore");
        let (key, secret) = config.require_livekit_credentials().unwrap();
        assert_eq!(key, "key");
        assert_eq!(secret, "secret");
        clear_agent_env();
    }

    #[test]
    #[serial]
    fn test_gemini_api_key_alias() {
        clear_agent_env();
        unsafe { env::set_var("GEMINI_API_KEY", "aliased") };
        let config = AgentConfig::from_env().unwrap();
        assert_eq!(config.require_google_api_key().unwrap(), "aliased");
        clear_agent_env();
    }

    #[test]
    #[serial]
    fn test_invalid_temperature_rejected() {
        clear_agent_env();
        unsafe { env::set_var("GEMINI_TEMPERATURE", "not-a-number") };
        assert!(AgentConfig::from_env().is_err());
        unsafe { env::set_var("GEMINI_TEMPERATURE", "3.5") };
        assert!(AgentConfig::from_env().is_err());
        clear_agent_env();
    }

    #[test]
    #[serial]
    fn test_invalid_url_rejected() {
        clear_agent_env();
        unsafe { env::set_var("LIVEKIT_URL", "ftp://nope") };
        assert!(AgentConfig::from_env().is_err());
        clear_agent_env();
    }

    #[test]
    fn test_ws_url_normalization() {
        let mut config = AgentConfig::default();
        config.livekit_url = "https://cloud.example.com/".to_string();
        assert_eq!(config.livekit_ws_url(), "wss://cloud.example.com");

        config.livekit_url = "http://localhost:7880".to_string();
        assert_eq!(config.livekit_ws_url(), "ws://localhost:7880");
    }

    #[test]
    #[serial]
    fn test_yaml_overrides_env() {
        clear_agent_env();
        unsafe {
            env::set_var("LIVEKIT_URL", "ws://from-env:7880");
            env::set_var("GOOGLE_API_KEY", "env-key");
        }

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("agent.yaml");
        fs::write(
            &path,
            "livekit_url: wss://from-yaml.example.com\nvoice: Charon\ntemperature: 0.5\n",
        )
        .unwrap();

        let config = AgentConfig::from_file(&path).unwrap();
        assert_eq!(config.livekit_url, "wss://from-yaml.example.com");
        assert_eq!(config.voice, "Charon");
        assert_eq!(config.temperature, 0.5);
        // Values not present in the YAML keep their env base
        assert_eq!(config.google_api_key.as_deref(), Some("env-key"));
        clear_agent_env();
    }

    #[test]
    fn test_missing_credentials_reported() {
        let config = AgentConfig::default();
        let err = config.require_livekit_credentials().unwrap_err();
        assert!(err.to_string().contains("LIVEKIT_API_KEY"));
        let err = config.require_google_api_key().unwrap_err();
        assert!(err.to_string().contains("GOOGLE_API_KEY"));
    }
}
