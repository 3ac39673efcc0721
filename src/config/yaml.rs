//! YAML configuration file support.

use std::fs;
use std::path::PathBuf;

use serde::Deserialize;

use super::AgentConfig;
use crate::errors::{AgentError, AgentResult};

/// Partial configuration parsed from a YAML file.
///
/// Every field is optional so a file only needs to name the values it
/// overrides.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct YamlConfig {
    pub livekit_url: Option<String>,
    pub livekit_api_key: Option<String>,
    pub livekit_api_secret: Option<String>,
    pub google_api_key: Option<String>,
    pub agent_name: Option<String>,
    pub model: Option<String>,
    pub voice: Option<String>,
    pub temperature: Option<f32>,
}

impl YamlConfig {
    pub fn from_file(path: &PathBuf) -> AgentResult<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            AgentError::Config(format!("Failed to read config file {}: {e}", path.display()))
        })?;
        serde_yaml::from_str(&contents).map_err(|e| {
            AgentError::Config(format!("Failed to parse config file {}: {e}", path.display()))
        })
    }

    /// Apply the file's values on top of an existing configuration.
    pub fn apply(self, config: &mut AgentConfig) {
        if let Some(url) = self.livekit_url {
            config.livekit_url = url;
        }
        if let Some(key) = self.livekit_api_key {
            config.livekit_api_key = Some(key);
        }
        if let Some(secret) = self.livekit_api_secret {
            config.livekit_api_secret = Some(secret);
        }
        if let Some(key) = self.google_api_key {
            config.google_api_key = Some(key);
        }
        if let Some(name) = self.agent_name {
            config.agent_name = name;
        }
        if let Some(model) = self.model {
            config.model = model;
        }
        if let Some(voice) = self.voice {
            config.voice = voice;
        }
        if let Some(temperature) = self.temperature {
            config.temperature = temperature;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_partial_file_parses() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("agent.yaml");
        fs::write(&path, "voice: Aoede\n").unwrap();

        let parsed = YamlConfig::from_file(&path).unwrap();
        assert_eq!(parsed.voice.as_deref(), Some("Aoede"));
        assert!(parsed.livekit_url.is_none());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("agent.yaml");
        fs::write(&path, "voicee: typo\n").unwrap();

        assert!(YamlConfig::from_file(&path).is_err());
    }

    #[test]
    fn test_missing_file_reports_path() {
        let path = PathBuf::from("/nonexistent/agent.yaml");
        let err = YamlConfig::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/agent.yaml"));
    }
}
