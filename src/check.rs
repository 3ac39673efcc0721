//! Environment diagnostic.
//!
//! `gemini-voice-agent check` verifies that the pieces a job needs can be
//! constructed: configuration, the Gemini client, and a LiveKit token.
//! Failures are printed, not returned; the command always exits zero so it
//! can run in incomplete environments.

use std::path::PathBuf;

use livekit_api::access_token::{AccessToken, VideoGrants};

use crate::config::AgentConfig;
use crate::realtime::gemini::GeminiLive;
use crate::realtime::{Modality, RealtimeConfig};

/// Run all checks, printing one line per result.
pub fn run(config_path: Option<&PathBuf>) {
    println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    let config = match load_config(config_path) {
        Ok(config) => {
            println!("Configuration loaded (LiveKit URL: {})", config.livekit_url);
            config
        }
        Err(e) => {
            println!("Failed to load configuration: {e}");
            println!("Continuing with defaults");
            AgentConfig::default()
        }
    };

    match check_gemini_client(&config) {
        Ok(model) => println!("Gemini Live client ready (model: {model})"),
        Err(e) => println!("Gemini Live client unavailable: {e}"),
    }

    match check_livekit_token(&config) {
        Ok(()) => println!("LiveKit token minting works"),
        Err(e) => println!("LiveKit token minting failed: {e}"),
    }
}

fn load_config(path: Option<&PathBuf>) -> crate::errors::AgentResult<AgentConfig> {
    match path {
        Some(path) => AgentConfig::from_file(path),
        None => AgentConfig::from_env(),
    }
}

fn check_gemini_client(config: &AgentConfig) -> crate::errors::AgentResult<String> {
    let api_key = config.require_google_api_key()?;
    let client = GeminiLive::new(RealtimeConfig {
        api_key,
        model: config.model.clone(),
        voice: config.voice.clone(),
        temperature: config.temperature,
        modalities: vec![Modality::Audio],
        instructions: String::new(),
        tools: Vec::new(),
    })?;
    drop(client);
    Ok(config.model.clone())
}

fn check_livekit_token(config: &AgentConfig) -> crate::errors::AgentResult<()> {
    let (key, secret) = config.require_livekit_credentials()?;
    AccessToken::with_api_key(&key, &secret)
        .with_identity("diagnostic")
        .with_grants(VideoGrants {
            room_join: true,
            room: "diagnostic".to_string(),
            ..Default::default()
        })
        .to_jwt()
        .map_err(crate::errors::AgentError::from)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gemini_check_requires_api_key() {
        let config = AgentConfig::default();
        let err = check_gemini_client(&config).unwrap_err();
        assert!(err.to_string().contains("GOOGLE_API_KEY"));
    }

    #[test]
    fn test_token_check_with_credentials() {
        let mut config = AgentConfig::default();
        config.livekit_api_key = Some("devkey".to_string());
        config.livekit_api_secret = Some("a-long-enough-development-secret".to_string());
        check_livekit_token(&config).unwrap();
    }

    #[test]
    fn test_run_never_panics_without_env() {
        // All failures must degrade to printed messages
        run(None);
    }
}
