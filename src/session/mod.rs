//! Agent session: binds a LiveKit room to a realtime model.
//!
//! The session owns the model client and the room event loop. Remote audio
//! (and, when enabled, video) flows into the model; generated speech flows
//! back out through a published audio track; model tool calls are dispatched
//! through the session's tool registry.

use std::sync::Arc;

use livekit::track::RemoteTrack;
use livekit::{Room, RoomEvent};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

use crate::agent::Agent;
use crate::config::AgentConfig;
use crate::errors::{AgentError, AgentResult};
use crate::realtime::gemini::GeminiLive;
use crate::realtime::{Modality, RealtimeConfig};
use crate::tools::ToolRegistry;

pub mod room_io;

pub use room_io::RoomIoOptions;

/// Model-side configuration for a session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub api_key: String,
    pub model: String,
    pub voice: String,
    pub temperature: f32,
    pub modalities: Vec<Modality>,
}

impl SessionOptions {
    /// Build session options from process configuration. Audio-only output.
    pub fn from_config(config: &AgentConfig) -> AgentResult<Self> {
        Ok(Self {
            api_key: config.require_google_api_key()?,
            model: config.model.clone(),
            voice: config.voice.clone(),
            temperature: config.temperature,
            modalities: vec![Modality::Audio],
        })
    }
}

/// A running (or startable) room-to-model session.
pub struct AgentSession {
    options: SessionOptions,
    registry: Arc<ToolRegistry>,
    client: Mutex<Option<Arc<GeminiLive>>>,
    room_task: Mutex<Option<JoinHandle<()>>>,
}

impl AgentSession {
    pub fn new(options: SessionOptions, registry: ToolRegistry) -> Self {
        Self {
            options,
            registry: Arc::new(registry),
            client: Mutex::new(None),
            room_task: Mutex::new(None),
        }
    }

    /// Connect the model client and wire it to the room.
    ///
    /// `events` must be the receiver returned by `Room::connect` for `room`.
    pub async fn start(
        &self,
        room: Arc<Room>,
        events: mpsc::UnboundedReceiver<RoomEvent>,
        agent: &Agent,
        room_options: RoomIoOptions,
    ) -> AgentResult<()> {
        if self.client.lock().await.is_some() {
            return Err(AgentError::Session("Session already started".to_string()));
        }

        let realtime_config = RealtimeConfig {
            api_key: self.options.api_key.clone(),
            model: self.options.model.clone(),
            voice: self.options.voice.clone(),
            temperature: self.options.temperature,
            modalities: self.options.modalities.clone(),
            instructions: agent.instructions.clone(),
            tools: self.registry.definitions(),
        };
        let client = Arc::new(GeminiLive::new(realtime_config)?);

        let audio_source = room_io::publish_audio_track(&room).await?;
        tracing::info!(room = %room.name(), "Published agent audio track");

        // Model speech goes straight into the published track
        let source = audio_source.clone();
        client
            .on_audio(Arc::new(move |audio| {
                let source = source.clone();
                Box::pin(async move {
                    room_io::capture_model_audio(&source, &audio).await;
                })
            }))
            .await;

        client.connect().await?;
        let handle = client.handle().await?;

        // Tool calls run through the registry; the result (or the error text)
        // goes back to the model so it can speak an answer either way
        let registry = self.registry.clone();
        let tool_handle = handle.clone();
        client
            .on_function_call(Arc::new(move |request| {
                let registry = registry.clone();
                let handle = tool_handle.clone();
                Box::pin(async move {
                    tracing::info!(tool = %request.name, "Dispatching tool call");
                    let output = match registry.dispatch(&request.name, request.arguments).await {
                        Ok(output) => output,
                        Err(e) => {
                            tracing::warn!(tool = %request.name, "Tool call failed: {}", e);
                            e.to_string()
                        }
                    };
                    if let Err(e) = handle
                        .send_tool_response(&request.call_id, &request.name, &output)
                        .await
                    {
                        tracing::error!("Failed to submit tool response: {}", e);
                    }
                })
            }))
            .await;

        client
            .on_error(Arc::new(|e| {
                Box::pin(async move {
                    tracing::error!("Realtime session error: {}", e);
                })
            }))
            .await;

        let task = Self::spawn_room_loop(events, client.clone(), handle, room_options);
        *self.room_task.lock().await = Some(task);
        *self.client.lock().await = Some(client);
        Ok(())
    }

    fn spawn_room_loop(
        mut events: mpsc::UnboundedReceiver<RoomEvent>,
        client: Arc<GeminiLive>,
        handle: crate::realtime::gemini::GeminiHandle,
        options: RoomIoOptions,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    RoomEvent::TrackSubscribed {
                        track, participant, ..
                    } => match track {
                        RemoteTrack::Audio(audio) => {
                            tracing::info!(
                                participant = %participant.identity(),
                                "Forwarding subscribed audio track"
                            );
                            room_io::forward_remote_audio(audio, handle.clone());
                        }
                        RemoteTrack::Video(video) => {
                            if options.video_input {
                                tracing::info!(
                                    participant = %participant.identity(),
                                    "Forwarding subscribed video track"
                                );
                                room_io::forward_remote_video(video, handle.clone());
                            } else {
                                tracing::debug!("Video input disabled, ignoring video track");
                            }
                        }
                    },
                    RoomEvent::ParticipantDisconnected(participant) => {
                        if options.close_on_disconnect {
                            tracing::info!(
                                participant = %participant.identity(),
                                "Participant disconnected, closing session"
                            );
                            break;
                        }
                        tracing::info!(
                            participant = %participant.identity(),
                            "Participant disconnected, keeping session alive"
                        );
                    }
                    RoomEvent::Disconnected { reason } => {
                        tracing::info!(?reason, "Room disconnected");
                        break;
                    }
                    _ => {}
                }
            }

            if let Err(e) = client.disconnect().await {
                tracing::warn!("Error closing realtime client: {}", e);
            }
            tracing::info!("Session room loop finished");
        })
    }

    /// Ask the model for one spoken reply following `instructions`.
    pub async fn generate_reply(&self, instructions: &str) -> AgentResult<()> {
        let client = self
            .client
            .lock()
            .await
            .clone()
            .ok_or_else(|| AgentError::Session("Session not started".to_string()))?;
        client.handle().await?.send_user_turn(instructions).await?;
        Ok(())
    }

    /// Wait until the session's room loop finishes.
    pub async fn closed(&self) -> AgentResult<()> {
        let task = self.room_task.lock().await.take();
        if let Some(task) = task {
            task.await
                .map_err(|e| AgentError::Session(format!("Room loop panicked: {e}")))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_options() -> SessionOptions {
        SessionOptions {
            api_key: "test-key".to_string(),
            model: "gemini-2.5-flash-native-audio-preview-12-2025".to_string(),
            voice: "Puck".to_string(),
            temperature: 0.8,
            modalities: vec![Modality::Audio],
        }
    }

    #[test]
    fn test_options_from_config() {
        let mut config = AgentConfig::default();
        config.google_api_key = Some("key".to_string());
        let options = SessionOptions::from_config(&config).unwrap();
        assert_eq!(options.voice, "Puck");
        assert_eq!(options.temperature, 0.8);
        assert_eq!(options.modalities, vec![Modality::Audio]);
    }

    #[test]
    fn test_options_require_api_key() {
        let config = AgentConfig::default();
        assert!(SessionOptions::from_config(&config).is_err());
    }

    #[tokio::test]
    async fn test_generate_reply_requires_start() {
        let session = AgentSession::new(test_options(), ToolRegistry::builtin());
        let err = session.generate_reply("Say hi").await.unwrap_err();
        assert!(matches!(err, AgentError::Session(_)));
    }

    #[tokio::test]
    async fn test_closed_before_start_is_noop() {
        let session = AgentSession::new(test_options(), ToolRegistry::builtin());
        session.closed().await.unwrap();
    }
}
