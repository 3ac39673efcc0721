//! Wire types for the Gemini Live (BidiGenerateContent) protocol.
//!
//! Messages are JSON objects framed by field presence: a client message
//! carries exactly one of `setup`, `realtimeInput`, `clientContent` or
//! `toolResponse`, and a server message exactly one of its variants. All
//! fields are camelCase on the wire.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::config::{AUDIO_INPUT_MIME, VIDEO_INPUT_MIME, qualified_model_name};
use crate::realtime::{RealtimeConfig, ToolDefinition};

/// Outbound message to the Gemini Live API.
#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ClientMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub setup: Option<Setup>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub realtime_input: Option<RealtimeInput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_content: Option<ClientContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_response: Option<ToolResponse>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Setup {
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speech_config: Option<SpeechConfig>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechConfig {
    pub voice_config: VoiceConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceConfig {
    pub prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrebuiltVoiceConfig {
    pub voice_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<Blob>,
}

/// Base64-encoded media payload with its mime type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInput {
    pub media_chunks: Vec<Blob>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientContent {
    pub turns: Vec<Content>,
    pub turn_complete: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResponse {
    pub function_responses: Vec<FunctionResponse>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionResponse {
    pub id: String,
    pub name: String,
    pub response: Value,
}

impl ClientMessage {
    /// Initial setup message configuring the session.
    pub fn setup(config: &RealtimeConfig) -> Self {
        let tools = if config.tools.is_empty() {
            None
        } else {
            Some(vec![Tool {
                function_declarations: config
                    .tools
                    .iter()
                    .map(FunctionDeclaration::from)
                    .collect(),
            }])
        };
        Self {
            setup: Some(Setup {
                model: qualified_model_name(&config.model),
                generation_config: Some(GenerationConfig {
                    response_modalities: config
                        .modalities
                        .iter()
                        .map(|m| m.as_str().to_string())
                        .collect(),
                    temperature: Some(config.temperature),
                    speech_config: Some(SpeechConfig {
                        voice_config: VoiceConfig {
                            prebuilt_voice_config: PrebuiltVoiceConfig {
                                voice_name: config.voice.clone(),
                            },
                        },
                    }),
                }),
                system_instruction: if config.instructions.is_empty() {
                    None
                } else {
                    Some(Content {
                        parts: vec![Part {
                            text: Some(config.instructions.clone()),
                            inline_data: None,
                        }],
                        role: None,
                    })
                },
                tools,
            }),
            ..Default::default()
        }
    }

    /// A chunk of PCM16 microphone audio.
    pub fn audio_chunk(pcm16: &[u8]) -> Self {
        Self {
            realtime_input: Some(RealtimeInput {
                media_chunks: vec![Blob {
                    mime_type: AUDIO_INPUT_MIME.to_string(),
                    data: BASE64.encode(pcm16),
                }],
            }),
            ..Default::default()
        }
    }

    /// A JPEG-encoded video frame.
    pub fn video_frame(jpeg: &[u8]) -> Self {
        Self {
            realtime_input: Some(RealtimeInput {
                media_chunks: vec![Blob {
                    mime_type: VIDEO_INPUT_MIME.to_string(),
                    data: BASE64.encode(jpeg),
                }],
            }),
            ..Default::default()
        }
    }

    /// A completed user text turn, prompting a model response.
    pub fn user_turn(text: &str) -> Self {
        Self {
            client_content: Some(ClientContent {
                turns: vec![Content {
                    parts: vec![Part {
                        text: Some(text.to_string()),
                        inline_data: None,
                    }],
                    role: Some("user".to_string()),
                }],
                turn_complete: true,
            }),
            ..Default::default()
        }
    }

    /// The result of a tool invocation, echoing the call id.
    pub fn tool_response(call_id: &str, name: &str, output: &str) -> Self {
        Self {
            tool_response: Some(ToolResponse {
                function_responses: vec![FunctionResponse {
                    id: call_id.to_string(),
                    name: name.to_string(),
                    response: json!({ "output": output }),
                }],
            }),
            ..Default::default()
        }
    }
}

impl From<&ToolDefinition> for FunctionDeclaration {
    fn from(def: &ToolDefinition) -> Self {
        Self {
            name: def.name.clone(),
            description: def.description.clone(),
            parameters: def.parameters.clone(),
        }
    }
}

/// Inbound message from the Gemini Live API.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    pub setup_complete: Option<SetupComplete>,
    pub server_content: Option<ServerContent>,
    pub tool_call: Option<ToolCall>,
    pub tool_call_cancellation: Option<ToolCallCancellation>,
    pub go_away: Option<GoAway>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SetupComplete {}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ServerContent {
    pub model_turn: Option<Content>,
    #[serde(default)]
    pub turn_complete: bool,
    #[serde(default)]
    pub interrupted: bool,
    pub input_transcription: Option<Transcription>,
    pub output_transcription: Option<Transcription>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Transcription {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCall {
    #[serde(default)]
    pub function_calls: Vec<FunctionCall>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionCall {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallCancellation {
    #[serde(default)]
    pub ids: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoAway {
    pub time_left: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::Modality;

    fn test_config() -> RealtimeConfig {
        RealtimeConfig {
            api_key: "test-key".to_string(),
            model: "gemini-2.5-flash-native-audio-preview-12-2025".to_string(),
            voice: "Puck".to_string(),
            temperature: 0.8,
            modalities: vec![Modality::Audio],
            instructions: "Be helpful.".to_string(),
            tools: vec![ToolDefinition {
                name: "get_weather".to_string(),
                description: "Get the weather".to_string(),
                parameters: json!({"type": "object"}),
            }],
        }
    }

    #[test]
    fn test_setup_wire_format() {
        let msg = ClientMessage::setup(&test_config());
        let wire: Value = serde_json::to_value(&msg).unwrap();

        assert_eq!(
            wire["setup"]["model"],
            "models/gemini-2.5-flash-native-audio-preview-12-2025"
        );
        assert_eq!(
            wire["setup"]["generationConfig"]["responseModalities"][0],
            "AUDIO"
        );
        assert_eq!(
            wire["setup"]["generationConfig"]["speechConfig"]["voiceConfig"]["prebuiltVoiceConfig"]
                ["voiceName"],
            "Puck"
        );
        assert_eq!(
            wire["setup"]["systemInstruction"]["parts"][0]["text"],
            "Be helpful."
        );
        assert_eq!(
            wire["setup"]["tools"][0]["functionDeclarations"][0]["name"],
            "get_weather"
        );
        // Only the setup field is present
        assert!(wire.get("realtimeInput").is_none());
    }

    #[test]
    fn test_audio_chunk_wire_format() {
        let msg = ClientMessage::audio_chunk(&[0u8, 1, 2, 3]);
        let wire: Value = serde_json::to_value(&msg).unwrap();
        let chunk = &wire["realtimeInput"]["mediaChunks"][0];
        assert_eq!(chunk["mimeType"], "audio/pcm;rate=16000");
        assert_eq!(chunk["data"], BASE64.encode([0u8, 1, 2, 3]));
    }

    #[test]
    fn test_user_turn_wire_format() {
        let msg = ClientMessage::user_turn("Hello there");
        let wire: Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(wire["clientContent"]["turnComplete"], true);
        assert_eq!(wire["clientContent"]["turns"][0]["role"], "user");
        assert_eq!(
            wire["clientContent"]["turns"][0]["parts"][0]["text"],
            "Hello there"
        );
    }

    #[test]
    fn test_tool_response_wire_format() {
        let msg = ClientMessage::tool_response("call-1", "get_weather", "sunny");
        let wire: Value = serde_json::to_value(&msg).unwrap();
        let resp = &wire["toolResponse"]["functionResponses"][0];
        assert_eq!(resp["id"], "call-1");
        assert_eq!(resp["name"], "get_weather");
        assert_eq!(resp["response"]["output"], "sunny");
    }

    #[test]
    fn test_server_content_parse() {
        let raw = r#"{
            "serverContent": {
                "modelTurn": {
                    "parts": [{"inlineData": {"mimeType": "audio/pcm;rate=24000", "data": "AAAA"}}]
                },
                "turnComplete": true
            }
        }"#;
        let msg: ServerMessage = serde_json::from_str(raw).unwrap();
        let content = msg.server_content.unwrap();
        assert!(content.turn_complete);
        let part = &content.model_turn.unwrap().parts[0];
        assert_eq!(
            part.inline_data.as_ref().unwrap().mime_type,
            "audio/pcm;rate=24000"
        );
    }

    #[test]
    fn test_tool_call_parse() {
        let raw = r#"{
            "toolCall": {
                "functionCalls": [
                    {"id": "fc-1", "name": "get_weather", "args": {"location": "Oslo"}}
                ]
            }
        }"#;
        let msg: ServerMessage = serde_json::from_str(raw).unwrap();
        let calls = msg.tool_call.unwrap().function_calls;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "get_weather");
        assert_eq!(calls[0].args["location"], "Oslo");
    }

    #[test]
    fn test_unknown_server_fields_ignored() {
        let raw = r#"{"setupComplete": {}, "usageMetadata": {"totalTokenCount": 5}}"#;
        let msg: ServerMessage = serde_json::from_str(raw).unwrap();
        assert!(msg.setup_complete.is_some());
    }
}
