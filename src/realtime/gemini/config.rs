//! Gemini Live API constants.

/// WebSocket endpoint for the bidirectional generation service.
pub const GEMINI_LIVE_URL: &str =
    "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

/// Sample rate the API expects for input audio.
pub const INPUT_SAMPLE_RATE: u32 = 16_000;

/// Sample rate of audio produced by the API.
pub const OUTPUT_SAMPLE_RATE: u32 = 24_000;

/// Mime type for PCM16 input audio at the expected rate.
pub const AUDIO_INPUT_MIME: &str = "audio/pcm;rate=16000";

/// Mime type for JPEG-encoded video frames.
pub const VIDEO_INPUT_MIME: &str = "image/jpeg";

/// Qualify a bare model id the way the API expects (`models/<id>`).
pub fn qualified_model_name(model: &str) -> String {
    if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{model}")
    }
}
