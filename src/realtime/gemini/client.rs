//! Gemini Live API client.
//!
//! WebSocket client for the BidiGenerateContent protocol. The session is
//! configured with a single `setup` message at connect time; afterwards audio
//! and video flow as `realtimeInput` chunks and the server streams back PCM
//! audio, tool calls, and turn boundaries.
//!
//! There is no automatic reconnection: when the socket drops the client stays
//! disconnected.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

use super::config::{GEMINI_LIVE_URL, OUTPUT_SAMPLE_RATE};
use super::messages::{ClientMessage, ServerMessage};
use crate::realtime::{
    AudioOutputCallback, FunctionCallCallback, FunctionCallRequest, RealtimeAudioData,
    RealtimeConfig, RealtimeError, RealtimeErrorCallback, RealtimeResult,
};

/// Channel capacity for outbound WebSocket messages.
const WS_CHANNEL_CAPACITY: usize = 256;

/// Cloneable sender for submitting messages to a live session.
///
/// Handed out to callbacks and I/O tasks so they can feed the session without
/// holding the client itself.
#[derive(Clone)]
pub struct GeminiHandle {
    sender: mpsc::Sender<ClientMessage>,
}

impl GeminiHandle {
    pub async fn send(&self, message: ClientMessage) -> RealtimeResult<()> {
        self.sender
            .send(message)
            .await
            .map_err(|_| RealtimeError::NotConnected)
    }

    /// Send a chunk of PCM16 microphone audio (16 kHz, mono, little-endian).
    pub async fn send_audio(&self, pcm16: &[u8]) -> RealtimeResult<()> {
        self.send(ClientMessage::audio_chunk(pcm16)).await
    }

    /// Send a JPEG-encoded video frame.
    pub async fn send_video_frame(&self, jpeg: &[u8]) -> RealtimeResult<()> {
        self.send(ClientMessage::video_frame(jpeg)).await
    }

    /// Send a completed user text turn, prompting a model response.
    pub async fn send_user_turn(&self, text: &str) -> RealtimeResult<()> {
        self.send(ClientMessage::user_turn(text)).await
    }

    /// Submit the result of a tool invocation.
    pub async fn send_tool_response(
        &self,
        call_id: &str,
        name: &str,
        output: &str,
    ) -> RealtimeResult<()> {
        self.send(ClientMessage::tool_response(call_id, name, output))
            .await
    }
}

/// Gemini Live realtime client.
///
/// Mutable state is `Arc`-wrapped so it can be shared with the spawned
/// connection task; the `connected` flag allows lock-free status checks.
pub struct GeminiLive {
    config: RealtimeConfig,
    connected: Arc<AtomicBool>,

    ws_sender: Arc<Mutex<Option<mpsc::Sender<ClientMessage>>>>,

    audio_callback: Arc<Mutex<Option<AudioOutputCallback>>>,
    function_call_callback: Arc<Mutex<Option<FunctionCallCallback>>>,
    error_callback: Arc<Mutex<Option<RealtimeErrorCallback>>>,

    connection_handle: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl GeminiLive {
    pub fn new(config: RealtimeConfig) -> RealtimeResult<Self> {
        if config.api_key.is_empty() {
            return Err(RealtimeError::AuthenticationFailed(
                "API key is required".to_string(),
            ));
        }
        if config.model.is_empty() {
            return Err(RealtimeError::InvalidConfiguration(
                "Model is required".to_string(),
            ));
        }

        Ok(Self {
            config,
            connected: Arc::new(AtomicBool::new(false)),
            ws_sender: Arc::new(Mutex::new(None)),
            audio_callback: Arc::new(Mutex::new(None)),
            function_call_callback: Arc::new(Mutex::new(None)),
            error_callback: Arc::new(Mutex::new(None)),
            connection_handle: Arc::new(Mutex::new(None)),
        })
    }

    /// Register the callback for model audio output.
    pub async fn on_audio(&self, callback: AudioOutputCallback) {
        *self.audio_callback.lock().await = Some(callback);
    }

    /// Register the callback for model function calls.
    pub async fn on_function_call(&self, callback: FunctionCallCallback) {
        *self.function_call_callback.lock().await = Some(callback);
    }

    /// Register the callback for asynchronous provider errors.
    pub async fn on_error(&self, callback: RealtimeErrorCallback) {
        *self.error_callback.lock().await = Some(callback);
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn build_ws_url(&self) -> String {
        format!("{}?key={}", GEMINI_LIVE_URL, self.config.api_key)
    }

    /// Open the WebSocket, send the session setup, and start the I/O task.
    pub async fn connect(&self) -> RealtimeResult<()> {
        if self.connected.load(Ordering::SeqCst) {
            return Ok(());
        }

        let url = self.build_ws_url();
        let (ws_stream, _response) =
            tokio_tungstenite::connect_async(url.as_str())
                .await
                .map_err(|e| {
                    RealtimeError::ConnectionFailed(format!("Gemini Live handshake failed: {e}"))
                })?;

        tracing::info!(model = %self.config.model, "Connected to Gemini Live API");

        let (mut ws_sink, mut ws_stream) = ws_stream.split();

        let (tx, mut rx) = mpsc::channel::<ClientMessage>(WS_CHANNEL_CAPACITY);
        // Setup must be the first message on the wire
        tx.send(ClientMessage::setup(&self.config))
            .await
            .map_err(|_| RealtimeError::ConnectionFailed("send channel closed".to_string()))?;
        *self.ws_sender.lock().await = Some(tx);

        let audio_cb = self.audio_callback.clone();
        let function_call_cb = self.function_call_callback.clone();
        let error_cb = self.error_callback.clone();
        let connected = self.connected.clone();
        let ws_sender = self.ws_sender.clone();

        self.connected.store(true, Ordering::SeqCst);

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    outgoing = rx.recv() => {
                        let Some(message) = outgoing else {
                            break;
                        };
                        let json = match serde_json::to_string(&message) {
                            Ok(j) => j,
                            Err(e) => {
                                tracing::error!("Failed to serialize client message: {}", e);
                                continue;
                            }
                        };
                        if let Err(e) = ws_sink.send(Message::Text(json.into())).await {
                            tracing::error!("Failed to send WebSocket message: {}", e);
                            break;
                        }
                    }

                    incoming = ws_stream.next() => {
                        match incoming {
                            // The server sends JSON in both Text and Binary frames
                            Some(Ok(Message::Text(text))) => {
                                Self::dispatch_raw(
                                    text.as_bytes(),
                                    &audio_cb,
                                    &function_call_cb,
                                    &error_cb,
                                )
                                .await;
                            }
                            Some(Ok(Message::Binary(data))) => {
                                Self::dispatch_raw(
                                    &data,
                                    &audio_cb,
                                    &function_call_cb,
                                    &error_cb,
                                )
                                .await;
                            }
                            Some(Ok(Message::Ping(data))) => {
                                if let Err(e) = ws_sink.send(Message::Pong(data)).await {
                                    tracing::error!("Failed to send pong: {}", e);
                                }
                            }
                            Some(Ok(Message::Close(frame))) => {
                                tracing::info!(?frame, "Gemini Live closed the connection");
                                break;
                            }
                            Some(Ok(_)) => {}
                            Some(Err(e)) => {
                                tracing::error!("WebSocket error: {}", e);
                                if let Some(cb) = error_cb.lock().await.as_ref() {
                                    cb(RealtimeError::WebSocketError(e.to_string())).await;
                                }
                                break;
                            }
                            None => {
                                tracing::info!("Gemini Live stream ended");
                                break;
                            }
                        }
                    }
                }
            }

            connected.store(false, Ordering::SeqCst);
            *ws_sender.lock().await = None;
            tracing::info!("Gemini Live session task finished");
        });

        *self.connection_handle.lock().await = Some(handle);
        Ok(())
    }

    /// Sender handle for the live session.
    pub async fn handle(&self) -> RealtimeResult<GeminiHandle> {
        let sender = self
            .ws_sender
            .lock()
            .await
            .clone()
            .ok_or(RealtimeError::NotConnected)?;
        Ok(GeminiHandle { sender })
    }

    /// Close the session and stop the I/O task.
    pub async fn disconnect(&self) -> RealtimeResult<()> {
        *self.ws_sender.lock().await = None;

        // Handles cloned into callbacks keep the outgoing channel open, so
        // the task is aborted rather than drained
        if let Some(handle) = self.connection_handle.lock().await.take() {
            handle.abort();
        }

        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn dispatch_raw(
        raw: &[u8],
        audio_cb: &Arc<Mutex<Option<AudioOutputCallback>>>,
        function_call_cb: &Arc<Mutex<Option<FunctionCallCallback>>>,
        error_cb: &Arc<Mutex<Option<RealtimeErrorCallback>>>,
    ) {
        match serde_json::from_slice::<ServerMessage>(raw) {
            Ok(message) => {
                Self::handle_server_message(message, audio_cb, function_call_cb, error_cb).await;
            }
            Err(e) => {
                tracing::warn!("Failed to parse server message: {}", e);
            }
        }
    }

    async fn handle_server_message(
        message: ServerMessage,
        audio_cb: &Arc<Mutex<Option<AudioOutputCallback>>>,
        function_call_cb: &Arc<Mutex<Option<FunctionCallCallback>>>,
        error_cb: &Arc<Mutex<Option<RealtimeErrorCallback>>>,
    ) {
        if message.setup_complete.is_some() {
            tracing::info!("Gemini Live session setup complete");
        }

        if let Some(content) = message.server_content {
            if let Some(turn) = content.model_turn {
                for part in turn.parts {
                    if let Some(blob) = part.inline_data {
                        match BASE64.decode(&blob.data) {
                            Ok(pcm) => {
                                if let Some(cb) = audio_cb.lock().await.as_ref() {
                                    cb(RealtimeAudioData {
                                        data: Bytes::from(pcm),
                                        sample_rate: OUTPUT_SAMPLE_RATE,
                                    })
                                    .await;
                                }
                            }
                            Err(e) => {
                                tracing::error!("Failed to decode audio chunk: {}", e);
                            }
                        }
                    }
                    if let Some(text) = part.text {
                        tracing::debug!("Model text part: {}", text);
                    }
                }
            }

            if let Some(transcription) = content.output_transcription {
                tracing::debug!("Model speech transcription: {}", transcription.text);
            }

            if content.interrupted {
                tracing::debug!("Model generation interrupted by user speech");
            }

            if content.turn_complete {
                tracing::debug!("Model turn complete");
            }
        }

        if let Some(tool_call) = message.tool_call {
            for call in tool_call.function_calls {
                tracing::debug!(name = %call.name, id = %call.id, "Model requested tool call");
                // Runs on its own task: the callback submits the tool response
                // through the outgoing channel this loop drains, so awaiting it
                // inline could deadlock against a full channel
                if let Some(cb) = function_call_cb.lock().await.as_ref() {
                    let cb = cb.clone();
                    let request = FunctionCallRequest {
                        call_id: call.id.clone(),
                        name: call.name.clone(),
                        arguments: call.args.clone(),
                    };
                    tokio::spawn(async move {
                        cb(request).await;
                    });
                }
            }
        }

        if let Some(cancellation) = message.tool_call_cancellation {
            tracing::warn!(ids = ?cancellation.ids, "Tool calls cancelled by server");
        }

        if let Some(go_away) = message.go_away {
            tracing::warn!(time_left = ?go_away.time_left, "Server requested disconnect");
            if let Some(cb) = error_cb.lock().await.as_ref() {
                cb(RealtimeError::ProviderError(
                    "Server requested disconnect".to_string(),
                ))
                .await;
            }
        }
    }
}
