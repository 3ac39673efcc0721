//! LiveKit agent worker runtime.
//!
//! Registers over the agent protocol (`/agent` WebSocket endpoint, protobuf
//! `WorkerMessage`/`ServerMessage` frames), answers availability requests
//! through the admission callback, and spawns the entrypoint for each job
//! assignment. Entrypoint failures are reported as job status updates, never
//! retried.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use futures_util::{SinkExt, StreamExt};
use livekit_api::access_token::{AccessToken, VideoGrants};
use livekit_protocol as proto;
use prost::Message as ProstMessage;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{self, Message};

use crate::config::AgentConfig;
use crate::errors::{AgentError, AgentResult};

mod job;

pub use job::{JobContext, JobRequest};

/// Seconds between worker pings.
const PING_INTERVAL_SECS: u32 = 30;

/// Per-job entry function.
pub type JobEntrypoint = Arc<
    dyn Fn(JobContext) -> Pin<Box<dyn Future<Output = AgentResult<()>> + Send>> + Send + Sync,
>;

/// Admission callback deciding whether to take a job.
pub type JobRequestHandler = Arc<
    dyn Fn(JobRequest) -> Pin<Box<dyn Future<Output = AgentResult<()>> + Send>> + Send + Sync,
>;

/// Callbacks and identity for a worker.
#[derive(Clone)]
pub struct WorkerOptions {
    pub agent_name: String,
    pub entrypoint: JobEntrypoint,
    pub request_handler: JobRequestHandler,
}

/// The agent worker: one registration, many jobs.
pub struct Worker {
    config: Arc<AgentConfig>,
    options: WorkerOptions,
}

/// The agent protocol endpoint for a LiveKit server URL.
fn agent_endpoint(ws_url: &str) -> String {
    format!("{}/agent", ws_url.trim_end_matches('/'))
}

fn unix_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

impl Worker {
    pub fn new(config: Arc<AgentConfig>, options: WorkerOptions) -> Self {
        Self { config, options }
    }

    fn build_worker_token(&self) -> AgentResult<String> {
        let (key, secret) = self.config.require_livekit_credentials()?;
        let token = AccessToken::with_api_key(&key, &secret)
            .with_identity(&format!("agent-worker-{}", std::process::id()))
            .with_grants(VideoGrants {
                agent: true,
                ..Default::default()
            })
            .to_jwt()?;
        Ok(token)
    }

    /// Register with the server and process jobs until the connection ends.
    pub async fn run(&self) -> AgentResult<()> {
        let endpoint = agent_endpoint(&self.config.livekit_ws_url());
        let token = self.build_worker_token()?;

        let host = url::Url::parse(&endpoint)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .ok_or_else(|| AgentError::Config(format!("Invalid LiveKit URL: {endpoint}")))?;

        let request = http::Request::builder()
            .uri(&endpoint)
            .header("Authorization", format!("Bearer {token}"))
            .header("Host", host)
            .header("Connection", "Upgrade")
            .header("Upgrade", "websocket")
            .header(
                "Sec-WebSocket-Key",
                tungstenite::handshake::client::generate_key(),
            )
            .header("Sec-WebSocket-Version", "13")
            .body(())
            .map_err(|e| AgentError::Connection(e.to_string()))?;

        let (ws_stream, _response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| {
                AgentError::Connection(format!("Agent endpoint handshake failed: {e}"))
            })?;
        tracing::info!(endpoint = %endpoint, "Connected to LiveKit agent endpoint");

        let (mut ws_sink, mut ws_source) = ws_stream.split();
        let (tx, mut rx) = mpsc::unbounded_channel::<proto::worker_message::Message>();

        tx.send(proto::worker_message::Message::Register(
            proto::RegisterWorkerRequest {
                r#type: proto::JobType::JtRoom as i32,
                agent_name: self.config.agent_name.clone(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ping_interval: PING_INTERVAL_SECS,
                ..Default::default()
            },
        ))
        .map_err(|_| AgentError::Worker("Worker channel closed".to_string()))?;

        tx.send(proto::worker_message::Message::UpdateWorker(
            proto::UpdateWorkerStatus {
                status: Some(proto::WorkerStatus::WsAvailable as i32),
                ..Default::default()
            },
        ))
        .map_err(|_| AgentError::Worker("Worker channel closed".to_string()))?;

        let mut ping_timer = tokio::time::interval(Duration::from_secs(PING_INTERVAL_SECS as u64));
        ping_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                outgoing = rx.recv() => {
                    let Some(message) = outgoing else {
                        break;
                    };
                    let frame = proto::WorkerMessage {
                        message: Some(message),
                    }
                    .encode_to_vec();
                    if let Err(e) = ws_sink.send(Message::Binary(frame.into())).await {
                        return Err(AgentError::Worker(format!("Failed to send frame: {e}")));
                    }
                }

                _ = ping_timer.tick() => {
                    let _ = tx.send(proto::worker_message::Message::Ping(proto::WorkerPing {
                        timestamp: unix_millis(),
                    }));
                }

                incoming = ws_source.next() => {
                    match incoming {
                        Some(Ok(Message::Binary(data))) => {
                            match proto::ServerMessage::decode(data.as_ref()) {
                                Ok(frame) => {
                                    if let Some(message) = frame.message {
                                        self.handle_server_message(message, &tx);
                                    }
                                }
                                Err(e) => {
                                    tracing::warn!("Failed to decode server frame: {}", e);
                                }
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            if let Err(e) = ws_sink.send(Message::Pong(data)).await {
                                tracing::error!("Failed to send pong: {}", e);
                            }
                        }
                        Some(Ok(Message::Close(frame))) => {
                            tracing::info!(?frame, "Agent endpoint closed the connection");
                            break;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            return Err(AgentError::Worker(format!("WebSocket error: {e}")));
                        }
                        None => {
                            tracing::info!("Agent endpoint stream ended");
                            break;
                        }
                    }
                }
            }
        }

        Ok(())
    }

    fn handle_server_message(
        &self,
        message: proto::server_message::Message,
        tx: &mpsc::UnboundedSender<proto::worker_message::Message>,
    ) {
        match message {
            proto::server_message::Message::Register(resp) => {
                tracing::info!(worker_id = %resp.worker_id, "Worker registered");
            }

            proto::server_message::Message::Availability(req) => {
                let Some(job) = req.job else {
                    tracing::warn!("Availability request without job info");
                    return;
                };
                let request = JobRequest::new(job, req.resuming, tx.clone());
                tracing::info!(room = %request.room_name(), "Job availability request");
                let handler = self.options.request_handler.clone();
                tokio::spawn(async move {
                    if let Err(e) = handler(request).await {
                        tracing::error!("Job request handler failed: {}", e);
                    }
                });
            }

            proto::server_message::Message::Assignment(assignment) => {
                let Some(job) = assignment.job else {
                    tracing::warn!("Job assignment without job info");
                    return;
                };
                let job_id = job.id.clone();
                let url = assignment
                    .url
                    .filter(|u| !u.is_empty())
                    .unwrap_or_else(|| self.config.livekit_ws_url());
                let ctx = JobContext::new(job, url, assignment.token);

                let entrypoint = self.options.entrypoint.clone();
                let status_tx = tx.clone();
                tokio::spawn(async move {
                    let _ = status_tx.send(proto::worker_message::Message::UpdateJob(
                        proto::UpdateJobStatus {
                            job_id: job_id.clone(),
                            status: proto::JobStatus::JsRunning as i32,
                            ..Default::default()
                        },
                    ));

                    let (status, error) = match entrypoint(ctx).await {
                        Ok(()) => (proto::JobStatus::JsSuccess, String::new()),
                        Err(e) => {
                            tracing::error!(job_id = %job_id, "Job entrypoint failed: {}", e);
                            (proto::JobStatus::JsFailed, e.to_string())
                        }
                    };
                    let _ = status_tx.send(proto::worker_message::Message::UpdateJob(
                        proto::UpdateJobStatus {
                            job_id,
                            status: status as i32,
                            error,
                            ..Default::default()
                        },
                    ));
                });
            }

            proto::server_message::Message::Termination(term) => {
                tracing::info!(job_id = %term.job_id, "Job terminated by server");
            }

            proto::server_message::Message::Pong(_) => {
                tracing::trace!("Worker pong received");
            }

            #[allow(unreachable_patterns)]
            _ => {
                tracing::trace!("Unhandled server message");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_endpoint() {
        assert_eq!(agent_endpoint("ws://localhost:7880"), "ws://localhost:7880/agent");
        assert_eq!(
            agent_endpoint("wss://cloud.example.com/"),
            "wss://cloud.example.com/agent"
        );
    }

    #[test]
    fn test_worker_token_requires_credentials() {
        let options = WorkerOptions {
            agent_name: String::new(),
            entrypoint: Arc::new(|_ctx| Box::pin(async { Ok::<(), AgentError>(()) })),
            request_handler: Arc::new(|req| Box::pin(async move { req.accept().await })),
        };
        let worker = Worker::new(Arc::new(AgentConfig::default()), options);
        assert!(worker.build_worker_token().is_err());
    }

    #[test]
    fn test_worker_token_minted_with_credentials() {
        let mut config = AgentConfig::default();
        config.livekit_api_key = Some("devkey".to_string());
        config.livekit_api_secret = Some("a-long-enough-development-secret".to_string());
        let options = WorkerOptions {
            agent_name: "demo".to_string(),
            entrypoint: Arc::new(|_ctx| Box::pin(async { Ok::<(), AgentError>(()) })),
            request_handler: Arc::new(|req| Box::pin(async move { req.accept().await })),
        };
        let worker = Worker::new(Arc::new(config), options);
        let token = worker.build_worker_token().unwrap();
        assert!(!token.is_empty());
    }
}
