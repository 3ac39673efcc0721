//! Per-job session bootstrap.
//!
//! The entrypoint run for every accepted job: join the room, bind a session
//! to the realtime model with the builtin tools, start it with video input
//! enabled and disconnect-survival on, then ask for one greeting. The session
//! keeps running until the room loop ends.

use std::sync::Arc;

use crate::agent::Agent;
use crate::config::AgentConfig;
use crate::errors::AgentResult;
use crate::session::{AgentSession, RoomIoOptions, SessionOptions};
use crate::tools::ToolRegistry;
use crate::worker::{JobContext, JobRequest};

/// Instructions for the initial reply after the session starts.
pub const GREETING_INSTRUCTIONS: &str = "Greet the user and offer your assistance.";

/// Admission callback: take every job, no filtering.
pub async fn accept_all_jobs(request: JobRequest) -> AgentResult<()> {
    request.accept().await
}

/// Room options used for every session: survive participant refreshes and
/// watch the camera.
fn room_options() -> RoomIoOptions {
    RoomIoOptions {
        close_on_disconnect: false,
        video_input: true,
    }
}

/// Entry function for one job.
pub async fn run_job(mut ctx: JobContext, config: Arc<AgentConfig>) -> AgentResult<()> {
    tracing::info!(room = %ctx.room_name(), "=== JOB RECEIVED ===");

    ctx.connect().await?;
    let room = ctx.room()?;
    tracing::info!(room = %room.name(), "Agent joined room");

    let registry = ToolRegistry::builtin();
    let session = AgentSession::new(SessionOptions::from_config(&config)?, registry);

    let events = ctx
        .take_room_events()
        .ok_or_else(|| crate::errors::AgentError::Session("Room events already taken".to_string()))?;
    session
        .start(room, events, &Agent::default(), room_options())
        .await?;

    tracing::info!("Generating initial greeting...");
    session.generate_reply(GREETING_INSTRUCTIONS).await?;
    tracing::info!("Greeting complete. Agent is now active and waiting for input.");

    tracing::info!("Session configured to persist across participant refreshes");
    session.closed().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_greeting_text() {
        assert_eq!(GREETING_INSTRUCTIONS, "Greet the user and offer your assistance.");
    }

    #[test]
    fn test_room_options_are_fixed() {
        let options = room_options();
        assert!(!options.close_on_disconnect);
        assert!(options.video_input);
    }

    #[tokio::test]
    async fn test_every_job_is_accepted() {
        use livekit_protocol as proto;
        use tokio::sync::mpsc;

        let (tx, mut rx) = mpsc::unbounded_channel();
        for id in ["job-1", "job-2", "job-3"] {
            let job = proto::Job {
                id: id.to_string(),
                room: Some(proto::Room {
                    name: "demo-room".to_string(),
                    ..Default::default()
                }),
                ..Default::default()
            };
            let request = JobRequest::new(job, false, tx.clone());
            accept_all_jobs(request).await.unwrap();

            let proto::worker_message::Message::Availability(resp) = rx.recv().await.unwrap()
            else {
                panic!("expected availability response");
            };
            assert_eq!(resp.job_id, id);
            assert!(resp.available);
        }
    }
}
