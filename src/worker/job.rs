//! Job admission and per-job context.

use std::sync::Arc;

use livekit::{Room, RoomEvent, RoomOptions};
use livekit_protocol as proto;
use tokio::sync::mpsc;

use crate::errors::{AgentError, AgentResult};

/// A job offer from the server, answered through `accept` or `reject`.
pub struct JobRequest {
    job: proto::Job,
    resuming: bool,
    responder: mpsc::UnboundedSender<proto::worker_message::Message>,
}

impl JobRequest {
    pub(crate) fn new(
        job: proto::Job,
        resuming: bool,
        responder: mpsc::UnboundedSender<proto::worker_message::Message>,
    ) -> Self {
        Self {
            job,
            resuming,
            responder,
        }
    }

    pub fn job(&self) -> &proto::Job {
        &self.job
    }

    pub fn room_name(&self) -> &str {
        self.job.room.as_ref().map(|r| r.name.as_str()).unwrap_or("")
    }

    pub fn resuming(&self) -> bool {
        self.resuming
    }

    /// Accept the job. The agent joins as `agent-<job_id>`.
    pub async fn accept(self) -> AgentResult<()> {
        let identity = format!("agent-{}", self.job.id);
        self.respond(true, identity)
    }

    /// Decline the job.
    pub async fn reject(self) -> AgentResult<()> {
        self.respond(false, String::new())
    }

    fn respond(self, available: bool, participant_identity: String) -> AgentResult<()> {
        let response = proto::AvailabilityResponse {
            job_id: self.job.id.clone(),
            available,
            participant_identity,
            ..Default::default()
        };
        self.responder
            .send(proto::worker_message::Message::Availability(response))
            .map_err(|_| AgentError::Worker("Worker connection closed".to_string()))
    }
}

/// Per-job state handed to the entrypoint.
///
/// Holds the assignment (job info, room URL, join token) and, after
/// `connect`, the joined room and its event stream.
pub struct JobContext {
    job: proto::Job,
    url: String,
    token: String,
    room: Option<Arc<Room>>,
    events: Option<mpsc::UnboundedReceiver<RoomEvent>>,
}

impl JobContext {
    pub(crate) fn new(job: proto::Job, url: String, token: String) -> Self {
        Self {
            job,
            url,
            token,
            room: None,
            events: None,
        }
    }

    pub fn job(&self) -> &proto::Job {
        &self.job
    }

    pub fn room_name(&self) -> &str {
        self.job.room.as_ref().map(|r| r.name.as_str()).unwrap_or("")
    }

    /// Join the assigned room.
    pub async fn connect(&mut self) -> AgentResult<()> {
        let (room, events) = Room::connect(
            &self.url,
            &self.token,
            RoomOptions {
                auto_subscribe: true,
                ..Default::default()
            },
        )
        .await?;
        self.room = Some(Arc::new(room));
        self.events = Some(events);
        Ok(())
    }

    /// The joined room. Errors before `connect` has succeeded.
    pub fn room(&self) -> AgentResult<Arc<Room>> {
        self.room
            .clone()
            .ok_or_else(|| AgentError::Session("Room not connected".to_string()))
    }

    /// Take the room event stream. Yields once; the session consumes it.
    pub fn take_room_events(&mut self) -> Option<mpsc::UnboundedReceiver<RoomEvent>> {
        self.events.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_job(id: &str, room: &str) -> proto::Job {
        proto::Job {
            id: id.to_string(),
            room: Some(proto::Room {
                name: room.to_string(),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_accept_echoes_job_id() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let request = JobRequest::new(test_job("job-1", "demo-room"), false, tx);
        assert_eq!(request.room_name(), "demo-room");

        request.accept().await.unwrap();

        let proto::worker_message::Message::Availability(resp) = rx.recv().await.unwrap() else {
            panic!("expected availability response");
        };
        assert_eq!(resp.job_id, "job-1");
        assert!(resp.available);
        assert_eq!(resp.participant_identity, "agent-job-1");
    }

    #[tokio::test]
    async fn test_reject_marks_unavailable() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let request = JobRequest::new(test_job("job-2", "demo-room"), false, tx);
        request.reject().await.unwrap();

        let proto::worker_message::Message::Availability(resp) = rx.recv().await.unwrap() else {
            panic!("expected availability response");
        };
        assert_eq!(resp.job_id, "job-2");
        assert!(!resp.available);
    }

    #[test]
    fn test_context_room_before_connect() {
        let ctx = JobContext::new(test_job("job-3", "demo-room"), String::new(), String::new());
        assert_eq!(ctx.room_name(), "demo-room");
        assert!(ctx.room().is_err());
    }
}
