//! Room media plumbing.
//!
//! Publishes the agent's audio track and forwards remote participant media
//! into a live model session. Remote audio is resampled to 16 kHz mono by the
//! native stream; video is sampled at roughly one frame per second and
//! JPEG-encoded before upload.

use std::borrow::Cow;
use std::time::Duration;

use futures_util::StreamExt;
use livekit::options::TrackPublishOptions;
use livekit::track::{LocalAudioTrack, LocalTrack, RemoteAudioTrack, RemoteVideoTrack, TrackSource};
use livekit::webrtc::audio_frame::AudioFrame;
use livekit::webrtc::audio_source::native::NativeAudioSource;
use livekit::webrtc::audio_source::{AudioSourceOptions, RtcAudioSource};
use livekit::webrtc::audio_stream::native::NativeAudioStream;
use livekit::webrtc::prelude::VideoBuffer;
use livekit::webrtc::video_frame::native::VideoFrameBufferExt;
use livekit::webrtc::video_frame::VideoFormatType;
use livekit::webrtc::video_stream::native::NativeVideoStream;
use livekit::Room;
use tokio::task::JoinHandle;

use crate::errors::AgentResult;
use crate::realtime::RealtimeAudioData;
use crate::realtime::gemini::{GeminiHandle, INPUT_SAMPLE_RATE, OUTPUT_SAMPLE_RATE};

/// Queue depth for the published audio source, in milliseconds.
const AUDIO_QUEUE_MS: u32 = 1000;

/// Minimum interval between uploaded video frames.
const VIDEO_FRAME_INTERVAL: Duration = Duration::from_secs(1);

/// JPEG quality for uploaded video frames.
const VIDEO_JPEG_QUALITY: u8 = 75;

/// Room behavior options for a session.
#[derive(Debug, Clone, Copy)]
pub struct RoomIoOptions {
    /// Close the session when the last remote participant disconnects
    pub close_on_disconnect: bool,
    /// Forward subscribed video tracks to the model
    pub video_input: bool,
}

impl Default for RoomIoOptions {
    fn default() -> Self {
        Self {
            close_on_disconnect: true,
            video_input: false,
        }
    }
}

/// Create and publish the agent's audio track, returning its source.
pub async fn publish_audio_track(room: &Room) -> AgentResult<NativeAudioSource> {
    let source = NativeAudioSource::new(
        AudioSourceOptions::default(),
        OUTPUT_SAMPLE_RATE,
        1,
        AUDIO_QUEUE_MS,
    );
    let track = LocalAudioTrack::create_audio_track(
        "agent-voice",
        RtcAudioSource::Native(source.clone()),
    );
    room.local_participant()
        .publish_track(
            LocalTrack::Audio(track),
            TrackPublishOptions {
                source: TrackSource::Microphone,
                ..Default::default()
            },
        )
        .await?;
    Ok(source)
}

/// Feed one chunk of model output audio into the published track.
pub async fn capture_model_audio(source: &NativeAudioSource, audio: &RealtimeAudioData) {
    let samples: Vec<i16> = audio
        .data
        .chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]))
        .collect();
    if samples.is_empty() {
        return;
    }
    let frame = AudioFrame {
        data: Cow::from(samples.as_slice()),
        sample_rate: audio.sample_rate,
        num_channels: 1,
        samples_per_channel: samples.len() as u32,
    };
    if let Err(e) = source.capture_frame(&frame).await {
        tracing::error!("Failed to capture model audio frame: {}", e);
    }
}

/// Forward a remote audio track into the model at the input sample rate.
pub fn forward_remote_audio(track: RemoteAudioTrack, handle: GeminiHandle) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut stream = NativeAudioStream::new(track.rtc_track(), INPUT_SAMPLE_RATE as i32, 1);
        while let Some(frame) = stream.next().await {
            let mut pcm = Vec::with_capacity(frame.data.len() * 2);
            for sample in frame.data.iter() {
                pcm.extend_from_slice(&sample.to_le_bytes());
            }
            if handle.send_audio(&pcm).await.is_err() {
                tracing::debug!("Model session closed, stopping audio forwarding");
                break;
            }
        }
        tracing::debug!("Remote audio track ended");
    })
}

/// Sample a remote video track and forward JPEG frames to the model.
pub fn forward_remote_video(track: RemoteVideoTrack, handle: GeminiHandle) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut stream = NativeVideoStream::new(track.rtc_track());
        let mut last_sent: Option<tokio::time::Instant> = None;

        while let Some(frame) = stream.next().await {
            let now = tokio::time::Instant::now();
            if let Some(prev) = last_sent {
                if now.duration_since(prev) < VIDEO_FRAME_INTERVAL {
                    continue;
                }
            }

            let jpeg = match encode_frame_jpeg(&frame.buffer.to_i420()) {
                Ok(jpeg) => jpeg,
                Err(e) => {
                    tracing::warn!("Failed to encode video frame: {}", e);
                    continue;
                }
            };

            if handle.send_video_frame(&jpeg).await.is_err() {
                tracing::debug!("Model session closed, stopping video forwarding");
                break;
            }
            last_sent = Some(now);
        }
        tracing::debug!("Remote video track ended");
    })
}

fn encode_frame_jpeg(
    buffer: &livekit::webrtc::video_frame::I420Buffer,
) -> Result<Vec<u8>, image::ImageError> {
    let width = buffer.width();
    let height = buffer.height();
    let mut rgba = vec![0u8; (width * height * 4) as usize];
    buffer.to_argb(
        VideoFormatType::RGBA,
        &mut rgba,
        width * 4,
        width as i32,
        height as i32,
    );

    let mut jpeg = Vec::new();
    let mut encoder =
        image::codecs::jpeg::JpegEncoder::new_with_quality(&mut jpeg, VIDEO_JPEG_QUALITY);
    encoder.encode(&rgba, width, height, image::ExtendedColorType::Rgba8)?;
    Ok(jpeg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let opts = RoomIoOptions::default();
        assert!(opts.close_on_disconnect);
        assert!(!opts.video_input);
    }

    #[test]
    fn test_sample_rates() {
        assert_eq!(INPUT_SAMPLE_RATE, 16_000);
        assert_eq!(OUTPUT_SAMPLE_RATE, 24_000);
    }
}
