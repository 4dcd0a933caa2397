use std::sync::Arc;

use poise::serenity_prelude::{GuildId, async_trait};
use songbird::{
    Event, Songbird, TrackEvent,
    input::HttpRequest,
    tracks::{Track, TrackHandle},
};

use crate::{handlers::track_end::TrackEndHandler, util::track::ResolvedTrack};

/// Called exactly once per started stream: `None` on natural end (or stop), `Some(err)` on a sink error.
pub type CompletionHook = Box<dyn FnOnce(Option<String>) + Send + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("not connected to a voice channel")]
    NotConnected,
    #[error("track control failed: {0}")]
    Control(String),
}

/// Control surface over one active stream.
pub trait PlaybackHandle: Send + Sync {
    fn stop(&self) -> Result<(), SinkError>;
    fn pause(&self) -> Result<(), SinkError>;
    fn resume(&self) -> Result<(), SinkError>;
    fn set_volume(&self, percent: u16) -> Result<(), SinkError>;
}

#[async_trait]
pub trait PlaybackSink: Send + Sync {
    async fn start(
        &self,
        guild_id: GuildId,
        track: &ResolvedTrack,
        volume_percent: u16,
        on_end: CompletionHook,
    ) -> Result<Box<dyn PlaybackHandle>, SinkError>;
}

pub fn volume_factor(percent: u16) -> f32 {
    f32::from(percent) / 100.0
}

/// Runs `stop` when `res` is an error, then hands `res` back.
fn stop_on_err<T>(res: Result<T, SinkError>, stop: impl FnOnce()) -> Result<T, SinkError> {
    if res.is_err() {
        stop();
    }
    res
}

// ── songbird ─────────────────────────────────────────────

pub struct SongbirdSink {
    manager: Arc<Songbird>,
    http: reqwest::Client,
}

impl SongbirdSink {
    pub fn new(manager: Arc<Songbird>, http: reqwest::Client) -> Self {
        Self { manager, http }
    }
}

#[async_trait]
impl PlaybackSink for SongbirdSink {
    async fn start(
        &self,
        guild_id: GuildId,
        track: &ResolvedTrack,
        volume_percent: u16,
        on_end: CompletionHook,
    ) -> Result<Box<dyn PlaybackHandle>, SinkError> {
        let call = self.manager.get(guild_id).ok_or(SinkError::NotConnected)?;
        let input = HttpRequest::new(self.http.clone(), track.stream_ref.clone());
        let track = Track::from(input).volume(volume_factor(volume_percent));

        let handle = { call.lock().await.play_only(track) };
        tracing::info!(guild = %guild_id, uuid = %handle.uuid(), "stream started");

        let ev = TrackEndHandler::new(guild_id, on_end);
        let registered = handle
            .add_event(Event::Track(TrackEvent::End), ev.clone())
            .and_then(|()| handle.add_event(Event::Track(TrackEvent::Error), ev))
            .map_err(|e| SinkError::Control(e.to_string()));
        // without end events the engine never learns this stream finished
        stop_on_err(registered, || {
            if let Err(e) = handle.stop() {
                tracing::warn!(guild = %guild_id, error = %e, "failed to stop unobserved stream");
            }
        })?;

        Ok(Box::new(SongbirdHandle(handle)))
    }
}

struct SongbirdHandle(TrackHandle);

impl PlaybackHandle for SongbirdHandle {
    fn stop(&self) -> Result<(), SinkError> {
        self.0.stop().map_err(|e| SinkError::Control(e.to_string()))
    }

    fn pause(&self) -> Result<(), SinkError> {
        self.0.pause().map_err(|e| SinkError::Control(e.to_string()))
    }

    fn resume(&self) -> Result<(), SinkError> {
        self.0.play().map_err(|e| SinkError::Control(e.to_string()))
    }

    fn set_volume(&self, percent: u16) -> Result<(), SinkError> {
        self.0
            .set_volume(volume_factor(percent))
            .map_err(|e| SinkError::Control(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_percent_to_factor() {
        assert_eq!(volume_factor(0), 0.0);
        assert_eq!(volume_factor(100), 1.0);
        assert_eq!(volume_factor(200), 2.0);
    }

    #[test]
    fn failed_registration_stops_stream() {
        let mut stopped = false;
        let res: Result<(), SinkError> =
            stop_on_err(Err(SinkError::Control("dropped".into())), || stopped = true);
        assert!(res.is_err());
        assert!(stopped);

        let mut stopped = false;
        assert!(stop_on_err(Ok(()), || stopped = true).is_ok());
        assert!(!stopped);
    }
}
