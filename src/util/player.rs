use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use dashmap::DashMap;
use futures::future::join_all;
use poise::serenity_prelude::{ChannelId, GuildId, UserId};
use tokio::sync::{Mutex, Semaphore};

use crate::util::{
    config::MusicSettings,
    notify::{Notifier, NotifyTarget},
    queue::{GuildPlayback, MAX_VOLUME, NowPlaying},
    resolver::TrackResolver,
    sink::{CompletionHook, PlaybackSink},
    track::{ResolvedTrack, TrackRequest},
};

pub const PLACEHOLDER_TITLE: &str = "Error getting title";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EnqueueOutcome {
    PlayingNow(String),
    QueuedAt { position: usize, title: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlaybackError {
    #[error("could not resolve track: {0}")]
    Resolution(String),
    #[error("nothing is playing right now")]
    NotPlaying,
    #[error("{0}")]
    InvalidState(&'static str),
    #[error("volume must be between 0 and 200 (got {0})")]
    OutOfRange(i64),
    #[error("playback failed: {0}")]
    Sink(String),
}

/// Read-only view for the `queue` command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueueListing {
    pub now_playing: Option<String>,
    pub upcoming: Vec<String>,
    pub overflow: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlaybackStatus {
    pub now_playing: Option<String>,
    pub paused: bool,
    pub queued: usize,
    pub volume: u16,
}

#[derive(Clone, Debug)]
pub struct EngineSettings {
    pub default_volume: u16,
    pub max_consecutive_failures: usize,
    pub resolver_workers: usize,
    pub queue_preview: usize,
}

impl From<&MusicSettings> for EngineSettings {
    fn from(m: &MusicSettings) -> Self {
        Self {
            default_volume: m.default_volume,
            max_consecutive_failures: m.max_consecutive_failures.max(1),
            resolver_workers: m.resolver_workers.max(1),
            queue_preview: m.queue_preview,
        }
    }
}

struct EngineInner {
    guilds: DashMap<GuildId, Arc<Mutex<GuildPlayback>>>,
    resolver: Arc<dyn TrackResolver>,
    sink: Arc<dyn PlaybackSink>,
    notifier: Arc<dyn Notifier>,
    /// Bounds concurrent resolutions across all guilds.
    workers: Semaphore,
    settings: EngineSettings,
    next_token: AtomicU64,
}

/// Per-guild playback queues. Every operation on a guild runs under that guild's mutex,
/// including completion events coming back from the sink.
#[derive(Clone)]
pub struct PlaybackEngine {
    inner: Arc<EngineInner>,
}

impl PlaybackEngine {
    pub fn new(
        resolver: Arc<dyn TrackResolver>,
        sink: Arc<dyn PlaybackSink>,
        notifier: Arc<dyn Notifier>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                guilds: DashMap::new(),
                resolver,
                sink,
                notifier,
                workers: Semaphore::new(settings.resolver_workers.max(1)),
                settings,
                next_token: AtomicU64::new(1),
            }),
        }
    }

    fn guild(&self, gid: GuildId) -> Arc<Mutex<GuildPlayback>> {
        self.inner
            .guilds
            .entry(gid)
            .or_insert_with(|| {
                Arc::new(Mutex::new(GuildPlayback::new(self.inner.settings.default_volume)))
            })
            .clone()
    }

    fn existing(&self, gid: GuildId) -> Option<Arc<Mutex<GuildPlayback>>> {
        self.inner.guilds.get(&gid).map(|e| e.value().clone())
    }

    async fn resolve(&self, query: &str) -> Result<ResolvedTrack, PlaybackError> {
        let _permit = self
            .inner
            .workers
            .acquire()
            .await
            .map_err(|_| PlaybackError::Resolution("resolver pool closed".into()))?;
        self.inner
            .resolver
            .resolve(query)
            .await
            .map_err(|e| PlaybackError::Resolution(e.to_string()))
    }

    fn completion_hook(&self, gid: GuildId, token: u64) -> CompletionHook {
        let engine = self.clone();
        Box::new(move |error| {
            tokio::spawn(async move {
                engine.on_track_end(gid, token, error).await;
            });
        })
    }

    /// Starts `track` and makes it the guild's now-playing entry.
    async fn start_locked(
        &self,
        gid: GuildId,
        state: &mut GuildPlayback,
        mut req: TrackRequest,
        track: ResolvedTrack,
    ) -> Result<String, PlaybackError> {
        let token = self.inner.next_token.fetch_add(1, Ordering::Relaxed);
        let handle = self
            .inner
            .sink
            .start(gid, &track, state.volume(), self.completion_hook(gid, token))
            .await
            .map_err(|e| PlaybackError::Sink(e.to_string()))?;

        req.display_title = Some(track.display_title.clone());
        let requested_by = req.requested_by;
        state.now_playing = Some(NowPlaying {
            request: req,
            token,
            paused: false,
            handle,
        });
        tracing::info!(
            guild = %gid,
            token,
            %requested_by,
            title = %track.display_title,
            url = %track.canonical_url,
            "now playing"
        );
        Ok(track.display_title)
    }

    /// Pops queued requests until one starts, the queue runs dry, or too many fail in a row.
    /// Returns the notices to send once the guild lock is released.
    async fn advance_locked(&self, gid: GuildId, state: &mut GuildPlayback) -> Vec<String> {
        let mut notices = Vec::new();
        let mut failures = 0usize;
        state.now_playing = None;

        while let Some(req) = state.pop_next() {
            let attempt = match self.resolve(&req.source_query).await {
                Ok(track) => self.start_locked(gid, state, req.clone(), track).await,
                Err(e) => Err(e),
            };
            match attempt {
                Ok(title) => {
                    notices.push(format!("🎵 Now playing: **{title}**"));
                    return notices;
                }
                Err(e) => {
                    tracing::warn!(guild = %gid, query = %req.source_query, error = %e, "skipping unplayable track");
                    notices.push(format!("❌ Could not play `{}`: {e}", req.source_query));
                    failures += 1;
                    if failures >= self.inner.settings.max_consecutive_failures {
                        tracing::warn!(guild = %gid, failures, remaining = state.len(), "advance gave up");
                        notices.push(format!(
                            "⚠️ Queue exhausted: {failures} tracks in a row could not be played."
                        ));
                        break;
                    }
                }
            }
        }
        notices
    }

    async fn announce(&self, channel: Option<ChannelId>, notices: Vec<String>) {
        let Some(ch) = channel else {
            return;
        };
        for n in notices {
            self.inner.notifier.notify(NotifyTarget::Channel(ch), n).await;
        }
    }

    // ── public operations ─────────────────────────────────

    /// Plays immediately when the guild is idle, otherwise appends to the queue.
    pub async fn enqueue(
        &self,
        gid: GuildId,
        channel: ChannelId,
        query: &str,
        requested_by: UserId,
    ) -> Result<EnqueueOutcome, PlaybackError> {
        let track = self.resolve(query).await?;

        let lock = self.guild(gid);
        let mut state = lock.lock().await;
        state.announce = Some(channel);

        let req = TrackRequest::new(query, requested_by);
        if state.is_playing() {
            let position = state.push_back(req);
            tracing::info!(guild = %gid, position, %requested_by, "queued");
            return Ok(EnqueueOutcome::QueuedAt {
                position,
                title: track.display_title,
            });
        }

        let title = self.start_locked(gid, &mut state, req, track).await?;
        Ok(EnqueueOutcome::PlayingNow(title))
    }

    /// Completion continuation for every stream started by this engine.
    pub async fn on_track_end(&self, gid: GuildId, token: u64, error: Option<String>) {
        let Some(lock) = self.existing(gid) else {
            return;
        };
        let mut state = lock.lock().await;
        if state.now_playing.as_ref().map(|n| n.token) != Some(token) {
            tracing::debug!(guild = %gid, token, "ignoring stale completion");
            return;
        }

        let mut notices = Vec::new();
        if let Some(e) = error {
            notices.push(format!("❌ Player error: {e}"));
        }
        notices.extend(self.advance_locked(gid, &mut state).await);
        let channel = state.announce;
        drop(state);

        self.announce(channel, notices).await;
    }

    /// Stops the current stream; its completion advances the queue.
    pub async fn skip(&self, gid: GuildId) -> Result<(), PlaybackError> {
        let lock = self.existing(gid).ok_or(PlaybackError::NotPlaying)?;
        let state = lock.lock().await;
        let np = state.now_playing.as_ref().ok_or(PlaybackError::NotPlaying)?;
        np.handle
            .stop()
            .map_err(|e| PlaybackError::Sink(e.to_string()))
    }

    /// Halts playback without advancing. The queue is kept.
    pub async fn stop(&self, gid: GuildId) -> Result<(), PlaybackError> {
        let lock = self.existing(gid).ok_or(PlaybackError::NotPlaying)?;
        let mut state = lock.lock().await;
        let np = state.now_playing.take().ok_or(PlaybackError::NotPlaying)?;
        if let Err(e) = np.handle.stop() {
            tracing::warn!(guild = %gid, error = %e, "failed to stop stream");
        }
        Ok(())
    }

    pub async fn pause(&self, gid: GuildId) -> Result<(), PlaybackError> {
        let lock = self
            .existing(gid)
            .ok_or(PlaybackError::InvalidState("nothing is playing right now"))?;
        let mut state = lock.lock().await;
        let np = state
            .now_playing
            .as_mut()
            .ok_or(PlaybackError::InvalidState("nothing is playing right now"))?;
        if np.paused {
            return Err(PlaybackError::InvalidState("playback is already paused"));
        }
        np.handle
            .pause()
            .map_err(|e| PlaybackError::Sink(e.to_string()))?;
        np.paused = true;
        Ok(())
    }

    pub async fn resume(&self, gid: GuildId) -> Result<(), PlaybackError> {
        let lock = self
            .existing(gid)
            .ok_or(PlaybackError::InvalidState("nothing is paused right now"))?;
        let mut state = lock.lock().await;
        let np = state
            .now_playing
            .as_mut()
            .filter(|np| np.paused)
            .ok_or(PlaybackError::InvalidState("nothing is paused right now"))?;
        np.handle
            .resume()
            .map_err(|e| PlaybackError::Sink(e.to_string()))?;
        np.paused = false;
        Ok(())
    }

    /// Stores the guild volume and applies it to the active stream, if any.
    /// Streams started later begin at the stored volume.
    pub async fn set_volume(&self, gid: GuildId, value: i64) -> Result<(), PlaybackError> {
        let percent = u16::try_from(value)
            .ok()
            .filter(|v| *v <= MAX_VOLUME)
            .ok_or(PlaybackError::OutOfRange(value))?;

        let lock = self.guild(gid);
        let mut state = lock.lock().await;
        if let Some(np) = state.now_playing.as_ref() {
            np.handle
                .set_volume(percent)
                .map_err(|e| PlaybackError::Sink(e.to_string()))?;
        }
        state.set_volume(percent);
        Ok(())
    }

    /// Titles for the first `queue_preview` entries, resolved outside the guild lock.
    pub async fn list_queue(&self, gid: GuildId) -> QueueListing {
        let Some(lock) = self.existing(gid) else {
            return QueueListing {
                now_playing: None,
                upcoming: Vec::new(),
                overflow: 0,
            };
        };
        let preview = self.inner.settings.queue_preview;
        let (now_playing, head, overflow) = {
            let state = lock.lock().await;
            let now = state
                .now_playing
                .as_ref()
                .map(|np| np.request.title().to_string());
            let head: Vec<TrackRequest> = state.iter().take(preview).cloned().collect();
            (now, head, state.len().saturating_sub(preview))
        };

        let upcoming = join_all(head.iter().map(|req| async move {
            if let Some(t) = req.display_title.clone() {
                return t;
            }
            match self.resolve(&req.source_query).await {
                Ok(track) => track.display_title,
                Err(e) => {
                    tracing::debug!(query = %req.source_query, error = %e, "title lookup failed");
                    PLACEHOLDER_TITLE.to_string()
                }
            }
        }))
        .await;

        QueueListing {
            now_playing,
            upcoming,
            overflow,
        }
    }

    /// Empties the queue; returns how many entries were dropped.
    pub async fn clear(&self, gid: GuildId) -> usize {
        let Some(lock) = self.existing(gid) else {
            return 0;
        };
        let mut state = lock.lock().await;
        let n = state.len();
        state.clear();
        n
    }

    pub async fn status(&self, gid: GuildId) -> Option<PlaybackStatus> {
        let lock = self.existing(gid)?;
        let state = lock.lock().await;
        Some(PlaybackStatus {
            now_playing: state
                .now_playing
                .as_ref()
                .map(|np| np.request.title().to_string()),
            paused: state.now_playing.as_ref().is_some_and(|np| np.paused),
            queued: state.len(),
            volume: state.volume(),
        })
    }

    /// Drops all state for a guild, stopping its stream.
    pub async fn evict(&self, gid: GuildId) -> bool {
        let Some((_, lock)) = self.inner.guilds.remove(&gid) else {
            return false;
        };
        let mut state = lock.lock().await;
        if let Some(np) = state.now_playing.take() {
            if let Err(e) = np.handle.stop() {
                tracing::warn!(guild = %gid, error = %e, "failed to stop stream on evict");
            }
        }
        state.clear();
        true
    }
}
