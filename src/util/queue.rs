use std::collections::VecDeque;

use poise::serenity_prelude::ChannelId;

use crate::util::{sink::PlaybackHandle, track::TrackRequest};

pub const MAX_VOLUME: u16 = 200;

/// The stream currently attached to a guild.
pub struct NowPlaying {
    pub request: TrackRequest,
    /// Identifies the stream in completion events.
    pub token: u64,
    pub paused: bool,
    pub handle: Box<dyn PlaybackHandle>,
}

/// Per-guild playback state. Only `PlaybackEngine` touches it, under the guild's mutex.
pub struct GuildPlayback {
    queue: VecDeque<TrackRequest>,
    pub now_playing: Option<NowPlaying>,
    volume: u16,
    /// Text channel that receives "now playing" and error notices.
    pub announce: Option<ChannelId>,
}

impl GuildPlayback {
    pub fn new(volume: u16) -> Self {
        Self {
            queue: VecDeque::new(),
            now_playing: None,
            volume: volume.min(MAX_VOLUME),
            announce: None,
        }
    }

    /// Appends and returns the 1-based position.
    pub fn push_back(&mut self, req: TrackRequest) -> usize {
        self.queue.push_back(req);
        self.queue.len()
    }

    pub fn pop_next(&mut self) -> Option<TrackRequest> {
        self.queue.pop_front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackRequest> {
        self.queue.iter()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }

    pub fn is_playing(&self) -> bool {
        self.now_playing.is_some()
    }

    pub fn volume(&self) -> u16 {
        self.volume
    }

    pub fn set_volume(&mut self, v: u16) {
        self.volume = v.min(MAX_VOLUME);
    }
}
