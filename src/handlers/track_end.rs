// src/handlers/track_end.rs
use std::sync::{Arc, Mutex};

use poise::serenity_prelude::{GuildId, async_trait};
use songbird::{Event, EventContext, EventHandler, tracks::PlayMode};

use crate::util::sink::CompletionHook;

/// Fires the wrapped hook at most once, however many times it is triggered.
#[derive(Clone)]
pub struct CompletionOnce {
    hook: Arc<Mutex<Option<CompletionHook>>>,
}

impl CompletionOnce {
    pub fn new(hook: CompletionHook) -> Self {
        Self {
            hook: Arc::new(Mutex::new(Some(hook))),
        }
    }

    /// Returns `true` if this call actually ran the hook.
    pub fn fire(&self, error: Option<String>) -> bool {
        let hook = match self.hook.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        match hook {
            Some(h) => {
                h(error);
                true
            }
            None => false,
        }
    }
}

/// Registered for both `TrackEvent::End` and `TrackEvent::Error` on every started stream.
#[derive(Clone)]
pub struct TrackEndHandler {
    pub guild_id: GuildId,
    completion: CompletionOnce,
}

impl TrackEndHandler {
    pub fn new(guild_id: GuildId, hook: CompletionHook) -> Self {
        Self {
            guild_id,
            completion: CompletionOnce::new(hook),
        }
    }
}

#[async_trait]
impl EventHandler for TrackEndHandler {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        let error = match ctx {
            EventContext::Track(tracks) => tracks.first().and_then(|(state, _)| match &state.playing {
                PlayMode::Errored(e) => Some(format!("{e:?}")),
                _ => None,
            }),
            _ => None,
        };
        if let Some(ref e) = error {
            tracing::warn!(guild = %self.guild_id, error = %e, "stream ended with error");
        }
        // End and Error can both arrive for the same track; only the first counts.
        self.completion.fire(error);
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn completion_fires_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let once = CompletionOnce::new(Box::new(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        }));
        let cloned = once.clone();

        assert!(once.fire(None));
        assert!(!cloned.fire(Some("boom".into())));
        assert!(!once.fire(None));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn completion_passes_error() {
        let got = Arc::new(Mutex::new(None));
        let slot = got.clone();
        let once = CompletionOnce::new(Box::new(move |e| {
            *slot.lock().unwrap() = e;
        }));
        once.fire(Some("decoder".into()));
        assert_eq!(got.lock().unwrap().as_deref(), Some("decoder"));
    }
}
