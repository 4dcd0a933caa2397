use poise::serenity_prelude::UserId;

/// A play request as stored in a guild queue. Resolution is deferred until dequeue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackRequest {
    pub source_query: String,
    pub requested_by: UserId,
    pub display_title: Option<String>,
}

impl TrackRequest {
    /// Placeholder without a resolved title.
    pub fn new(source_query: impl Into<String>, requested_by: UserId) -> Self {
        Self {
            source_query: source_query.into(),
            requested_by,
            display_title: None,
        }
    }

    pub fn title(&self) -> &str {
        self.display_title.as_deref().unwrap_or(&self.source_query)
    }
}

/// Output of the track resolver for one query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedTrack {
    /// Direct media URL.
    pub stream_ref: String,
    pub display_title: String,
    /// Page URL of the track, stable across re-resolution.
    pub canonical_url: String,
}
