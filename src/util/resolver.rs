use std::time::Duration;

use poise::serenity_prelude::async_trait;
use serde_json::Value;
use url::Url;

use crate::util::{
    config::YtDlpSettings,
    track::ResolvedTrack,
    ytdlp::{EnvOverrides, compose_user_args},
};

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("failed to run yt-dlp: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("yt-dlp timed out after {0:?}")]
    Timeout(Duration),
    #[error("yt-dlp failed: {0}")]
    Failed(String),
    #[error("could not parse yt-dlp output: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("no playable result for query")]
    NoResult,
}

/// Turns a URL or free-text query into a playable stream.
#[async_trait]
pub trait TrackResolver: Send + Sync {
    async fn resolve(&self, query: &str) -> Result<ResolvedTrack, ResolveError>;
}

/// Resolver backed by the `yt-dlp` executable.
pub struct YtDlpResolver {
    program: String,
    settings: Option<YtDlpSettings>,
    timeout: Duration,
}

impl YtDlpResolver {
    pub fn new(settings: Option<YtDlpSettings>, timeout: Duration) -> Self {
        Self {
            program: "yt-dlp".into(),
            settings,
            timeout,
        }
    }

    fn args_for(&self, query: &str) -> Vec<String> {
        let base = vec![
            "--ignore-config".into(),
            "--no-warnings".into(),
            "--no-playlist".into(),
            "-4".into(),
            "-f".into(),
            "bestaudio[protocol^=http]/bestaudio/best".into(),
            "--dump-single-json".into(),
        ];
        let mut args = compose_user_args(base, self.settings.as_ref(), &EnvOverrides::from_env());
        args.push(search_target(query));
        args
    }
}

/// URLs are passed through; anything else becomes a single-result YouTube search.
pub fn search_target(query: &str) -> String {
    let q = query.trim();
    match Url::parse(q) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => q.to_string(),
        _ => format!("ytsearch1:{q}"),
    }
}

/// Picks the first entry of a playlist/search result, or the document itself.
pub fn parse_dump(json: &Value) -> Result<ResolvedTrack, ResolveError> {
    let entry = match json.get("entries") {
        Some(entries) => entries
            .as_array()
            .and_then(|a| a.iter().find(|e| !e.is_null()))
            .ok_or(ResolveError::NoResult)?,
        None => json,
    };

    let stream_ref = entry
        .get("url")
        .and_then(Value::as_str)
        .ok_or(ResolveError::NoResult)?
        .to_string();
    let canonical_url = entry
        .get("webpage_url")
        .and_then(Value::as_str)
        .or_else(|| entry.get("original_url").and_then(Value::as_str))
        .unwrap_or(&stream_ref)
        .to_string();
    let display_title = entry
        .get("title")
        .and_then(Value::as_str)
        .filter(|t| !t.trim().is_empty())
        .unwrap_or(&canonical_url)
        .to_string();

    Ok(ResolvedTrack {
        stream_ref,
        display_title,
        canonical_url,
    })
}

#[async_trait]
impl TrackResolver for YtDlpResolver {
    #[tracing::instrument(name = "YtDlpResolver::resolve", level = "info", skip(self))]
    async fn resolve(&self, query: &str) -> Result<ResolvedTrack, ResolveError> {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(self.args_for(query)).kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| ResolveError::Timeout(self.timeout))??;

        if !output.status.success() {
            let err = String::from_utf8_lossy(&output.stderr);
            return Err(ResolveError::Failed(err.trim().to_string()));
        }

        let json: Value = serde_json::from_slice(&output.stdout)?;
        let track = parse_dump(&json)?;
        tracing::info!(title = %track.display_title, url = %track.canonical_url, "resolved");
        Ok(track)
    }
}
