use std::path::Path;

use anyhow::{Context as _, bail};
use serde::Deserialize;

/// Top-level `Setting.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub token: Tokens,
    #[serde(default)]
    pub bot: BotSettings,
    #[serde(default)]
    pub ollama: OllamaSettings,
    #[serde(default)]
    pub music: MusicSettings,
    #[serde(default)]
    pub game: GameSettings,
    #[serde(default)]
    pub yt_dlp: Option<YtDlpSettings>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Tokens {
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BotSettings {
    pub prefix: String,
    pub name: String,
    pub status: String,
    pub personality: Option<String>,
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            prefix: "!".into(),
            name: "Luna".into(),
            status: "Luna - AI Assistant".into(),
            personality: None,
        }
    }
}

impl BotSettings {
    /// System prompt sent with every `ask`.
    pub fn personality(&self) -> String {
        match self.personality.as_deref() {
            Some(p) if !p.trim().is_empty() => p.to_string(),
            _ => format!(
                "You are {name}, a friendly and empathetic AI with a very human-like personality. \
                 You're warm, friendly, and occasionally playful. You speak in a natural, flowing way, \
                 use emojis naturally but not excessively, and ask follow-up questions to show interest. \
                 Always remember you're {name}. Never pretend to be human - be proud of being an AI. \
                 If you don't know something, say so honestly.",
                name = self.name
            ),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OllamaSettings {
    pub base_url: String,
    pub chat_model: String,
    pub vision_model: String,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    pub pull_vision_model_on_start: bool,
}

impl Default for OllamaSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".into(),
            chat_model: "llama3.2:latest".into(),
            vision_model: "llava:latest".into(),
            temperature: 0.9,
            top_p: 0.95,
            top_k: 40,
            max_tokens: 2048,
            timeout_secs: 300,
            pull_vision_model_on_start: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MusicSettings {
    pub default_volume: u16,
    pub max_consecutive_failures: usize,
    pub resolver_workers: usize,
    pub resolve_timeout_secs: u64,
    pub queue_preview: usize,
}

impl Default for MusicSettings {
    fn default() -> Self {
        Self {
            default_volume: 100,
            max_consecutive_failures: 5,
            resolver_workers: 4,
            resolve_timeout_secs: 30,
            queue_preview: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GameSettings {
    pub challenge_ttl_secs: u64,
    pub reap_interval_secs: u64,
    pub accept_timeout_secs: u64,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            challenge_ttl_secs: 600,
            reap_interval_secs: 60,
            accept_timeout_secs: 300,
        }
    }
}

/// `[yt_dlp]` section. Environment variables take precedence, see `util::ytdlp`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct YtDlpSettings {
    pub cookies_from_browser: Option<String>,
    pub cookies_file: Option<String>,
    pub proxy: Option<String>,
    pub extra_args: Option<Vec<String>>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let mut cfg = Self::parse(&contents)?;
        if let Ok(token) = std::env::var("DISCORD_TOKEN") {
            if !token.trim().is_empty() {
                cfg.token.token = token;
            }
        }
        if cfg.token.token.trim().is_empty() {
            bail!("Discord token is missing (set [token].token or DISCORD_TOKEN)");
        }
        Ok(cfg)
    }

    pub fn parse(contents: &str) -> anyhow::Result<Self> {
        let cfg: Self = toml::from_str(contents).context("failed to parse config file")?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.music.default_volume > 200 {
            bail!("music.default_volume must be within 0..=200");
        }
        if self.music.max_consecutive_failures == 0 {
            bail!("music.max_consecutive_failures must be at least 1");
        }
        if self.music.resolver_workers == 0 {
            bail!("music.resolver_workers must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_uses_defaults() {
        let cfg = ConfigFile::parse("[token]\ntoken = \"abc\"\n").unwrap();
        assert_eq!(cfg.token.token, "abc");
        assert_eq!(cfg.bot.prefix, "!");
        assert_eq!(cfg.ollama.chat_model, "llama3.2:latest");
        assert_eq!(cfg.music.default_volume, 100);
        assert_eq!(cfg.music.queue_preview, 10);
        assert!(cfg.yt_dlp.is_none());
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let cfg = ConfigFile::parse(
            "[token]\ntoken = \"abc\"\n[music]\nmax_consecutive_failures = 2\n[yt_dlp]\nproxy = \"socks5://x\"\n",
        )
        .unwrap();
        assert_eq!(cfg.music.max_consecutive_failures, 2);
        assert_eq!(cfg.music.resolver_workers, 4);
        assert_eq!(cfg.yt_dlp.unwrap().proxy.as_deref(), Some("socks5://x"));
    }

    #[test]
    fn token_section_is_optional() {
        let cfg = ConfigFile::parse("[bot]\nprefix = \"?\"\n").unwrap();
        assert!(cfg.token.token.is_empty());
        assert_eq!(cfg.bot.prefix, "?");
    }

    #[test]
    fn rejects_out_of_range_default_volume() {
        let err = ConfigFile::parse("[token]\ntoken = \"abc\"\n[music]\ndefault_volume = 250\n");
        assert!(err.is_err());
    }

    #[test]
    fn personality_falls_back_to_name() {
        let bot = BotSettings { name: "Nova".into(), ..Default::default() };
        assert!(bot.personality().contains("You are Nova"));
    }
}
