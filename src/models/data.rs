use std::{sync::Arc, time::Duration};

use poise::serenity_prelude::Http;
use songbird::Songbird;

use crate::{
    get_http_client,
    util::{
        config::ConfigFile,
        game::ChallengeCoordinator,
        notify::DiscordNotifier,
        ollama::InferenceClient,
        player::{EngineSettings, PlaybackEngine},
        resolver::YtDlpResolver,
        sink::SongbirdSink,
    },
};

pub struct Data {
    pub player: PlaybackEngine,
    pub games: Arc<ChallengeCoordinator>,
    pub inference: InferenceClient,
    pub config: Arc<ConfigFile>,
}

impl Data {
    pub fn new(config: Arc<ConfigFile>, http: Arc<Http>, songbird: Arc<Songbird>) -> Self {
        let notifier = Arc::new(DiscordNotifier::new(http));
        let resolver = Arc::new(YtDlpResolver::new(
            config.yt_dlp.clone(),
            Duration::from_secs(config.music.resolve_timeout_secs),
        ));
        let sink = Arc::new(SongbirdSink::new(songbird, get_http_client()));

        let player = PlaybackEngine::new(
            resolver,
            sink,
            notifier.clone(),
            EngineSettings::from(&config.music),
        );
        let games = Arc::new(ChallengeCoordinator::new(
            Duration::from_secs(config.game.challenge_ttl_secs),
            notifier,
        ));
        let inference = InferenceClient::new(
            get_http_client(),
            config.ollama.clone(),
            config.bot.personality(),
        );

        Self {
            player,
            games,
            inference,
            config,
        }
    }
}
