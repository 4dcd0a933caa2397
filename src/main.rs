// src/main.rs ───────────────────────────────────────────
mod commands;
mod handlers;
mod models;
mod util;

use std::{
    path::PathBuf,
    sync::{Arc, OnceLock},
    time::Duration,
};

use clap::Parser;
use poise::serenity_prelude::{Client, GatewayIntents};
use songbird::SerenityInit;
use tracing_subscriber::EnvFilter;

use crate::{
    commands::create_commands::create_commands,
    handlers::interaction::event_handler,
    models::data::Data,
    util::{alias::Error, config::ConfigFile},
};

/// ───── CLI ─────
#[derive(Parser)]
struct Cli {
    /// Path to the config file
    #[arg(long, short, default_value = "Setting.toml")]
    config: PathBuf,
}

pub fn get_http_client() -> reqwest::Client {
    static HTTP_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();
    HTTP_CLIENT.get_or_init(reqwest::Client::new).clone()
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = Arc::new(ConfigFile::load(&cli.config)?);
    tracing::info!(path = %cli.config.display(), "config loaded");

    // ── poise framework ──
    let setup_config = config.clone();
    let framework = poise::Framework::<Data, Error>::builder()
        .options(poise::FrameworkOptions {
            commands: create_commands(),
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some(config.bot.prefix.clone()),
                ..Default::default()
            },
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;

                let manager = songbird::get(ctx).await.ok_or("Songbird not initialised")?;
                let data = Data::new(setup_config.clone(), ctx.http.clone(), manager);

                data.games.clone().spawn_reaper(Duration::from_secs(
                    setup_config.game.reap_interval_secs.max(1),
                ));

                if setup_config.ollama.pull_vision_model_on_start {
                    let inference = data.inference.clone();
                    let model = setup_config.ollama.vision_model.clone();
                    tokio::spawn(async move {
                        match inference.pull_vision_model().await {
                            Ok(()) => tracing::info!(%model, "vision model pulled"),
                            Err(e) => tracing::warn!(%model, error = %e, "failed to pull vision model"),
                        }
                    });
                }

                tracing::info!("bot is ready");
                Ok(data)
            })
        })
        .build();

    let intents = GatewayIntents::non_privileged()
        | GatewayIntents::MESSAGE_CONTENT
        | GatewayIntents::GUILD_VOICE_STATES;

    // ── client ──
    let mut client = Client::builder(&config.token.token, intents)
        .framework(framework)
        .register_songbird()
        .await?;

    let shard = tokio::spawn(async move {
        if let Err(why) = client.start().await {
            tracing::error!(error = ?why, "client ended");
        }
    });

    tokio::signal::ctrl_c().await.ok();
    tracing::info!("received Ctrl-C, shutting down");

    shard.abort();
    Ok(())
}
