use chrono::Utc;
use poise::CreateReply;
use poise::serenity_prelude::{Colour, CreateEmbed, CreateEmbedFooter};

use crate::util::{
    alias::{Context, Error},
    player::{PlaybackStatus, QueueListing},
};

fn queue_embed(listing: &QueueListing, status: Option<&PlaybackStatus>) -> CreateEmbed {
    let mut embed = CreateEmbed::default()
        .title("Song Queue")
        .colour(Colour::BLITZ_BLUE)
        .timestamp(Utc::now());

    if let Some(now) = listing.now_playing.as_deref() {
        let paused = if status.is_some_and(|s| s.paused) { " (paused)" } else { "" };
        embed = embed.field("Now Playing", format!("🎵 {now}{paused}"), false);
    }
    if let Some(s) = status {
        embed = embed.field("Volume", format!("🔊 {}%", s.volume), true);
    }

    if !listing.upcoming.is_empty() {
        let upcoming = listing
            .upcoming
            .iter()
            .enumerate()
            .map(|(i, title)| format!("{}. {title}", i + 1))
            .collect::<Vec<_>>()
            .join("\n");
        embed = embed.field("Up Next", upcoming, false);
    }

    if listing.overflow > 0 {
        embed = embed.footer(CreateEmbedFooter::new(format!(
            "And {} more songs...",
            listing.overflow
        )));
    }
    embed
}

/// Show the current queue
#[poise::command(slash_command, prefix_command, guild_only, aliases("q"))]
pub async fn queue(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command can only be used in a server")?;
    ctx.defer().await?;

    let listing = ctx.data().player.list_queue(guild_id).await;
    let status = ctx.data().player.status(guild_id).await;
    if listing.now_playing.is_none() && listing.upcoming.is_empty() {
        ctx.say("Queue is empty!").await?;
        return Ok(());
    }

    ctx.send(CreateReply::default().embed(queue_embed(&listing, status.as_ref())))
        .await?;
    Ok(())
}
