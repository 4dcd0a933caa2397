use poise::CreateReply;

use crate::{
    commands::music::join::_join,
    util::{
        alias::{Context, Error},
        player::EnqueueOutcome,
    },
};

/// Play a song or add it to the queue
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn play(
    ctx: Context<'_>,
    #[rest]
    #[description = "URL or search text"]
    query: String,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command can only be used in a server")?;
    if query.trim().is_empty() {
        ctx.say("❌ Tell me what to play").await?;
        return Ok(());
    }

    let manager = songbird::get(ctx.serenity_context())
        .await
        .ok_or("Songbird not initialised")?;
    if manager.get(guild_id).is_none() {
        _join(&ctx, guild_id, None).await?;
    }

    ctx.defer().await?;
    let status = ctx.say("🔍 Searching for the song...").await?;

    let content = match ctx
        .data()
        .player
        .enqueue(guild_id, ctx.channel_id(), &query, ctx.author().id)
        .await
    {
        Ok(EnqueueOutcome::PlayingNow(title)) => format!("🎵 Now playing: **{title}**"),
        Ok(EnqueueOutcome::QueuedAt { position, title }) => {
            format!("📝 Added to queue (Position {position}): **{title}**")
        }
        Err(e) => {
            tracing::warn!(guild = %guild_id, %query, error = %e, "play failed");
            format!("❌ An error occurred: {e}")
        }
    };
    status.edit(ctx, CreateReply::default().content(content)).await?;
    Ok(())
}
