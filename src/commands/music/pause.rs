use crate::util::alias::{Context, Error};

/// Pause the currently playing song
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn pause(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command can only be used in a server")?;

    match ctx.data().player.pause(guild_id).await {
        Ok(()) => ctx.say("⏸️ Paused").await?,
        Err(e) => ctx.say(format!("❌ {e}")).await?,
    };
    Ok(())
}
