use crate::util::alias::{Context, Error};

/// Resume the currently paused song
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn resume(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command can only be used in a server")?;

    match ctx.data().player.resume(guild_id).await {
        Ok(()) => ctx.say("▶️ Resumed").await?,
        Err(e) => ctx.say(format!("❌ {e}")).await?,
    };
    Ok(())
}
