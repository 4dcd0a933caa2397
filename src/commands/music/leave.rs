use crate::util::alias::{Context, Error};

#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn leave(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Guild ID not found")?;
    let manager = songbird::get(ctx.serenity_context())
        .await
        .ok_or("Songbird not initialised")?;

    if manager.get(guild_id).is_none() {
        ctx.say("I'm not in a voice channel!").await?;
        return Ok(());
    }

    ctx.data().player.evict(guild_id).await;
    manager.remove(guild_id).await?;
    ctx.say("👋 Left the voice channel").await?;
    Ok(())
}
