use crate::util::alias::{Context, Error};

#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn clear(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command can only be used in a server")?;
    let removed = ctx.data().player.clear(guild_id).await;
    tracing::info!(guild = %guild_id, removed, "queue cleared");
    ctx.say("🗑️ Queue cleared!").await?;
    Ok(())
}
