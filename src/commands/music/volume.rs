use crate::util::alias::{Context, Error};

/// Change volume (0-200)
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn volume(
    ctx: Context<'_>,
    #[description = "Volume in percent (0-200)"] volume: i64,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command can only be used in a server")?;

    match ctx.data().player.set_volume(guild_id, volume).await {
        Ok(()) => ctx.say(format!("🔊 Volume set to {volume}%")).await?,
        Err(e) => ctx.say(format!("❌ {e}")).await?,
    };
    Ok(())
}
