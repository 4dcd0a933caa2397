use crate::util::{
    alias::{Context, Error},
    player::PlaybackError,
};

#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn stop(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command can only be used in a server")?;

    match ctx.data().player.stop(guild_id).await {
        Ok(()) => ctx.say("⏹️ Stopped playing").await?,
        Err(PlaybackError::NotPlaying) => ctx.say("Nothing is playing right now!").await?,
        Err(e) => ctx.say(format!("❌ {e}")).await?,
    };
    Ok(())
}
