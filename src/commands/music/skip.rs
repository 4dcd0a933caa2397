use crate::util::{
    alias::{Context, Error},
    player::PlaybackError,
};

#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn skip(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command can only be used in a server")?;

    // the stream's completion advances the queue
    match ctx.data().player.skip(guild_id).await {
        Ok(()) => ctx.say("⏭️ Skipped the current song").await?,
        Err(PlaybackError::NotPlaying) => ctx.say("Nothing is playing!").await?,
        Err(e) => ctx.say(format!("❌ {e}")).await?,
    };
    Ok(())
}
