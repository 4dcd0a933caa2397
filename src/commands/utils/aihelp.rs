use crate::util::alias::{Context, Error};

fn help_text(prefix: &str) -> String {
    format!(
        "**Available Commands:**

AI Commands:
`{p}ask [question]` - Ask a question to the AI
`{p}analyze [prompt]` - Analyze an attached image (optional prompt)

Music Commands:
`{p}join` - Join your voice channel
`{p}play [song]` - Play a song (URL or search term)
`{p}pause` / `{p}resume` - Pause or resume playback
`{p}skip` - Skip the current song
`{p}stop` - Stop playing music
`{p}queue` - Show the queue
`{p}clear` - Clear the queue
`{p}volume [0-200]` - Change the volume
`{p}leave` - Leave the voice channel

Game Commands:
`{p}rps @user` - Challenge someone to Rock Paper Scissors

Other Commands:
`{p}aihelp` - Show this help message",
        p = prefix
    )
}

/// Show the command list
#[poise::command(slash_command, prefix_command)]
pub async fn aihelp(ctx: Context<'_>) -> Result<(), Error> {
    ctx.say(help_text(&ctx.data().config.bot.prefix)).await?;
    Ok(())
}
