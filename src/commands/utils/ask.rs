use std::time::{Duration, Instant};

use poise::CreateReply;
use tokio::time::{self, MissedTickBehavior};

use crate::util::{
    alias::{Context, Error},
    ollama::split_message,
};

const MAX_DISCORD_MESSAGE: usize = 2000;

/// Ask the AI a question
#[poise::command(slash_command, prefix_command)]
pub async fn ask(
    ctx: Context<'_>,
    #[rest]
    #[description = "Your question"]
    question: String,
) -> Result<(), Error> {
    if question.trim().is_empty() {
        ctx.say("❌ Ask me something!").await?;
        return Ok(());
    }

    let status = ctx
        .send(CreateReply::default().content("⌛ Thinking…"))
        .await?;
    let started_at = Instant::now();

    let mut interval = time::interval(Duration::from_secs(1));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval.tick().await;

    let mut last_reported_secs = 0u64;
    let mut can_update_status = true;
    let inference = ctx.data().inference.clone();
    let mut request_fut = Box::pin(async move { inference.generate_text(&question).await });

    let result = loop {
        tokio::select! {
            res = &mut request_fut => break res,
            _ = interval.tick() => {
                if !can_update_status {
                    continue;
                }
                let secs = started_at.elapsed().as_secs();
                if secs == 0 || secs == last_reported_secs {
                    continue;
                }
                last_reported_secs = secs;
                let content = format!("⌛ Thinking… ({})", format_elapsed(started_at.elapsed()));
                if status.edit(ctx, CreateReply::default().content(content)).await.is_err() {
                    can_update_status = false;
                }
            }
        }
    };

    match result {
        Ok(answer) => {
            let mut chunks = split_message(&answer, MAX_DISCORD_MESSAGE).into_iter();
            if let Some(first) = chunks.next() {
                status.edit(ctx, CreateReply::default().content(first)).await?;
            }
            for chunk in chunks {
                ctx.say(chunk).await?;
            }
        }
        Err(err) => {
            tracing::warn!(error = %err, "ask failed");
            status
                .edit(ctx, CreateReply::default().content(format!("Error: {err}")))
                .await?;
        }
    }
    Ok(())
}

pub(crate) fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    if secs < 60 {
        if secs == 0 {
            return format!("{:.1}s", elapsed.as_secs_f32());
        }
        return format!("{secs}s");
    }
    format!("{}m{:02}s", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_formatting() {
        assert_eq!(format_elapsed(Duration::from_millis(400)), "0.4s");
        assert_eq!(format_elapsed(Duration::from_secs(42)), "42s");
        assert_eq!(format_elapsed(Duration::from_secs(125)), "2m05s");
    }
}
