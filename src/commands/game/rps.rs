use std::time::{Duration, Instant};

use poise::CreateReply;
use poise::serenity_prelude::{
    self as serenity, ButtonStyle, CreateActionRow, CreateButton, CreateInteractionResponse,
    CreateInteractionResponseMessage, CreateMessage, Mentionable,
};

use crate::{
    handlers::interaction::choice_components,
    util::{
        alias::{Context, Error},
        game::GameError,
    },
};

/// Challenge someone to Rock Paper Scissors
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn rps(
    ctx: Context<'_>,
    #[description = "Who to challenge"] opponent: serenity::User,
) -> Result<(), Error> {
    let challenger = ctx.author().clone();
    if opponent.bot {
        ctx.say("You can't challenge a bot!").await?;
        return Ok(());
    }
    if opponent.id == challenger.id {
        ctx.say(GameError::InvalidChallenge.to_string()).await?;
        return Ok(());
    }

    // the proposal lives only in this message until the opponent accepts
    let accept_id = format!("accept_rps_{}", ctx.id());
    let reply = CreateReply::default()
        .content(format!(
            "{}, {} challenges you to Rock Paper Scissors!",
            opponent.mention(),
            challenger.name
        ))
        .components(vec![CreateActionRow::Buttons(vec![
            CreateButton::new(accept_id.clone())
                .label("Accept Challenge")
                .style(ButtonStyle::Primary),
        ])]);
    let handle = ctx.send(reply).await?;
    let msg = handle.message().await?.into_owned();

    let timeout = Duration::from_secs(ctx.data().config.game.accept_timeout_secs);
    let deadline = Instant::now() + timeout;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        let Some(interaction) = msg
            .await_component_interaction(ctx)
            .custom_ids(vec![accept_id.clone()])
            .timeout(remaining)
            .await
        else {
            break;
        };

        if interaction.user.id != opponent.id {
            let builder = CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::default()
                    .content("This challenge isn't for you!")
                    .ephemeral(true),
            );
            if let Err(e) = interaction.create_response(ctx, builder).await {
                tracing::warn!(user = %interaction.user.id, error = %e, "failed to refuse foreign accept");
            }
            continue;
        }

        let game_id = ctx.data().games.create(challenger.id, opponent.id)?;
        interaction
            .create_response(
                ctx,
                CreateInteractionResponse::UpdateMessage(
                    CreateInteractionResponseMessage::default()
                        .content("Game started! Check your DMs to make your choice.")
                        .components(vec![]),
                ),
            )
            .await?;

        for player in [&challenger, &opponent] {
            let sent = player
                .direct_message(
                    ctx,
                    CreateMessage::new()
                        .content("Make your choice:")
                        .components(choice_components(game_id)),
                )
                .await;
            if let Err(e) = sent {
                tracing::warn!(game = %game_id, user = %player.id, error = %e, "could not DM player");
                ctx.data().games.cancel(game_id);
                ctx.say(dm_closed_message(player.id)).await?;
                return Ok(());
            }
        }
        return Ok(());
    }

    handle
        .edit(
            ctx,
            CreateReply::default()
                .content("⌛ The challenge was not accepted in time.")
                .components(vec![]),
        )
        .await?;
    Ok(())
}

fn dm_closed_message(player: serenity::UserId) -> String {
    format!(
        "❌ Game cancelled: I couldn't DM {}. Please enable direct messages from server members and try again.",
        player.mention()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dm_closed_message_names_player() {
        let msg = dm_closed_message(serenity::UserId::new(42));
        assert!(msg.contains("<@42>"));
        assert!(msg.starts_with("❌ Game cancelled"));
    }
}
