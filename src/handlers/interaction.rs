// src/handlers/interaction.rs
use poise::serenity_prelude::{
    self as serenity, ButtonStyle, ComponentInteraction, CreateActionRow, CreateButton,
    CreateInteractionResponseFollowup, FullEvent, Interaction,
};

use crate::{
    models::data::Data,
    util::{
        alias::Error,
        game::{Choice, GameError, GameId, SubmitOutcome},
    },
};

const CHOICE_PREFIX: &str = "rps_choice_";

pub fn choice_custom_id(game_id: GameId, choice: Choice) -> String {
    format!("{CHOICE_PREFIX}{game_id}_{}", choice.name())
}

/// `rps_choice_<uuid>_<Choice>` → (game, choice).
pub fn parse_choice_custom_id(custom_id: &str) -> Option<(GameId, Choice)> {
    let rest = custom_id.strip_prefix(CHOICE_PREFIX)?;
    let (id, choice) = rest.rsplit_once('_')?;
    Some((id.parse().ok()?, choice.parse().ok()?))
}

/// Rock / Paper / Scissors buttons sent to each player by DM.
pub fn choice_components(game_id: GameId) -> Vec<CreateActionRow> {
    vec![CreateActionRow::Buttons(
        Choice::ALL
            .into_iter()
            .map(|c| {
                CreateButton::new(choice_custom_id(game_id, c))
                    .label(c.label())
                    .style(ButtonStyle::Secondary)
            })
            .collect(),
    )]
}

/// Text shown to the player who pressed a choice button.
fn choice_reply(result: &Result<SubmitOutcome, GameError>, choice: Choice) -> String {
    match result {
        Ok(SubmitOutcome::Accepted) | Ok(SubmitOutcome::Resolved(_)) => {
            format!("You chose {}!", choice.label())
        }
        Err(e) => e.to_string(),
    }
}

async fn handle_choice(
    ctx: &serenity::Context,
    interaction: &ComponentInteraction,
    data: &Data,
    game_id: GameId,
    choice: Choice,
) -> Result<(), Error> {
    // Discord wants the ack within 3s; the result DMs sent by submit_choice may take longer
    interaction.defer_ephemeral(ctx).await?;

    let user = interaction.user.id;
    let result = data.games.submit_choice(game_id, user, choice).await;
    if let Err(ref e) = result {
        tracing::debug!(game = %game_id, %user, error = %e, "choice rejected");
    }
    interaction
        .create_followup(
            ctx,
            CreateInteractionResponseFollowup::new()
                .content(choice_reply(&result, choice))
                .ephemeral(true),
        )
        .await?;
    Ok(())
}

pub async fn event_handler(
    ctx: &serenity::Context,
    event: &FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        FullEvent::Ready { data_about_bot } => {
            tracing::info!(user = %data_about_bot.user.name, "connected to Discord");
            ctx.set_activity(Some(serenity::ActivityData::playing(
                data.config.bot.status.clone(),
            )));
        }
        FullEvent::InteractionCreate {
            interaction: Interaction::Component(component),
        } => {
            if let Some((game_id, choice)) = parse_choice_custom_id(&component.data.custom_id) {
                handle_choice(ctx, component, data, game_id, choice).await?;
            }
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn custom_id_round_trips() {
        let id = Uuid::new_v4();
        let raw = choice_custom_id(id, Choice::Scissors);
        assert!(raw.len() <= 100);
        assert_eq!(parse_choice_custom_id(&raw), Some((id, Choice::Scissors)));
    }

    #[test]
    fn choice_reply_confirms_or_explains() {
        assert_eq!(
            choice_reply(&Ok(SubmitOutcome::Accepted), Choice::Rock),
            "You chose 🪨 Rock!"
        );
        assert_eq!(
            choice_reply(&Err(GameError::AlreadyExpiredOrUnknown), Choice::Paper),
            "This game has expired!"
        );
        assert_eq!(
            choice_reply(&Err(GameError::NotAParticipant), Choice::Paper),
            "This isn't your game!"
        );
    }

    #[test]
    fn foreign_ids_are_ignored() {
        assert_eq!(parse_choice_custom_id("music_pause"), None);
        assert_eq!(parse_choice_custom_id("rps_choice_not-a-uuid_Rock"), None);
        let id = Uuid::new_v4();
        assert_eq!(parse_choice_custom_id(&format!("rps_choice_{id}_Lizard")), None);
    }
}
