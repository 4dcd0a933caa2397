use std::{collections::HashMap, fmt, str::FromStr, sync::Arc, time::Duration};

use dashmap::{DashMap, mapref::entry::Entry};
use poise::serenity_prelude::UserId;
use tokio::time::Instant;
use uuid::Uuid;

use crate::util::notify::{Notifier, NotifyTarget};

pub type GameId = Uuid;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Choice {
    Rock,
    Paper,
    Scissors,
}

impl Choice {
    pub const ALL: [Choice; 3] = [Choice::Rock, Choice::Paper, Choice::Scissors];

    fn value(self) -> i8 {
        match self {
            Choice::Rock => 0,
            Choice::Paper => 1,
            Choice::Scissors => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Choice::Rock => "Rock",
            Choice::Paper => "Paper",
            Choice::Scissors => "Scissors",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Choice::Rock => "🪨 Rock",
            Choice::Paper => "📄 Paper",
            Choice::Scissors => "✂️ Scissors",
        }
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Choice {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Choice::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(s.trim()))
            .ok_or(GameError::UnknownChoice)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Tie,
    ChallengerWins,
    OpponentWins,
}

/// `(challenger - opponent) mod 3`: 0 tie, 1 challenger, 2 opponent.
pub fn decide(challenger: Choice, opponent: Choice) -> Outcome {
    match (challenger.value() - opponent.value()).rem_euclid(3) {
        0 => Outcome::Tie,
        1 => Outcome::ChallengerWins,
        _ => Outcome::OpponentWins,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("You can't challenge yourself!")]
    InvalidChallenge,
    #[error("This game has expired!")]
    AlreadyExpiredOrUnknown,
    #[error("This isn't your game!")]
    NotAParticipant,
    #[error("You've already made your choice!")]
    AlreadySubmitted,
    #[error("Unknown choice")]
    UnknownChoice,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ChallengeStatus {
    Accepted,
    Resolved,
    Expired,
}

#[derive(Clone, Debug)]
pub struct Challenge {
    pub id: GameId,
    pub challenger: UserId,
    pub opponent: UserId,
    pub choices: HashMap<UserId, Choice>,
    pub status: ChallengeStatus,
    pub created_at: Instant,
}

impl Challenge {
    fn is_participant(&self, user: UserId) -> bool {
        user == self.challenger || user == self.opponent
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub game_id: GameId,
    pub challenger: UserId,
    pub opponent: UserId,
    pub challenger_choice: Choice,
    pub opponent_choice: Choice,
    pub outcome: Outcome,
}

impl Resolution {
    pub fn winner(&self) -> Option<UserId> {
        match self.outcome {
            Outcome::Tie => None,
            Outcome::ChallengerWins => Some(self.challenger),
            Outcome::OpponentWins => Some(self.opponent),
        }
    }

    pub fn message(&self) -> String {
        let verdict = match self.winner() {
            None => "It's a tie!".to_string(),
            Some(w) => format!("<@{w}> wins!"),
        };
        format!(
            "**Results:**\n<@{}>: {}\n<@{}>: {}\n\n{verdict}",
            self.challenger,
            self.challenger_choice.label(),
            self.opponent,
            self.opponent_choice.label(),
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Recorded; still waiting for the other player.
    Accepted,
    /// Second choice arrived; the game is gone from the registry.
    Resolved(Resolution),
}

/// Owns every in-flight challenge. Mutations on one game happen under its map entry lock.
pub struct GameRegistry {
    games: DashMap<GameId, Challenge>,
    ttl: Duration,
}

impl GameRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            games: DashMap::new(),
            ttl,
        }
    }

    fn expired(&self, ch: &Challenge) -> bool {
        ch.created_at.elapsed() >= self.ttl
    }

    pub fn create(&self, challenger: UserId, opponent: UserId) -> Result<GameId, GameError> {
        if challenger == opponent {
            return Err(GameError::InvalidChallenge);
        }
        let id = Uuid::new_v4();
        self.games.insert(
            id,
            Challenge {
                id,
                challenger,
                opponent,
                choices: HashMap::with_capacity(2),
                status: ChallengeStatus::Accepted,
                created_at: Instant::now(),
            },
        );
        tracing::info!(game = %id, %challenger, %opponent, "challenge accepted");
        Ok(id)
    }

    /// First submission per participant wins; the second distinct participant resolves the game.
    pub fn submit(
        &self,
        id: GameId,
        participant: UserId,
        choice: Choice,
    ) -> Result<SubmitOutcome, GameError> {
        let Entry::Occupied(mut entry) = self.games.entry(id) else {
            return Err(GameError::AlreadyExpiredOrUnknown);
        };
        // left in place so `take_expired` can hand it to whoever sends the expiry notice
        if self.expired(entry.get()) {
            return Err(GameError::AlreadyExpiredOrUnknown);
        }

        let game = entry.get_mut();
        if !game.is_participant(participant) {
            return Err(GameError::NotAParticipant);
        }
        if game.choices.contains_key(&participant) {
            return Err(GameError::AlreadySubmitted);
        }
        game.choices.insert(participant, choice);
        if game.choices.len() < 2 {
            return Ok(SubmitOutcome::Accepted);
        }

        let mut game = entry.remove();
        game.status = ChallengeStatus::Resolved;
        let challenger_choice = game.choices[&game.challenger];
        let opponent_choice = game.choices[&game.opponent];
        Ok(SubmitOutcome::Resolved(Resolution {
            game_id: id,
            challenger: game.challenger,
            opponent: game.opponent,
            challenger_choice,
            opponent_choice,
            outcome: decide(challenger_choice, opponent_choice),
        }))
    }

    /// Removes `id` if it outlived the TTL.
    pub fn take_expired(&self, id: GameId) -> Option<Challenge> {
        let (_, mut ch) = self.games.remove_if(&id, |_, ch| self.expired(ch))?;
        ch.status = ChallengeStatus::Expired;
        Some(ch)
    }

    /// Removes and returns every challenge older than the TTL.
    pub fn reap_expired(&self) -> Vec<Challenge> {
        let stale: Vec<GameId> = self
            .games
            .iter()
            .filter(|e| self.expired(e.value()))
            .map(|e| *e.key())
            .collect();
        stale.into_iter().filter_map(|id| self.take_expired(id)).collect()
    }

    pub fn remove(&self, id: GameId) -> Option<Challenge> {
        self.games.remove(&id).map(|(_, ch)| ch)
    }

    pub fn get(&self, id: GameId) -> Option<Challenge> {
        self.games.get(&id).map(|e| e.value().clone())
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }
}

/// Runs the choose/resolve/notify part of a challenge.
pub struct ChallengeCoordinator {
    registry: GameRegistry,
    notifier: Arc<dyn Notifier>,
}

impl ChallengeCoordinator {
    pub fn new(ttl: Duration, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            registry: GameRegistry::new(ttl),
            notifier,
        }
    }

    pub fn registry(&self) -> &GameRegistry {
        &self.registry
    }

    /// Called once the opponent has accepted.
    pub fn create(&self, challenger: UserId, opponent: UserId) -> Result<GameId, GameError> {
        self.registry.create(challenger, opponent)
    }

    pub async fn submit_choice(
        &self,
        id: GameId,
        participant: UserId,
        choice: Choice,
    ) -> Result<SubmitOutcome, GameError> {
        let outcome = match self.registry.submit(id, participant, choice) {
            Err(GameError::AlreadyExpiredOrUnknown) => {
                if let Some(expired) = self.registry.take_expired(id) {
                    self.notify_expired(&expired).await;
                }
                return Err(GameError::AlreadyExpiredOrUnknown);
            }
            other => other?,
        };
        if let SubmitOutcome::Resolved(ref res) = outcome {
            tracing::info!(game = %id, outcome = ?res.outcome, "challenge resolved");
            let msg = res.message();
            self.notifier
                .notify(NotifyTarget::User(res.challenger), msg.clone())
                .await;
            self.notifier
                .notify(NotifyTarget::User(res.opponent), msg)
                .await;
        }
        Ok(outcome)
    }

    /// Evicts stale challenges and tells both players. Returns how many were evicted.
    pub async fn reap_expired(&self) -> usize {
        let expired = self.registry.reap_expired();
        for ch in &expired {
            self.notify_expired(ch).await;
        }
        if !expired.is_empty() {
            tracing::info!(
                count = expired.len(),
                remaining = self.registry.len(),
                "reaped expired challenges"
            );
        }
        expired.len()
    }

    /// Drops a challenge that can no longer be played, e.g. when a player cannot be DMed.
    pub fn cancel(&self, id: GameId) -> bool {
        let removed = self.registry.remove(id).is_some();
        if removed {
            tracing::info!(game = %id, "challenge cancelled");
        }
        removed
    }

    /// Runs `reap_expired` every `every` until the runtime shuts down.
    pub fn spawn_reaper(self: Arc<Self>, every: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                self.reap_expired().await;
            }
        })
    }

    async fn notify_expired(&self, ch: &Challenge) {
        tracing::info!(game = %ch.id, status = ?ch.status, chosen = ch.choices.len(), "challenge expired");
        let msg = format!(
            "⌛ The Rock Paper Scissors game between <@{}> and <@{}> expired before both players chose.",
            ch.challenger, ch.opponent
        );
        for user in [ch.challenger, ch.opponent] {
            self.notifier.notify(NotifyTarget::User(user), msg.clone()).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::notify::testing::RecordingNotifier;
    use super::Choice::*;

    const U1: UserId = UserId::new(1);
    const U2: UserId = UserId::new(2);
    const U3: UserId = UserId::new(3);

    fn coordinator(ttl: Duration) -> (ChallengeCoordinator, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::default());
        (ChallengeCoordinator::new(ttl, notifier.clone()), notifier)
    }

    #[test]
    fn decide_matches_beats_relation() {
        let beats = |a: Choice, b: Choice| {
            matches!((a, b), (Rock, Scissors) | (Paper, Rock) | (Scissors, Paper))
        };
        for a in Choice::ALL {
            for b in Choice::ALL {
                let expected = if a == b {
                    Outcome::Tie
                } else if beats(a, b) {
                    Outcome::ChallengerWins
                } else {
                    Outcome::OpponentWins
                };
                assert_eq!(decide(a, b), expected, "{a} vs {b}");
            }
        }
        assert_eq!(decide(Rock, Scissors), Outcome::ChallengerWins);
        assert_eq!(decide(Scissors, Rock), Outcome::OpponentWins);
    }

    #[test]
    fn choice_parses_names() {
        assert_eq!("rock".parse::<Choice>(), Ok(Rock));
        assert_eq!(" Scissors ".parse::<Choice>(), Ok(Scissors));
        assert_eq!("lizard".parse::<Choice>(), Err(GameError::UnknownChoice));
    }

    #[test]
    fn self_challenge_is_rejected() {
        let reg = GameRegistry::new(Duration::from_secs(60));
        assert_eq!(reg.create(U1, U1), Err(GameError::InvalidChallenge));
        assert!(reg.is_empty());
    }

    #[test]
    fn created_challenge_collects_choices() {
        let reg = GameRegistry::new(Duration::from_secs(60));
        let id = reg.create(U1, U2).unwrap();
        let ch = reg.get(id).unwrap();
        assert_eq!(ch.status, ChallengeStatus::Accepted);
        assert!(ch.choices.is_empty());
        assert_ne!(reg.create(U1, U2).unwrap(), id);
    }

    #[tokio::test]
    async fn full_protocol_scenario() {
        let (coord, notifier) = coordinator(Duration::from_secs(60));
        let gid = coord.create(U1, U2).unwrap();

        assert_eq!(coord.submit_choice(gid, U1, Rock).await, Ok(SubmitOutcome::Accepted));
        assert_eq!(
            coord.submit_choice(gid, U1, Paper).await,
            Err(GameError::AlreadySubmitted)
        );
        assert_eq!(
            coord.submit_choice(gid, U3, Paper).await,
            Err(GameError::NotAParticipant)
        );

        let res = match coord.submit_choice(gid, U2, Scissors).await {
            Ok(SubmitOutcome::Resolved(r)) => r,
            other => panic!("expected resolution, got {other:?}"),
        };
        assert_eq!(res.outcome, Outcome::ChallengerWins);
        assert_eq!(res.winner(), Some(U1));
        assert_eq!(res.challenger_choice, Rock);

        assert_eq!(
            coord.submit_choice(gid, U2, Rock).await,
            Err(GameError::AlreadyExpiredOrUnknown)
        );
        assert!(coord.registry().is_empty());

        let msgs = notifier.messages().await;
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].0, NotifyTarget::User(U1));
        assert_eq!(msgs[1].0, NotifyTarget::User(U2));
        assert!(msgs[0].1.contains("<@1> wins!"));
    }

    #[tokio::test]
    async fn opponent_first_tie() {
        let (coord, _) = coordinator(Duration::from_secs(60));
        let gid = coord.create(U1, U2).unwrap();
        coord.submit_choice(gid, U2, Paper).await.unwrap();
        match coord.submit_choice(gid, U1, Paper).await {
            Ok(SubmitOutcome::Resolved(r)) => {
                assert_eq!(r.outcome, Outcome::Tie);
                assert!(r.message().contains("It's a tie!"));
            }
            other => panic!("expected resolution, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_game_is_rejected() {
        let (coord, notifier) = coordinator(Duration::from_secs(60));
        assert_eq!(
            coord.submit_choice(Uuid::new_v4(), U1, Rock).await,
            Err(GameError::AlreadyExpiredOrUnknown)
        );
        assert!(notifier.messages().await.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_submissions_resolve_exactly_once() {
        for _ in 0..50 {
            let (coord, notifier) = coordinator(Duration::from_secs(60));
            let coord = Arc::new(coord);
            let gid = coord.create(U1, U2).unwrap();

            let mut tasks = Vec::new();
            for (user, choice) in [(U1, Rock), (U2, Paper), (U1, Scissors), (U2, Rock)] {
                let c = coord.clone();
                tasks.push(tokio::spawn(async move { c.submit_choice(gid, user, choice).await }));
            }
            let mut resolved = 0;
            for t in tasks {
                if let Ok(SubmitOutcome::Resolved(_)) = t.await.unwrap() {
                    resolved += 1;
                }
            }
            assert_eq!(resolved, 1);
            assert!(coord.registry().is_empty());
            assert_eq!(notifier.messages().await.len(), 2);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn half_finished_challenge_expires() {
        let (coord, notifier) = coordinator(Duration::from_secs(600));
        let gid = coord.create(U1, U2).unwrap();
        coord.submit_choice(gid, U1, Rock).await.unwrap();

        tokio::time::advance(Duration::from_secs(601)).await;
        assert_eq!(
            coord.submit_choice(gid, U2, Paper).await,
            Err(GameError::AlreadyExpiredOrUnknown)
        );
        assert!(coord.registry().is_empty());
        let msgs = notifier.messages().await;
        assert_eq!(msgs.len(), 2);
        assert!(msgs.iter().all(|(_, m)| m.contains("expired")));
    }

    #[tokio::test(start_paused = true)]
    async fn registry_submit_leaves_expired_game_for_notice() {
        let reg = GameRegistry::new(Duration::from_secs(60));
        let id = reg.create(U1, U2).unwrap();
        tokio::time::advance(Duration::from_secs(61)).await;

        assert_eq!(reg.submit(id, U1, Rock), Err(GameError::AlreadyExpiredOrUnknown));
        assert!(reg.get(id).is_some());
        let expired = reg.take_expired(id).unwrap();
        assert_eq!(expired.status, ChallengeStatus::Expired);
        assert!(reg.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn first_choice_after_expiry_still_notifies() {
        let (coord, notifier) = coordinator(Duration::from_secs(60));
        let gid = coord.create(U1, U2).unwrap();
        tokio::time::advance(Duration::from_secs(61)).await;

        assert_eq!(
            coord.submit_choice(gid, U2, Rock).await,
            Err(GameError::AlreadyExpiredOrUnknown)
        );
        let msgs = notifier.messages().await;
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].0, NotifyTarget::User(U1));
        assert_eq!(msgs[1].0, NotifyTarget::User(U2));
        // a second late press finds nothing and sends nothing
        assert_eq!(
            coord.submit_choice(gid, U1, Rock).await,
            Err(GameError::AlreadyExpiredOrUnknown)
        );
        assert_eq!(notifier.messages().await.len(), 2);
    }

    #[tokio::test]
    async fn cancelled_game_rejects_choices() {
        let (coord, notifier) = coordinator(Duration::from_secs(60));
        let gid = coord.create(U1, U2).unwrap();
        assert!(coord.cancel(gid));
        assert!(!coord.cancel(gid));
        assert_eq!(
            coord.submit_choice(gid, U1, Rock).await,
            Err(GameError::AlreadyExpiredOrUnknown)
        );
        assert!(notifier.messages().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn reaper_only_removes_stale_games() {
        let (coord, notifier) = coordinator(Duration::from_secs(60));
        let old = coord.create(U1, U2).unwrap();
        tokio::time::advance(Duration::from_secs(45)).await;
        let fresh = coord.create(U2, U3).unwrap();
        tokio::time::advance(Duration::from_secs(20)).await;

        assert_eq!(coord.reap_expired().await, 1);
        assert!(coord.registry().get(old).is_none());
        assert!(coord.registry().get(fresh).is_some());
        assert_eq!(notifier.messages().await.len(), 2);
        assert_eq!(coord.reap_expired().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn background_reaper_evicts_and_notifies() {
        let (coord, notifier) = coordinator(Duration::from_secs(30));
        let coord = Arc::new(coord);
        coord.create(U1, U2).unwrap();

        let task = coord.clone().spawn_reaper(Duration::from_secs(10));
        tokio::time::sleep(Duration::from_secs(45)).await;

        assert!(coord.registry().is_empty());
        assert_eq!(notifier.messages().await.len(), 2);
        task.abort();
    }
}
