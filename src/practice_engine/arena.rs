//! Arena: rating-gated divisions, a simulated opponent and a five-question battle.
//!
//! ```text
//! Lobby ──enter──▶ Matchmaking ──2.5s──▶ Battle ──5 rounds──▶ Results
//!   ▲                   ▲                                        │
//!   └──── back_to_lobby ┴──────────────── rematch ───────────────┘
//! ```

use std::fmt;
use std::time::Duration;

use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::practice_engine::{
    error::SessionError,
    models::{Feedback, Question, UserProgress},
    question::{check_answer, generate, OperandRange},
    store::{ProgressStore, StorageBackend},
    timers::{TimerId, Timers, FEEDBACK_DELAY, MATCHMAKING_DELAY},
};

/// Rating floor and ceiling for the learner.
pub const MIN_RATING: i32 = 800;
pub const MAX_RATING: i32 = 2500;
/// Synthetic opponents never rate above this.
pub const OPPONENT_MAX_RATING: i32 = 2200;
/// Opponent rating is the learner's plus or minus at most this much.
pub const OPPONENT_RATING_SPREAD: i32 = 100;
/// Cap on the chance a simulated opponent answers correctly.
pub const OPPONENT_MAX_ACCURACY: f64 = 0.95;

pub const BATTLE_LENGTH: u32 = 5;
pub const WIN_DELTA: i32 = 25;
pub const DRAW_DELTA: i32 = 0;
pub const LOSS_DELTA: i32 = -15;
pub const POINTS_PER_CORRECT: u64 = 20;

const OPPONENT_NAMES: [&str; 15] = [
    "MathWizard", "NumberNinja", "CalcMaster", "MultiplyKing", "AlgebraAce",
    "MathGenius", "QuickMath", "BrainPower", "MathStar", "NumberHero",
    "TimesTablePro", "MathChampion", "FastCalculator", "MathWhiz", "NumberCrusher",
];

const OPPONENT_AVATARS: [&str; 10] = ["🤖", "👾", "🎮", "🦊", "🐯", "🦁", "🐼", "🐨", "🐸", "🦉"];

// ---------------------------------------------------------------------------
// Divisions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Division {
    Bronze,
    Silver,
    Gold,
    Diamond,
}

impl fmt::Display for Division {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Division::Bronze  => write!(f, "Bronze"),
            Division::Silver  => write!(f, "Silver"),
            Division::Gold    => write!(f, "Gold"),
            Division::Diamond => write!(f, "Diamond"),
        }
    }
}

impl Division {
    pub const ALL: [Division; 4] = [Division::Bronze, Division::Silver, Division::Gold, Division::Diamond];

    pub fn min_rating(self) -> i32 {
        match self {
            Division::Bronze  => 0,
            Division::Silver  => 1200,
            Division::Gold    => 1500,
            Division::Diamond => 1800,
        }
    }

    /// Inclusive top of the band; Diamond is open-ended.
    pub fn max_rating(self) -> Option<i32> {
        match self {
            Division::Bronze  => Some(1199),
            Division::Silver  => Some(1499),
            Division::Gold    => Some(1799),
            Division::Diamond => None,
        }
    }

    /// Largest operand in this division's questions.
    pub fn difficulty(self) -> u64 {
        match self {
            Division::Bronze  => 5,
            Division::Silver  => 8,
            Division::Gold    => 10,
            Division::Diamond => 12,
        }
    }

    pub fn is_unlocked(self, rating: i32) -> bool {
        rating >= self.min_rating()
    }

    /// The division whose band contains `rating`.
    pub fn for_rating(rating: i32) -> Division {
        Division::ALL
            .into_iter()
            .rev()
            .find(|d| rating >= d.min_rating())
            .unwrap_or(Division::Bronze)
    }
}

// ---------------------------------------------------------------------------
// Opponents and settlement
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Opponent {
    pub name: String,
    pub rating: i32,
    pub avatar: String,
}

impl Opponent {
    /// Probability this opponent answers a round correctly.
    pub fn accuracy(&self) -> f64 {
        (f64::from(self.rating.max(0)) / f64::from(MAX_RATING)).min(OPPONENT_MAX_ACCURACY)
    }
}

/// A synthetic opponent rated near `user_rating`.
pub fn generate_opponent<R: Rng>(rng: &mut R, user_rating: i32) -> Opponent {
    let variation = rng.gen_range(-OPPONENT_RATING_SPREAD..=OPPONENT_RATING_SPREAD);
    let rating = (user_rating + variation).clamp(MIN_RATING, OPPONENT_MAX_RATING);
    Opponent {
        name: OPPONENT_NAMES.choose(rng).copied().unwrap_or("MathWizard").to_string(),
        rating,
        avatar: OPPONENT_AVATARS.choose(rng).copied().unwrap_or("🤖").to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BattleOutcome {
    Win,
    Draw,
    Loss,
}

impl BattleOutcome {
    pub fn from_scores(player: u32, opponent: u32) -> Self {
        match player.cmp(&opponent) {
            std::cmp::Ordering::Greater => BattleOutcome::Win,
            std::cmp::Ordering::Equal   => BattleOutcome::Draw,
            std::cmp::Ordering::Less    => BattleOutcome::Loss,
        }
    }

    pub fn rating_delta(self) -> i32 {
        match self {
            BattleOutcome::Win  => WIN_DELTA,
            BattleOutcome::Draw => DRAW_DELTA,
            BattleOutcome::Loss => LOSS_DELTA,
        }
    }
}

/// What a finished battle did to the learner's record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub outcome: BattleOutcome,
    pub rating_before: i32,
    pub rating_after: i32,
    pub points_earned: u64,
}

impl Settlement {
    pub fn rating_change(&self) -> i32 {
        self.rating_after - self.rating_before
    }
}

/// Apply a finished battle: clamp-adjust the rating, count the win or loss, award points.
pub fn settle_battle(progress: &mut UserProgress, player_score: u32, opponent_score: u32) -> Settlement {
    let outcome = BattleOutcome::from_scores(player_score, opponent_score);
    let rating_before = progress.arena_rating;
    let rating_after = rating_before
        .saturating_add(outcome.rating_delta())
        .clamp(MIN_RATING, MAX_RATING);
    let points_earned = u64::from(player_score) * POINTS_PER_CORRECT;

    progress.arena_rating = rating_after;
    match outcome {
        BattleOutcome::Win  => progress.arena_wins = progress.arena_wins.saturating_add(1),
        BattleOutcome::Loss => progress.arena_losses = progress.arena_losses.saturating_add(1),
        BattleOutcome::Draw => {}
    }
    progress.total_points = progress.total_points.saturating_add(points_earned);

    Settlement { outcome, rating_before, rating_after, points_earned }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArenaEvent {
    MatchFound,
    Advance,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Battle {
    pub division: Division,
    pub opponent: Opponent,
    pub question: Question,
    /// Zero-based round number.
    pub question_index: u32,
    pub player_score: u32,
    pub opponent_score: u32,
    pub feedback: Option<Feedback>,
}

/// One submitted round, as shown during the feedback pause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Round {
    pub player: Feedback,
    pub opponent_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleResult {
    pub division: Division,
    pub opponent: Opponent,
    pub player_score: u32,
    pub opponent_score: u32,
    pub settlement: Settlement,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArenaPhase {
    Lobby,
    Matchmaking { division: Division, opponent: Opponent },
    Battle(Battle),
    Results(BattleResult),
}

impl ArenaPhase {
    pub fn name(&self) -> &'static str {
        match self {
            ArenaPhase::Lobby              => "in the lobby",
            ArenaPhase::Matchmaking { .. } => "matchmaking",
            ArenaPhase::Battle(_)          => "in battle",
            ArenaPhase::Results(_)         => "showing results",
        }
    }
}

pub struct ArenaSession<R: Rng = StdRng> {
    phase: ArenaPhase,
    rng: R,
    timers: Timers<ArenaEvent>,
    pending_advance: Option<TimerId>,
}

impl ArenaSession<StdRng> {
    /// Deterministic with `Some(seed)`, entropy-seeded otherwise.
    pub fn seeded(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None       => StdRng::from_entropy(),
        };
        Self::new(rng)
    }
}

impl<R: Rng> ArenaSession<R> {
    pub fn new(rng: R) -> Self {
        Self {
            phase: ArenaPhase::Lobby,
            rng,
            timers: Timers::new(),
            pending_advance: None,
        }
    }

    pub fn phase(&self) -> &ArenaPhase {
        &self.phase
    }

    pub fn battle(&self) -> Option<&Battle> {
        match &self.phase {
            ArenaPhase::Battle(b) => Some(b),
            _ => None,
        }
    }

    pub fn awaiting_advance(&self) -> bool {
        self.pending_advance.is_some()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.pending()
    }

    /// How long until the next timer fires.
    pub fn next_due(&self) -> Option<Duration> {
        self.timers.next_due()
    }

    /// Lobby listing: every division with whether `progress` may enter it.
    pub fn divisions(progress: &UserProgress) -> Vec<(Division, bool)> {
        Division::ALL
            .into_iter()
            .map(|d| (d, d.is_unlocked(progress.arena_rating)))
            .collect()
    }

    /// Pick a division from the lobby and start matchmaking.
    pub fn enter<B: StorageBackend>(
        &mut self,
        store: &ProgressStore<B>,
        division: Division,
    ) -> Result<(), SessionError> {
        if !matches!(self.phase, ArenaPhase::Lobby) {
            return Err(self.wrong_phase("enter a division"));
        }
        self.matchmake(store.progress(), division)
    }

    /// Fight again in the same division against a fresh opponent.
    pub fn rematch<B: StorageBackend>(&mut self, store: &ProgressStore<B>) -> Result<(), SessionError> {
        let division = match &self.phase {
            ArenaPhase::Results(result) => result.division,
            _ => return Err(self.wrong_phase("rematch")),
        };
        self.matchmake(store.progress(), division)
    }

    pub fn back_to_lobby(&mut self) -> Result<(), SessionError> {
        if !matches!(self.phase, ArenaPhase::Results(_)) {
            return Err(self.wrong_phase("return to the lobby"));
        }
        self.phase = ArenaPhase::Lobby;
        Ok(())
    }

    /// Submit an answer for the current round; the opponent's answer is rolled at the same time.
    ///
    /// Empty input is ignored (`Ok(None)`).
    pub fn submit(&mut self, raw: &str) -> Result<Option<Round>, SessionError> {
        let phase = self.phase.name();
        if self.pending_advance.is_some() {
            return Err(SessionError::WrongPhase { action: "submit", phase: "showing feedback" });
        }
        let ArenaPhase::Battle(battle) = &mut self.phase else {
            return Err(SessionError::WrongPhase { action: "submit", phase });
        };
        if raw.trim().is_empty() {
            return Ok(None);
        }

        let player = Feedback::from_correct(check_answer(&battle.question, raw));
        let opponent_correct = self.rng.gen_bool(battle.opponent.accuracy());
        if player.is_correct() {
            battle.player_score += 1;
        }
        if opponent_correct {
            battle.opponent_score += 1;
        }
        battle.feedback = Some(player);
        log::debug!(
            "[ARENA] round:{} player:{:?} opponent:{} score:{}-{}",
            battle.question_index + 1, player, opponent_correct,
            battle.player_score, battle.opponent_score
        );

        self.pending_advance = Some(self.timers.schedule(FEEDBACK_DELAY, ArenaEvent::Advance));
        Ok(Some(Round { player, opponent_correct }))
    }

    /// End the feedback pause right away.
    pub fn advance<B: StorageBackend>(&mut self, store: &mut ProgressStore<B>) -> Result<(), SessionError> {
        match self.pending_advance.take() {
            Some(id) => {
                self.timers.cancel(id);
                self.on_advance(store)
            }
            None => Err(self.wrong_phase("advance")),
        }
    }

    /// Let `elapsed` wall time pass, firing whatever timers come due.
    pub fn tick<B: StorageBackend>(
        &mut self,
        store: &mut ProgressStore<B>,
        elapsed: Duration,
    ) -> Result<(), SessionError> {
        let deadline = self.timers.deadline_after(elapsed);
        while let Some(event) = self.timers.pop_until(deadline) {
            match event {
                ArenaEvent::MatchFound => self.on_match_found(),
                ArenaEvent::Advance => {
                    self.pending_advance = None;
                    self.on_advance(store)?;
                }
            }
        }
        self.timers.settle(deadline);
        Ok(())
    }

    /// Leave the Arena screen: timers are dropped, the battle is abandoned unsettled.
    pub fn exit(&mut self) {
        self.timers.cancel_all();
        self.pending_advance = None;
        self.phase = ArenaPhase::Lobby;
    }

    // -----------------------------------------------------------------------

    fn wrong_phase(&self, action: &'static str) -> SessionError {
        SessionError::WrongPhase { action, phase: self.phase.name() }
    }

    fn matchmake(&mut self, progress: &UserProgress, division: Division) -> Result<(), SessionError> {
        let rating = progress.arena_rating;
        if !division.is_unlocked(rating) {
            return Err(SessionError::DivisionLocked {
                division,
                required: division.min_rating(),
                rating,
            });
        }
        let opponent = generate_opponent(&mut self.rng, rating);
        log::info!(
            "[ARENA] matchmaking division:{} rating:{} opponent:{} ({})",
            division, rating, opponent.name, opponent.rating
        );
        self.timers.cancel_all();
        self.pending_advance = None;
        self.timers.schedule(MATCHMAKING_DELAY, ArenaEvent::MatchFound);
        self.phase = ArenaPhase::Matchmaking { division, opponent };
        Ok(())
    }

    fn on_match_found(&mut self) {
        let ArenaPhase::Matchmaking { division, opponent } = &self.phase else {
            return;
        };
        let division = *division;
        let opponent = opponent.clone();
        let question = generate(&mut self.rng, OperandRange::up_to(division.difficulty()));
        self.phase = ArenaPhase::Battle(Battle {
            division,
            opponent,
            question,
            question_index: 0,
            player_score: 0,
            opponent_score: 0,
            feedback: None,
        });
    }

    fn on_advance<B: StorageBackend>(&mut self, store: &mut ProgressStore<B>) -> Result<(), SessionError> {
        let ArenaPhase::Battle(battle) = &mut self.phase else {
            return Ok(());
        };
        battle.feedback = None;
        battle.question_index += 1;
        if battle.question_index < BATTLE_LENGTH {
            battle.question = generate(&mut self.rng, OperandRange::up_to(battle.division.difficulty()));
            return Ok(());
        }

        let (player_score, opponent_score) = (battle.player_score, battle.opponent_score);
        let division = battle.division;
        let opponent = battle.opponent.clone();
        let settlement = store.modify(|p| settle_battle(p, player_score, opponent_score))?;
        log::info!(
            "[ARENA] result division:{} score:{}-{} outcome:{:?} rating:{}→{}",
            division, player_score, opponent_score, settlement.outcome,
            settlement.rating_before, settlement.rating_after
        );
        self.phase = ArenaPhase::Results(BattleResult {
            division,
            opponent,
            player_score,
            opponent_score,
            settlement,
        });
        Ok(())
    }
}
