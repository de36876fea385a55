//! # mathmaster_core
//!
//! The game rules behind MathMaster, a gamified multiplication trainer, as a plain library.
//!
//! Everything a front end needs to drive the app lives here; rendering does not. The crate
//! owns the learner's progress record (points, streak, mastered tables, Arena rating), the
//! practice and Arena session state machines, question generation, and achievements.
//!
//! ## How it works
//!
//! 1. Load a [`ProgressStore`] from a storage backend. Missing or corrupt data falls back
//!    to a fresh record, and a streak broken by two or more idle days is reset.
//! 2. Drive a [`PracticeSession`] (Level, Timed or Free) or an [`ArenaSession`] with the
//!    learner's answers. Each mutation is written straight through to storage.
//! 3. Feed elapsed time into the session's `tick` so feedback pauses, the timed countdown
//!    and matchmaking advance. `exit` cancels anything still pending.
//! 4. Project the record with [`evaluate`] for achievements or
//!    [`UserProgress::level_path`] for the home screen.
//!
//! ## Key features
//!
//! - **Exact arithmetic**: ten-digit × ten-digit products are computed as `u128` and typed
//!   answers are compared digit for digit.
//! - **Deterministic**: sessions take any `rand::Rng`; `seeded(Some(u64))` reproduces the
//!   same questions and opponents every time.
//! - **Tolerant persistence**: the JSON record loads with unknown fields ignored and
//!   missing ones defaulted, and writes are atomic.
//!
//! ## Quick start
//!
//! ```rust
//! use std::time::Duration;
//! use mathmaster_core::{MemoryBackend, PracticeMode, PracticeSession, ProgressStore};
//!
//! let mut store = ProgressStore::load(MemoryBackend::new());
//! let mut session = PracticeSession::seeded(Some(42));
//!
//! session.start(&mut store, PracticeMode::Level).unwrap();
//! let answer = session.current_question().unwrap().answer.to_string();
//! session.submit(&mut store, &answer).unwrap();
//! session.tick(&mut store, Duration::from_millis(1500)).unwrap();
//!
//! assert_eq!(store.progress().total_correct, 1);
//! assert_eq!(store.progress().streak, 1);
//! ```

pub mod practice_engine;

// Convenience re-exports so callers can use `mathmaster_core::ProgressStore`
// directly without reaching into `practice_engine::`.
pub use practice_engine::{
    check_answer, evaluate, generate, settle_battle, Achievement, AchievementReport, ArenaPhase,
    ArenaSession, Battle, BattleOutcome, BattleResult, Division, Feedback, FileBackend,
    LessonSummary, LevelStatus, MemoryBackend, OperandRange, Opponent, PracticeMode,
    PracticePhase, PracticeSession, ProgressStore, ProgressUpdate, Question, Requirement, Round,
    Run, SessionError, Settlement, StorageBackend, StoreConfig, StoreError, UserProgress,
    ACHIEVEMENTS,
};
