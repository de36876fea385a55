//! Core practice engine: progress rules, question generation and session state machines.
//!
//! ## Module overview
//!
//! | Module         | Purpose |
//! |----------------|---------|
//! | `models`       | Shared types: the persisted `UserProgress` record, questions, summaries |
//! | `question`     | Operand drawing and exact answer checking |
//! | `progress`     | Streak rollover, practice days, mastery, premium, level path |
//! | `store`        | `ProgressStore` with write-through JSON persistence |
//! | `timers`       | Cancelable per-session timeouts on a virtual clock |
//! | `practice`     | Level / Timed / Free practice state machine |
//! | `arena`        | Divisions, simulated opponents and rated battles |
//! | `achievements` | Achievement catalogue and evaluator |
//! | `config`       | Data directory and storage key |
//! | `error`        | `StoreError` and `SessionError` |

pub mod achievements;
pub mod arena;
pub mod config;
pub mod error;
pub mod models;
pub mod practice;
pub mod progress;
pub mod question;
pub mod store;
pub mod timers;

// Re-export the public API surface so callers can use
// `practice_engine::ProgressStore` without reaching into sub-modules.
pub use achievements::{evaluate, Achievement, AchievementReport, Requirement, ACHIEVEMENTS};
pub use arena::{
    settle_battle, ArenaPhase, ArenaSession, Battle, BattleOutcome, BattleResult, Division,
    Opponent, Round, Settlement,
};
pub use config::StoreConfig;
pub use error::{SessionError, StoreError};
pub use models::{
    Feedback, LessonSummary, LevelStatus, PracticeMode, ProgressUpdate, Question, UserProgress,
};
pub use practice::{PracticePhase, PracticeSession, Run};
pub use question::{check_answer, generate, OperandRange};
pub use store::{FileBackend, MemoryBackend, ProgressStore, StorageBackend};
