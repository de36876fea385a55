use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lowest multiplication table on the level path.
pub const MIN_TABLE: u8 = 1;
/// Highest multiplication table on the level path.
pub const MAX_TABLE: u8 = 12;

/// Rating every new learner starts the Arena with.
pub const INITIAL_RATING: i32 = 1000;
/// Session heart pool, and the persisted `hearts` value of a fresh record.
pub const STARTING_HEARTS: u32 = 5;
/// Persisted `hearts` value once premium has been purchased.
pub const PREMIUM_HEARTS: u32 = 999;

// ---------------------------------------------------------------------------
// Persisted progress record
// ---------------------------------------------------------------------------

/// The learner's cumulative state; one JSON record under the storage key.
///
/// Field names follow the persisted camelCase shape (`totalPoints`, `lastPracticeDate`, ...).
/// Every field is optional on the way in: missing ones take their default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProgress {
    pub total_points: u64,
    pub streak: u32,
    /// Instant the last counted practice day began; persisted as RFC 3339 or `""`.
    #[serde(with = "practice_date")]
    pub last_practice_date: Option<DateTime<Utc>>,
    /// Entries that are not a table number in 1..=12 are dropped on the way in.
    #[serde(with = "mastered_tables")]
    pub mastered_tables: BTreeSet<u8>,
    pub current_table: u8,
    pub total_correct: u64,
    pub total_attempts: u64,
    pub arena_rating: i32,
    pub arena_wins: u32,
    pub arena_losses: u32,
    pub is_premium: bool,
    pub hearts: u32,
}

impl Default for UserProgress {
    fn default() -> Self {
        Self {
            total_points: 0,
            streak: 0,
            last_practice_date: None,
            mastered_tables: BTreeSet::new(),
            current_table: MIN_TABLE,
            total_correct: 0,
            total_attempts: 0,
            arena_rating: INITIAL_RATING,
            arena_wins: 0,
            arena_losses: 0,
            is_premium: false,
            hearts: STARTING_HEARTS,
        }
    }
}

/// A shallow partial update: `Some` fields replace the current value wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub total_points: Option<u64>,
    pub streak: Option<u32>,
    pub last_practice_date: Option<Option<DateTime<Utc>>>,
    pub mastered_tables: Option<BTreeSet<u8>>,
    pub current_table: Option<u8>,
    pub total_correct: Option<u64>,
    pub total_attempts: Option<u64>,
    pub arena_rating: Option<i32>,
    pub arena_wins: Option<u32>,
    pub arena_losses: Option<u32>,
    pub is_premium: Option<bool>,
    pub hearts: Option<u32>,
}

/// `lastPracticeDate` codec. Empty strings, nulls and anything unparsable read as no date.
mod practice_date {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn serialize<S: Serializer>(date: &Option<DateTime<Utc>>, s: S) -> Result<S::Ok, S::Error> {
        match date {
            Some(d) => s.serialize_str(&d.to_rfc3339()),
            None => s.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw = Value::deserialize(d)?;
        Ok(match raw {
            Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            _ => None,
        })
    }
}

/// `masteredTables` codec. A non-array, or any entry outside the level path, is skipped.
mod mastered_tables {
    use std::collections::BTreeSet;

    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    use super::{MAX_TABLE, MIN_TABLE};

    pub fn serialize<S: Serializer>(tables: &BTreeSet<u8>, s: S) -> Result<S::Ok, S::Error> {
        s.collect_seq(tables)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<BTreeSet<u8>, D::Error> {
        let raw = Value::deserialize(d)?;
        let Value::Array(items) = raw else {
            return Ok(BTreeSet::new());
        };
        Ok(items
            .iter()
            .filter_map(Value::as_u64)
            .filter(|t| (u64::from(MIN_TABLE)..=u64::from(MAX_TABLE)).contains(t))
            .filter_map(|t| u8::try_from(t).ok())
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Questions
// ---------------------------------------------------------------------------

/// One multiplication problem. `answer` is exact for any pair of `u64` operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub num1: u64,
    pub num2: u64,
    pub answer: u128,
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} × {}", self.num1, self.num2)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Feedback {
    Correct,
    Incorrect,
}

impl Feedback {
    pub fn from_correct(correct: bool) -> Self {
        if correct {
            Feedback::Correct
        } else {
            Feedback::Incorrect
        }
    }

    pub fn is_correct(self) -> bool {
        self == Feedback::Correct
    }
}

// ---------------------------------------------------------------------------
// Practice metadata
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PracticeMode {
    /// Ten questions on the current table, five hearts.
    Level,
    /// Thirty-second sprint.
    Timed,
    /// Ten big-number questions, no hearts.
    Free,
}

impl fmt::Display for PracticeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PracticeMode::Level => write!(f, "Level"),
            PracticeMode::Timed => write!(f, "Timed Challenge"),
            PracticeMode::Free  => write!(f, "Free Practice"),
        }
    }
}

/// What a finished practice run earned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonSummary {
    pub mode: PracticeMode,
    pub correct_answers: u32,
    pub questions_answered: u32,
    pub points_earned: u64,
    /// Table added to `masteredTables` by this run, if any.
    pub newly_mastered: Option<u8>,
}

/// Where a table sits on the home-screen level path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LevelStatus {
    Mastered,
    Current,
    Unlocked,
    Locked,
}

impl fmt::Display for LevelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LevelStatus::Mastered => write!(f, "Mastered"),
            LevelStatus::Current  => write!(f, "Current"),
            LevelStatus::Unlocked => write!(f, "Available"),
            LevelStatus::Locked   => write!(f, "Locked"),
        }
    }
}
