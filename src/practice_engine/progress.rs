//! Rules over the progress record: streak rollover, practice days, mastery, premium,
//! and the level-path projection shown on the home screen.

use chrono::{DateTime, Local, NaiveDate, Utc};

use crate::practice_engine::models::{
    LevelStatus, ProgressUpdate, UserProgress, MAX_TABLE, MIN_TABLE, PREMIUM_HEARTS,
};
use crate::practice_engine::arena::{MAX_RATING, MIN_RATING};

impl UserProgress {
    /// Local calendar day of the last counted practice, if any.
    pub fn last_practice_day(&self) -> Option<NaiveDate> {
        self.last_practice_date
            .map(|d| d.with_timezone(&Local).date_naive())
    }

    /// Reset the streak if the last practice day is neither `today` nor yesterday.
    ///
    /// Returns true when the streak was reset.
    pub fn apply_streak_rollover(&mut self, today: NaiveDate) -> bool {
        let yesterday = today.pred_opt();
        let still_alive = match self.last_practice_day() {
            Some(day) => day == today || Some(day) == yesterday,
            None => false,
        };
        if still_alive || self.streak == 0 {
            return false;
        }
        self.streak = 0;
        true
    }

    /// Count `now` as a practice day. Idempotent within one calendar day.
    ///
    /// Returns true when the record changed.
    pub fn register_practice_day(&mut self, now: DateTime<Local>) -> bool {
        let today = now.date_naive();
        let last = self.last_practice_day();
        if last == Some(today) {
            return false;
        }
        self.streak = if last.is_some() && last == today.pred_opt() {
            self.streak.saturating_add(1)
        } else {
            1
        };
        self.last_practice_date = Some(now.with_timezone(&Utc));
        true
    }

    pub fn is_mastered(&self, table: u8) -> bool {
        self.mastered_tables.contains(&table)
    }

    /// Mark `currentTable` mastered and move on to the next one (capped at 12).
    ///
    /// Returns the newly mastered table, or `None` if it was already mastered.
    pub fn master_current_table(&mut self) -> Option<u8> {
        let table = self.current_table;
        if !self.mastered_tables.insert(table) {
            return None;
        }
        self.current_table = (table + 1).min(MAX_TABLE);
        Some(table)
    }

    /// Turn premium on. The persisted heart counter becomes the premium sentinel.
    pub fn activate_premium(&mut self) -> bool {
        let changed = !self.is_premium || self.hearts != PREMIUM_HEARTS;
        self.is_premium = true;
        self.hearts = PREMIUM_HEARTS;
        changed
    }

    /// Lifetime accuracy rounded to a whole percent; 0 before the first attempt.
    pub fn accuracy_percent(&self) -> u32 {
        if self.total_attempts == 0 {
            return 0;
        }
        let ratio = self.total_correct as f64 / self.total_attempts as f64;
        (ratio * 100.0).round() as u32
    }

    pub fn level_status(&self, table: u8) -> LevelStatus {
        if self.is_mastered(table) {
            LevelStatus::Mastered
        } else if table == self.current_table {
            LevelStatus::Current
        } else if table < self.current_table {
            LevelStatus::Unlocked
        } else {
            LevelStatus::Locked
        }
    }

    /// Status of every table from 1 to 12, in path order.
    pub fn level_path(&self) -> Vec<(u8, LevelStatus)> {
        (MIN_TABLE..=MAX_TABLE)
            .map(|t| (t, self.level_status(t)))
            .collect()
    }

    /// Shallow merge: every `Some` field replaces the current value, then invariants are restored.
    pub fn apply(&mut self, update: ProgressUpdate) {
        let ProgressUpdate {
            total_points,
            streak,
            last_practice_date,
            mastered_tables,
            current_table,
            total_correct,
            total_attempts,
            arena_rating,
            arena_wins,
            arena_losses,
            is_premium,
            hearts,
        } = update;

        if let Some(v) = total_points { self.total_points = v; }
        if let Some(v) = streak { self.streak = v; }
        if let Some(v) = last_practice_date { self.last_practice_date = v; }
        if let Some(v) = mastered_tables { self.mastered_tables = v; }
        if let Some(v) = current_table { self.current_table = v; }
        if let Some(v) = total_correct { self.total_correct = v; }
        if let Some(v) = total_attempts { self.total_attempts = v; }
        if let Some(v) = arena_rating { self.arena_rating = v; }
        if let Some(v) = arena_wins { self.arena_wins = v; }
        if let Some(v) = arena_losses { self.arena_losses = v; }
        // premium is one-way
        if let Some(v) = is_premium { self.is_premium |= v; }
        if let Some(v) = hearts { self.hearts = v; }

        self.normalize();
    }

    /// Pull out-of-range values back inside the record's invariants.
    ///
    /// Returns true if anything had to be corrected.
    pub fn normalize(&mut self) -> bool {
        let before = self.clone();

        self.current_table = self.current_table.clamp(MIN_TABLE, MAX_TABLE);
        self.mastered_tables
            .retain(|t| (MIN_TABLE..=MAX_TABLE).contains(t));
        self.arena_rating = self.arena_rating.clamp(MIN_RATING, MAX_RATING);
        self.total_correct = self.total_correct.min(self.total_attempts);

        *self != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn noon(y: i32, m: u32, d: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn practiced(at: DateTime<Local>, streak: u32) -> UserProgress {
        UserProgress {
            streak,
            last_practice_date: Some(at.with_timezone(&Utc)),
            ..UserProgress::default()
        }
    }

    #[test]
    fn rollover_keeps_streak_after_one_day() {
        let now = noon(2024, 5, 10);
        let mut p = practiced(now - Duration::days(1), 4);
        assert!(!p.apply_streak_rollover(now.date_naive()));
        assert_eq!(p.streak, 4);
    }

    #[test]
    fn rollover_resets_after_two_days() {
        let now = noon(2024, 5, 10);
        let mut p = practiced(now - Duration::days(2), 4);
        assert!(p.apply_streak_rollover(now.date_naive()));
        assert_eq!(p.streak, 0);
    }

    #[test]
    fn rollover_without_a_date_clears_streak() {
        let mut p = UserProgress { streak: 2, ..UserProgress::default() };
        assert!(p.apply_streak_rollover(noon(2024, 5, 10).date_naive()));
        assert_eq!(p.streak, 0);
    }

    #[test]
    fn first_practice_starts_streak_at_one() {
        let mut p = UserProgress::default();
        assert!(p.register_practice_day(noon(2024, 5, 10)));
        assert_eq!(p.streak, 1);
        assert_eq!(p.last_practice_day(), Some(noon(2024, 5, 10).date_naive()));
    }

    #[test]
    fn consecutive_day_extends_streak() {
        let now = noon(2024, 5, 10);
        let mut p = practiced(now - Duration::days(1), 3);
        assert!(p.register_practice_day(now));
        assert_eq!(p.streak, 4);
    }

    #[test]
    fn gap_restarts_streak() {
        let now = noon(2024, 5, 10);
        let mut p = practiced(now - Duration::days(3), 9);
        assert!(p.register_practice_day(now));
        assert_eq!(p.streak, 1);
    }

    #[test]
    fn same_day_is_idempotent() {
        let mut p = practiced(noon(2024, 5, 10), 5);
        let snapshot = p.clone();
        let later = Local.with_ymd_and_hms(2024, 5, 10, 20, 30, 0).unwrap();
        assert!(!p.register_practice_day(later));
        assert_eq!(p, snapshot);
    }

    #[test]
    fn mastering_advances_until_twelve() {
        let mut p = UserProgress { current_table: 11, ..UserProgress::default() };
        assert_eq!(p.master_current_table(), Some(11));
        assert_eq!(p.current_table, 12);
        assert_eq!(p.master_current_table(), Some(12));
        assert_eq!(p.current_table, 12);
        assert_eq!(p.master_current_table(), None);
        assert_eq!(p.mastered_tables.len(), 2);
    }

    #[test]
    fn level_path_statuses() {
        let mut p = UserProgress::default();
        p.master_current_table();
        p.master_current_table();
        let path = p.level_path();
        assert_eq!(path.len(), 12);
        assert_eq!(path[0], (1, LevelStatus::Mastered));
        assert_eq!(path[1], (2, LevelStatus::Mastered));
        assert_eq!(path[2], (3, LevelStatus::Current));
        assert_eq!(path[3], (4, LevelStatus::Locked));
    }

    #[test]
    fn skipped_table_below_current_is_unlocked() {
        let p = UserProgress { current_table: 4, ..UserProgress::default() };
        assert_eq!(p.level_status(2), LevelStatus::Unlocked);
    }

    #[test]
    fn accuracy_rounds() {
        let mut p = UserProgress::default();
        assert_eq!(p.accuracy_percent(), 0);
        p.total_attempts = 3;
        p.total_correct = 2;
        assert_eq!(p.accuracy_percent(), 67);
    }

    #[test]
    fn apply_replaces_sets_wholesale() {
        let mut p = UserProgress::default();
        p.mastered_tables.extend([1, 2, 3]);
        p.apply(ProgressUpdate {
            mastered_tables: Some([5].into_iter().collect()),
            total_points: Some(70),
            ..ProgressUpdate::default()
        });
        assert_eq!(p.mastered_tables.iter().copied().collect::<Vec<_>>(), vec![5]);
        assert_eq!(p.total_points, 70);
    }

    #[test]
    fn apply_never_revokes_premium() {
        let mut p = UserProgress::default();
        p.activate_premium();
        p.apply(ProgressUpdate { is_premium: Some(false), ..ProgressUpdate::default() });
        assert!(p.is_premium);
        assert_eq!(p.hearts, PREMIUM_HEARTS);
    }

    #[test]
    fn normalize_restores_invariants() {
        let mut p = UserProgress {
            current_table: 40,
            arena_rating: 3100,
            total_correct: 12,
            total_attempts: 10,
            ..UserProgress::default()
        };
        p.mastered_tables.extend([0, 4, 13, 200]);
        assert!(p.normalize());
        assert_eq!(p.current_table, 12);
        assert_eq!(p.arena_rating, 2500);
        assert_eq!(p.total_correct, 10);
        assert_eq!(p.mastered_tables.iter().copied().collect::<Vec<_>>(), vec![4]);
        assert!(!p.normalize());
    }
}
