//! Achievement catalogue and evaluator.
//!
//! Unlock state is never stored: every read re-evaluates each predicate against the
//! current record.

use serde::Serialize;

use crate::practice_engine::models::UserProgress;

/// Threshold an achievement checks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Requirement {
    StreakAtLeast(u32),
    PointsAtLeast(u64),
    TablesMasteredAtLeast(usize),
    CorrectAtLeast(u64),
    /// Lifetime accuracy (0.0..=1.0); needs at least one attempt.
    AccuracyAtLeast(f64),
    AttemptsAtLeast(u64),
}

impl Requirement {
    pub fn is_met(self, p: &UserProgress) -> bool {
        match self {
            Requirement::StreakAtLeast(n)         => p.streak >= n,
            Requirement::PointsAtLeast(n)         => p.total_points >= n,
            Requirement::TablesMasteredAtLeast(n) => p.mastered_tables.len() >= n,
            Requirement::CorrectAtLeast(n)        => p.total_correct >= n,
            Requirement::AccuracyAtLeast(ratio)   => {
                p.total_attempts > 0
                    && p.total_correct as f64 / p.total_attempts as f64 >= ratio
            }
            Requirement::AttemptsAtLeast(n)       => p.total_attempts >= n,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Achievement {
    pub id: u32,
    pub emoji: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub requirement: Requirement,
}

const fn ach(
    id: u32,
    emoji: &'static str,
    title: &'static str,
    description: &'static str,
    requirement: Requirement,
) -> Achievement {
    Achievement { id, emoji, title, description, requirement }
}

/// Every achievement, in display order.
pub const ACHIEVEMENTS: [Achievement; 18] = [
    ach(1,  "🔥", "First Streak",    "Practice for 1 day",       Requirement::StreakAtLeast(1)),
    ach(2,  "⭐", "Star Student",    "Earn 100 points",          Requirement::PointsAtLeast(100)),
    ach(3,  "🏆", "First Master",    "Master your first table",  Requirement::TablesMasteredAtLeast(1)),
    ach(4,  "💯", "Perfect Score",   "Get 10/10 correct",        Requirement::CorrectAtLeast(10)),
    ach(5,  "🎯", "Sharp Shooter",   "80% accuracy overall",     Requirement::AccuracyAtLeast(0.8)),
    ach(6,  "🌟", "Rising Star",     "Earn 500 points",          Requirement::PointsAtLeast(500)),
    ach(7,  "💪", "Dedicated",       "7 day streak",             Requirement::StreakAtLeast(7)),
    ach(8,  "🚀", "Sky Rocket",      "Earn 1000 points",         Requirement::PointsAtLeast(1000)),
    ach(9,  "🎓", "Scholar",         "Master 5 tables",          Requirement::TablesMasteredAtLeast(5)),
    ach(10, "👑", "Math Royalty",    "Master 10 tables",         Requirement::TablesMasteredAtLeast(10)),
    ach(11, "⚡", "Lightning Fast",  "Answer 50 questions",      Requirement::AttemptsAtLeast(50)),
    ach(12, "🔮", "Math Wizard",     "Master all 12 tables",     Requirement::TablesMasteredAtLeast(12)),
    ach(13, "🌈", "Rainbow Streak",  "14 day streak",            Requirement::StreakAtLeast(14)),
    ach(14, "💎", "Diamond Mind",    "Earn 2000 points",         Requirement::PointsAtLeast(2000)),
    ach(15, "🎪", "Practice Master", "Answer 100 questions",     Requirement::AttemptsAtLeast(100)),
    ach(16, "🧠", "Big Brain",       "95% accuracy",             Requirement::AccuracyAtLeast(0.95)),
    ach(17, "🌊", "Unstoppable",     "30 day streak",            Requirement::StreakAtLeast(30)),
    ach(18, "🎉", "Party Time",      "Earn 5000 points",         Requirement::PointsAtLeast(5000)),
];

/// Achievements split by whether `progress` currently meets them; both keep catalogue order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AchievementReport {
    pub unlocked: Vec<Achievement>,
    pub locked: Vec<Achievement>,
}

impl AchievementReport {
    pub fn total(&self) -> usize {
        self.unlocked.len() + self.locked.len()
    }
}

pub fn evaluate(progress: &UserProgress) -> AchievementReport {
    evaluate_with(progress, &ACHIEVEMENTS)
}

/// Evaluate an arbitrary catalogue.
pub fn evaluate_with(progress: &UserProgress, catalogue: &[Achievement]) -> AchievementReport {
    let (unlocked, locked): (Vec<_>, Vec<_>) = catalogue
        .iter()
        .copied()
        .partition(|a| a.requirement.is_met(progress));
    AchievementReport { unlocked, locked }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(list: &[Achievement]) -> Vec<u32> {
        list.iter().map(|a| a.id).collect()
    }

    #[test]
    fn fresh_learner_has_nothing() {
        let report = evaluate(&UserProgress::default());
        assert!(report.unlocked.is_empty());
        assert_eq!(report.locked.len(), 18);
    }

    #[test]
    fn catalogue_ids_are_ordered() {
        assert_eq!(ids(&ACHIEVEMENTS), (1..=18).collect::<Vec<_>>());
    }

    #[test]
    fn thresholds_unlock_in_order() {
        let mut p = UserProgress {
            streak: 7,
            total_points: 600,
            total_correct: 45,
            total_attempts: 50,
            ..UserProgress::default()
        };
        p.mastered_tables.extend([1, 2]);
        let report = evaluate(&p);
        assert_eq!(ids(&report.unlocked), vec![1, 2, 3, 4, 5, 6, 7, 11]);
        assert_eq!(report.total(), 18);
    }

    #[test]
    fn accuracy_needs_attempts() {
        let p = UserProgress::default();
        assert!(!Requirement::AccuracyAtLeast(0.0).is_met(&p));
    }

    #[test]
    fn accuracy_boundary_is_inclusive() {
        let p = UserProgress { total_correct: 19, total_attempts: 20, ..UserProgress::default() };
        assert!(Requirement::AccuracyAtLeast(0.95).is_met(&p));
        let p = UserProgress { total_correct: 18, total_attempts: 20, ..UserProgress::default() };
        assert!(!Requirement::AccuracyAtLeast(0.95).is_met(&p));
    }

    #[test]
    fn reevaluated_on_every_call() {
        let mut p = UserProgress { total_correct: 8, total_attempts: 10, ..UserProgress::default() };
        assert!(ids(&evaluate(&p).unlocked).contains(&5));
        p.total_attempts = 20;
        assert!(!ids(&evaluate(&p).unlocked).contains(&5));
    }
}
