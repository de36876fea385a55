//! Multiplication question generation and answer checking.
//!
//! Operands are `u64` and products `u128`, so every product of two operands is exact and
//! a typed answer is compared digit-for-digit; no float ever sits on the path.

use rand::Rng;

use crate::practice_engine::models::{Question, MAX_TABLE};

/// Operand band for free practice: ten-digit numbers.
pub const FREE_OPERAND_MIN: u64 = 1_000_000_000;
pub const FREE_OPERAND_MAX: u64 = 9_999_999_999;

/// How operands are drawn for one question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandRange {
    /// Both operands uniform in `min..=max`.
    Uniform { min: u64, max: u64 },
    /// `table × k` with `k` uniform in `1..=max_multiplier`.
    Table { table: u64, max_multiplier: u64 },
}

impl OperandRange {
    /// Both operands in `1..=difficulty` (timed practice and Arena).
    pub fn up_to(difficulty: u64) -> Self {
        OperandRange::Uniform { min: 1, max: difficulty.max(1) }
    }

    /// Drill on one table, multipliers `1..=12`.
    pub fn table(table: u8) -> Self {
        OperandRange::Table {
            table: u64::from(table),
            max_multiplier: u64::from(MAX_TABLE),
        }
    }

    /// Ten-digit operands for free practice.
    pub fn big_numbers() -> Self {
        OperandRange::Uniform { min: FREE_OPERAND_MIN, max: FREE_OPERAND_MAX }
    }
}

/// Build a question from two operands.
pub fn question(num1: u64, num2: u64) -> Question {
    Question {
        num1,
        num2,
        answer: u128::from(num1) * u128::from(num2),
    }
}

/// Draw operands independently from `range` and compute the exact product.
pub fn generate<R: Rng>(rng: &mut R, range: OperandRange) -> Question {
    match range {
        OperandRange::Uniform { min, max } => {
            let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
            question(rng.gen_range(lo..=hi), rng.gen_range(lo..=hi))
        }
        OperandRange::Table { table, max_multiplier } => {
            question(table, rng.gen_range(1..=max_multiplier.max(1)))
        }
    }
}

/// Parse `raw` as a non-negative integer and compare it to the exact answer.
///
/// Empty, non-numeric, negative or oversized input is simply wrong, never an error.
pub fn check_answer(question: &Question, raw: &str) -> bool {
    raw.trim()
        .parse::<u128>()
        .map(|given| given == question.answer)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn uniform_operands_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let q = generate(&mut rng, OperandRange::up_to(5));
            assert!((1..=5).contains(&q.num1));
            assert!((1..=5).contains(&q.num2));
            assert_eq!(q.answer, u128::from(q.num1 * q.num2));
        }
    }

    #[test]
    fn table_questions_fix_first_operand() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..200 {
            let q = generate(&mut rng, OperandRange::table(7));
            assert_eq!(q.num1, 7);
            assert!((1..=12).contains(&q.num2));
        }
    }

    #[test]
    fn big_number_questions_have_ten_digit_operands() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..100 {
            let q = generate(&mut rng, OperandRange::big_numbers());
            assert_eq!(q.num1.to_string().len(), 10);
            assert_eq!(q.num2.to_string().len(), 10);
        }
    }

    #[test]
    fn large_product_is_exact_and_accepted() {
        let q = question(9_876_543_210, 9_999_999_967);
        assert_eq!(q.answer, 98_765_431_774_074_074_070);
        assert!(check_answer(&q, "98765431774074074070"));
        // one off in the last digit, which a float comparison could not tell apart
        assert!(!check_answer(&q, "98765431774074074071"));
    }

    #[test]
    fn maximal_operands_do_not_overflow() {
        let q = question(FREE_OPERAND_MAX, FREE_OPERAND_MAX);
        assert_eq!(q.answer, 99_999_999_980_000_000_001);
        assert!(check_answer(&q, &q.answer.to_string()));
    }

    #[test]
    fn unparsable_input_is_wrong_not_an_error() {
        let q = question(6, 7);
        assert!(!check_answer(&q, ""));
        assert!(!check_answer(&q, "   "));
        assert!(!check_answer(&q, "forty-two"));
        assert!(!check_answer(&q, "42abc"));
        assert!(!check_answer(&q, "-42"));
        assert!(!check_answer(&q, "4.2e1"));
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        let q = question(6, 7);
        assert!(check_answer(&q, " 42\n"));
        assert!(!check_answer(&q, "41"));
    }
}
