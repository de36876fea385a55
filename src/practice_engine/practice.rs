//! Practice session state machine.
//!
//! ```text
//! Select ──start──▶ Playing(Level | Timed | Free) ──▶ Results
//!                        │ (Level, hearts hit 0)
//!                        ▼
//!                   OutOfHearts ──ad / premium──▶ Playing (or Results if all ten were answered)
//! ```
//!
//! Answer bookkeeping (lifetime attempts, accuracy, session hearts) is applied the moment an
//! answer is submitted. Moving on to the next question happens when the feedback pause
//! ends, through the session's timer queue; lesson points and mastery are granted there.

use std::time::Duration;

use chrono::{DateTime, Local};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::practice_engine::{
    error::SessionError,
    models::{Feedback, LessonSummary, PracticeMode, Question, STARTING_HEARTS},
    question::{check_answer, generate, OperandRange},
    store::{ProgressStore, StorageBackend},
    timers::{TimerId, Timers, AD_DURATION, FEEDBACK_DELAY, TICK},
};

/// Questions in a Level or Free run.
pub const LESSON_LENGTH: u32 = 10;
/// Length of the timed challenge in one-second ticks.
pub const TIMED_SECONDS: u32 = 30;
/// Correct answers out of ten needed to master a table in Free practice.
pub const FREE_MASTERY_THRESHOLD: u32 = 8;
/// Operand ceiling for timed questions.
pub const TIMED_DIFFICULTY: u64 = 12;

pub const LESSON_POINTS_PER_CORRECT: u64 = 10;
pub const TIMED_POINTS_PER_CORRECT: u64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PracticeEvent {
    /// Feedback pause over; serve the next question or finish.
    Advance,
    /// One second of the timed challenge elapsed.
    Tick,
    /// Simulated ad finished playing.
    AdFinished,
}

/// Live state of a practice run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    pub mode: PracticeMode,
    pub question: Question,
    /// Answers submitted so far (the one under feedback included once it advances).
    pub questions_completed: u32,
    pub correct_answers: u32,
    /// Session heart pool; only Level mode spends it.
    pub hearts: u32,
    /// Seconds left; only meaningful in Timed mode.
    pub time_remaining: u32,
    /// Verdict on the last answer, shown until the next question is served.
    pub feedback: Option<Feedback>,
}

impl Run {
    pub fn timed_score(&self) -> u32 {
        if self.mode == PracticeMode::Timed { self.correct_answers } else { 0 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PracticePhase {
    Select,
    Playing(Run),
    /// Level run paused with an empty heart pool.
    OutOfHearts { run: Run, watching_ad: bool },
    Results(LessonSummary),
}

impl PracticePhase {
    pub fn name(&self) -> &'static str {
        match self {
            PracticePhase::Select             => "selecting a mode",
            PracticePhase::Playing(_)         => "playing",
            PracticePhase::OutOfHearts { .. } => "out of hearts",
            PracticePhase::Results(_)         => "showing results",
        }
    }
}

pub struct PracticeSession<R: Rng = StdRng> {
    phase: PracticePhase,
    rng: R,
    timers: Timers<PracticeEvent>,
    pending_advance: Option<TimerId>,
    pending_ad: Option<TimerId>,
}

impl PracticeSession<StdRng> {
    /// Deterministic with `Some(seed)`, entropy-seeded otherwise.
    pub fn seeded(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None       => StdRng::from_entropy(),
        };
        Self::new(rng)
    }
}

impl<R: Rng> PracticeSession<R> {
    pub fn new(rng: R) -> Self {
        Self {
            phase: PracticePhase::Select,
            rng,
            timers: Timers::new(),
            pending_advance: None,
            pending_ad: None,
        }
    }

    pub fn phase(&self) -> &PracticePhase {
        &self.phase
    }

    pub fn run(&self) -> Option<&Run> {
        match &self.phase {
            PracticePhase::Playing(run) | PracticePhase::OutOfHearts { run, .. } => Some(run),
            _ => None,
        }
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.run().map(|r| &r.question)
    }

    /// True while a feedback pause is running.
    pub fn awaiting_advance(&self) -> bool {
        self.pending_advance.is_some()
    }

    /// Number of timers this session still has queued.
    pub fn pending_timers(&self) -> usize {
        self.timers.pending()
    }

    /// How long until the next timer fires; a shell can sleep this long before `tick`.
    pub fn next_due(&self) -> Option<Duration> {
        self.timers.next_due()
    }

    /// Enter `mode` now. Counts today as a practice day.
    pub fn start<B: StorageBackend>(
        &mut self,
        store: &mut ProgressStore<B>,
        mode: PracticeMode,
    ) -> Result<(), SessionError> {
        self.start_at(store, mode, Local::now())
    }

    pub fn start_at<B: StorageBackend>(
        &mut self,
        store: &mut ProgressStore<B>,
        mode: PracticeMode,
        now: DateTime<Local>,
    ) -> Result<(), SessionError> {
        if !matches!(self.phase, PracticePhase::Select | PracticePhase::Results(_)) {
            return Err(self.wrong_phase("start a run"));
        }
        self.teardown();
        store.record_practice_start_at(now)?;

        let question = self.next_question(store, mode);
        self.phase = PracticePhase::Playing(Run {
            mode,
            question,
            questions_completed: 0,
            correct_answers: 0,
            hearts: STARTING_HEARTS,
            time_remaining: if mode == PracticeMode::Timed { TIMED_SECONDS } else { 0 },
            feedback: None,
        });
        if mode == PracticeMode::Timed {
            self.timers.schedule(TICK, PracticeEvent::Tick);
        }
        log::info!("[PRACTICE] start mode:{} table:{}", mode, store.progress().current_table);
        Ok(())
    }

    /// Submit the learner's typed answer.
    ///
    /// Empty input is ignored (`Ok(None)`); anything else is judged and the verdict returned.
    pub fn submit<B: StorageBackend>(
        &mut self,
        store: &mut ProgressStore<B>,
        raw: &str,
    ) -> Result<Option<Feedback>, SessionError> {
        if self.pending_advance.is_some() {
            return Err(SessionError::WrongPhase { action: "submit", phase: "showing feedback" });
        }
        let question = match &self.phase {
            PracticePhase::Playing(run) => run.question,
            _ => return Err(self.wrong_phase("submit")),
        };
        if raw.trim().is_empty() {
            return Ok(None);
        }

        let correct = check_answer(&question, raw);
        store.record_answer(correct)?;
        let premium = store.progress().is_premium;
        let feedback = Feedback::from_correct(correct);

        let phase = self.phase.name();
        let mode = match &mut self.phase {
            PracticePhase::Playing(run) => {
                run.feedback = Some(feedback);
                if correct {
                    run.correct_answers += 1;
                } else if run.mode == PracticeMode::Level && !premium {
                    run.hearts = run.hearts.saturating_sub(1);
                }
                run.mode
            }
            _ => return Err(SessionError::WrongPhase { action: "submit", phase }),
        };
        log::debug!("[PRACTICE] answer mode:{} correct:{}", mode, correct);

        if mode == PracticeMode::Timed && correct {
            // no pause on a correct timed answer
            let next = self.next_question(store, mode);
            if let PracticePhase::Playing(run) = &mut self.phase {
                run.questions_completed += 1;
                run.question = next;
            }
        } else {
            self.pending_advance = Some(self.timers.schedule(FEEDBACK_DELAY, PracticeEvent::Advance));
        }
        Ok(Some(feedback))
    }

    /// End the feedback pause right away instead of waiting for it.
    pub fn advance<B: StorageBackend>(
        &mut self,
        store: &mut ProgressStore<B>,
    ) -> Result<(), SessionError> {
        match self.pending_advance.take() {
            Some(id) => {
                self.timers.cancel(id);
                self.on_advance(store)
            }
            None => Err(SessionError::WrongPhase { action: "advance", phase: self.phase.name() }),
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
                PracticeEvent::Advance => {
                    self.pending_advance = None;
                    self.on_advance(store)?;
                }
                PracticeEvent::Tick => self.on_tick(store)?,
                PracticeEvent::AdFinished => {
                    self.pending_ad = None;
                    self.resume(store, 1)?;
                }
            }
        }
        self.timers.settle(deadline);
        Ok(())
    }

    /// Out of hearts: play the simulated ad; one heart is granted when it ends.
    pub fn watch_ad(&mut self) -> Result<(), SessionError> {
        let phase = self.phase.name();
        match &mut self.phase {
            PracticePhase::OutOfHearts { watching_ad, .. } if !*watching_ad => {
                *watching_ad = true;
                self.pending_ad = Some(self.timers.schedule(AD_DURATION, PracticeEvent::AdFinished));
                Ok(())
            }
            _ => Err(SessionError::WrongPhase { action: "watch an ad", phase }),
        }
    }

    /// Close the ad before it finished. No heart is granted; the next ad starts from zero.
    pub fn cancel_ad(&mut self) -> Result<(), SessionError> {
        let phase = self.phase.name();
        match &mut self.phase {
            PracticePhase::OutOfHearts { watching_ad, .. } if *watching_ad => {
                *watching_ad = false;
                if let Some(id) = self.pending_ad.take() {
                    self.timers.cancel(id);
                }
                log::debug!("[PRACTICE] ad dismissed early");
                Ok(())
            }
            _ => Err(SessionError::WrongPhase { action: "close the ad", phase }),
        }
    }

    /// Out of hearts: buy premium (simulated), refill the pool and carry on.
    pub fn purchase_premium<B: StorageBackend>(
        &mut self,
        store: &mut ProgressStore<B>,
    ) -> Result<(), SessionError> {
        if !matches!(self.phase, PracticePhase::OutOfHearts { .. }) {
            return Err(self.wrong_phase("refill hearts"));
        }
        store.purchase_premium()?;
        self.teardown();
        self.resume(store, STARTING_HEARTS)
    }

    /// Leave the session: pending timers are dropped and nothing further is applied.
    pub fn exit(&mut self) {
        self.teardown();
        self.phase = PracticePhase::Select;
    }

    // -----------------------------------------------------------------------

    fn teardown(&mut self) {
        self.timers.cancel_all();
        self.pending_advance = None;
        self.pending_ad = None;
    }

    fn wrong_phase(&self, action: &'static str) -> SessionError {
        SessionError::WrongPhase { action, phase: self.phase.name() }
    }

    fn next_question<B: StorageBackend>(&mut self, store: &ProgressStore<B>, mode: PracticeMode) -> Question {
        let range = match mode {
            PracticeMode::Level => OperandRange::table(store.progress().current_table),
            PracticeMode::Timed => OperandRange::up_to(TIMED_DIFFICULTY),
            PracticeMode::Free  => OperandRange::big_numbers(),
        };
        generate(&mut self.rng, range)
    }

    fn on_advance<B: StorageBackend>(&mut self, store: &mut ProgressStore<B>) -> Result<(), SessionError> {
        let PracticePhase::Playing(run) = &mut self.phase else {
            return Ok(());
        };
        run.questions_completed += 1;
        run.feedback = None;

        if run.mode == PracticeMode::Level && run.hearts == 0 {
            let run = run.clone();
            log::info!("[PRACTICE] out of hearts after {} questions", run.questions_completed);
            self.phase = PracticePhase::OutOfHearts { run, watching_ad: false };
            return Ok(());
        }
        if run.mode != PracticeMode::Timed && run.questions_completed >= LESSON_LENGTH {
            return self.complete_lesson(store);
        }
        let mode = run.mode;
        let next = self.next_question(store, mode);
        if let PracticePhase::Playing(run) = &mut self.phase {
            run.question = next;
        }
        Ok(())
    }

    fn on_tick<B: StorageBackend>(&mut self, store: &mut ProgressStore<B>) -> Result<(), SessionError> {
        let PracticePhase::Playing(run) = &mut self.phase else {
            return Ok(());
        };
        run.time_remaining = run.time_remaining.saturating_sub(1);
        if run.time_remaining > 0 {
            self.timers.schedule(TICK, PracticeEvent::Tick);
            return Ok(());
        }
        self.complete_timed(store)
    }

    /// Back to play with `hearts` more. If the answer that emptied the pool was the last
    /// one, the lesson is completed instead of serving another question.
    fn resume<B: StorageBackend>(&mut self, store: &mut ProgressStore<B>, hearts: u32) -> Result<(), SessionError> {
        let PracticePhase::OutOfHearts { run, .. } = &self.phase else {
            return Ok(());
        };
        let mut run = run.clone();
        run.hearts += hearts;
        log::info!("[PRACTICE] resumed with {} heart(s)", run.hearts);
        if run.questions_completed >= LESSON_LENGTH {
            self.phase = PracticePhase::Playing(run);
            return self.complete_lesson(store);
        }
        run.question = self.next_question(store, run.mode);
        self.phase = PracticePhase::Playing(run);
        Ok(())
    }

    fn complete_lesson<B: StorageBackend>(&mut self, store: &mut ProgressStore<B>) -> Result<(), SessionError> {
        let PracticePhase::Playing(run) = &self.phase else {
            return Ok(());
        };
        let mode = run.mode;
        let correct = run.correct_answers;
        let answered = run.questions_completed;
        let points = u64::from(correct) * LESSON_POINTS_PER_CORRECT;
        let earns_mastery = match mode {
            PracticeMode::Level => run.hearts > 0,
            PracticeMode::Free  => correct >= FREE_MASTERY_THRESHOLD,
            PracticeMode::Timed => false,
        };

        let newly_mastered = store.modify(|p| {
            p.total_points = p.total_points.saturating_add(points);
            if earns_mastery { p.master_current_table() } else { None }
        })?;

        log::info!(
            "[PRACTICE] complete mode:{} correct:{}/{} points:{} mastered:{:?}",
            mode, correct, answered, points, newly_mastered
        );
        self.phase = PracticePhase::Results(LessonSummary {
            mode,
            correct_answers: correct,
            questions_answered: answered,
            points_earned: points,
            newly_mastered,
        });
        Ok(())
    }

    fn complete_timed<B: StorageBackend>(&mut self, store: &mut ProgressStore<B>) -> Result<(), SessionError> {
        let PracticePhase::Playing(run) = &self.phase else {
            return Ok(());
        };
        let score = run.timed_score();
        let answered = run.questions_completed;
        let points = u64::from(score) * TIMED_POINTS_PER_CORRECT;

        self.teardown();
        store.add_points(points)?;
        log::info!("[PRACTICE] time up score:{} points:{}", score, points);
        self.phase = PracticePhase::Results(LessonSummary {
            mode: PracticeMode::Timed,
            correct_answers: score,
            questions_answered: answered,
            points_earned: points,
            newly_mastered: None,
        });
        Ok(())
    }
}
