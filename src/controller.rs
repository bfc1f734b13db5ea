use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use crate::context::{AppContext, Identity};
use crate::error::ConfigError;
use crate::session::{Phase, SessionConfig, SessionResult, SessionState};
use crate::store::PendingResult;
use crate::typing_policy::{self, WordOutcome};
use crate::util::time_diff_ms;
use crate::words::{shuffled, WordBank};

/// Source of wall-clock time for the session timer
pub trait Clock {
    fn now(&self) -> SystemTime;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<SystemTime>>,
}

impl ManualClock {
    pub fn new(start: SystemTime) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += by;
        }
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(SystemTime::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> SystemTime {
        self.now
            .lock()
            .map(|now| *now)
            .unwrap_or_else(|poisoned| *poisoned.into_inner())
    }
}

/// Receives finished results for persistence. Implementations must not block.
pub trait ResultSink {
    fn submit(&self, pending: PendingResult);
}

/// Drives one timed typing test at a time through Idle -> Running -> Finished.
///
/// `start`, `tick`, `submit_char` and `stop` are the only entry points that
/// mutate session state. `tick` and `submit_char` are no-ops unless running.
pub struct TypingSession {
    bank: WordBank,
    config: SessionConfig,
    phase: Phase,
    state: SessionState,
    last_result: Option<SessionResult>,
    identity: Option<Identity>,
    clock: Box<dyn Clock>,
    rng: StdRng,
    sink: Option<Box<dyn ResultSink>>,
}

impl TypingSession {
    pub fn new(bank: WordBank, context: &AppContext) -> Self {
        Self {
            bank,
            config: SessionConfig::default(),
            phase: Phase::Idle,
            state: SessionState::default(),
            last_result: None,
            identity: context.identity.clone(),
            clock: Box::new(SystemClock),
            rng: StdRng::from_entropy(),
            sink: None,
        }
    }

    pub fn with_clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn with_sink<S: ResultSink + 'static>(mut self, sink: S) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    /// Begin a new session, discarding whatever came before it
    pub fn start(&mut self, config: SessionConfig) -> Result<(), ConfigError> {
        config.validate()?;

        let words = shuffled(self.bank.words(config.difficulty), &mut self.rng);
        log::info!(
            "starting {}s {} session with {} words",
            config.duration_secs,
            config.difficulty,
            words.len()
        );

        self.config = config;
        self.state = SessionState {
            words,
            cursor: 0,
            errors: 0,
            input: String::new(),
            started_at: Some(self.clock.now()),
            seconds_remaining: config.duration_secs,
        };
        self.last_result = None;
        self.phase = Phase::Running;
        Ok(())
    }

    /// Start again with the previous configuration
    pub fn restart(&mut self) -> Result<(), ConfigError> {
        self.start(self.config)
    }

    /// Recompute remaining time from the wall clock; finishes the session at zero
    pub fn tick(&mut self) -> Option<SessionResult> {
        if self.phase != Phase::Running {
            return None;
        }

        let elapsed_secs = self
            .state
            .started_at
            .map(|start| time_diff_ms(start, self.clock.now()) / 1000)
            .unwrap_or_default();
        let remaining = u64::from(self.config.duration_secs).saturating_sub(elapsed_secs);
        self.state.seconds_remaining = remaining as u32;

        if self.state.seconds_remaining == 0 {
            return Some(self.finish());
        }
        None
    }

    pub fn submit_char(&mut self, c: char) -> Option<SessionResult> {
        if self.phase != Phase::Running {
            return None;
        }

        let outcome = typing_policy::apply_char(&mut self.state, self.config.policy, c);
        if let Some(WordOutcome::Incorrect) = outcome {
            log::debug!("mismatch at word {}", self.state.cursor);
        }
        if outcome.is_some() && self.state.is_exhausted() {
            return Some(self.finish());
        }
        None
    }

    pub fn backspace(&mut self) {
        if self.phase == Phase::Running {
            typing_policy::backspace(&mut self.state);
        }
    }

    /// User-initiated end of the session
    pub fn stop(&mut self) -> Option<SessionResult> {
        if self.phase != Phase::Running {
            return None;
        }
        Some(self.finish())
    }

    fn finish(&mut self) -> SessionResult {
        let result = SessionResult::from_state(&self.state, self.clock.now());
        self.phase = Phase::Finished;
        self.last_result = Some(result.clone());

        log::info!(
            "session finished: {} wpm, {}% accuracy, {} words, {} errors",
            result.wpm,
            result.accuracy,
            result.total_words,
            result.errors
        );

        if let (Some(identity), Some(sink)) = (&self.identity, &self.sink) {
            sink.submit(PendingResult {
                identity: identity.clone(),
                result: result.clone(),
                config: self.config,
            });
        }

        result
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn last_result(&self) -> Option<&SessionResult> {
        self.last_result.as_ref()
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }
}
