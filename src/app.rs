use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::celebration::Celebration;
use crate::context::AppContext;
use crate::controller::TypingSession;
use crate::persist::{PersistOutcome, StoreWorker};
use crate::runtime::{AppEvent, TICK_RATE_MS};
use crate::session::{SessionConfig, SessionResult};
use crate::stats::{personal_best, UserStats};
use crate::store::LeaderboardEntry;

pub const LEADERBOARD_SIZE: usize = 10;
// roughly four seconds at the default tick rate
const NOTICE_TICKS: u32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Home,
    Typing,
    ConfirmStop,
    Results,
    Leaderboard,
    Stats,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    PersonalBest(u32),
    SaveFailed,
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Continue,
    Quit,
}

pub struct App {
    // declared before `worker`: the session holds a StoreHandle, which has to
    // be dropped before the worker joins its thread
    pub session: TypingSession,
    pub screen: Screen,
    pub context: AppContext,
    pub session_config: SessionConfig,
    pub leaderboard: Vec<LeaderboardEntry>,
    pub user_stats: Option<UserStats>,
    pub personal_best: Option<u32>,
    pub notice: Option<(Notice, u32)>,
    pub celebration: Celebration,
    pub viewport: (u16, u16),
    return_to: Screen,
    worker: Option<StoreWorker>,
}

impl App {
    pub fn new(
        context: AppContext,
        session_config: SessionConfig,
        session: TypingSession,
        worker: Option<StoreWorker>,
    ) -> Self {
        let session = match worker.as_ref().and_then(StoreWorker::handle) {
            Some(handle) => session.with_sink(handle),
            None => session,
        };

        let mut app = Self {
            session,
            screen: Screen::Home,
            context,
            session_config,
            leaderboard: Vec::new(),
            user_stats: None,
            personal_best: None,
            notice: None,
            celebration: Celebration::new(),
            viewport: (80, 24),
            return_to: Screen::Home,
            worker,
        };
        app.load_identity();
        app
    }

    fn load_identity(&mut self) {
        let (Some(identity), Some(worker)) = (&self.context.identity, &self.worker) else {
            return;
        };
        if let Err(e) = worker.register(identity.clone()) {
            log::warn!("could not register {}: {e}", identity.id);
        }
        match worker.results_for_identity(identity) {
            Ok(records) => self.personal_best = personal_best(&records),
            Err(e) => log::warn!("could not load history for {}: {e}", identity.id),
        }
    }

    pub fn set_viewport(&mut self, width: u16, height: u16) {
        self.viewport = (width, height);
    }

    pub fn handle_event(&mut self, event: AppEvent) -> Action {
        match event {
            AppEvent::Tick => {
                self.on_tick();
                Action::Continue
            }
            AppEvent::Resize => Action::Continue,
            AppEvent::Key(key) => self.on_key(key),
        }
    }

    pub fn on_tick(&mut self) {
        if let Some(result) = self.session.tick() {
            self.on_finished(result);
        }

        if let Some(worker) = &self.worker {
            for outcome in worker.poll_outcomes() {
                match outcome {
                    PersistOutcome::Saved { wpm } => log::debug!("saved {wpm} wpm result"),
                    PersistOutcome::Failed { error } => {
                        log::warn!("result not saved: {error}");
                        self.show(Notice::SaveFailed);
                    }
                }
            }
        }

        self.celebration.update(TICK_RATE_MS as f64 / 1000.0);

        if let Some((_, ticks)) = &mut self.notice {
            *ticks = ticks.saturating_sub(1);
            if *ticks == 0 {
                self.notice = None;
            }
        }
    }

    pub fn on_key(&mut self, key: KeyEvent) -> Action {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('c') if ctrl => return Action::Quit,
            KeyCode::Char('d') if ctrl => {
                self.toggle_dark_mode();
                return Action::Continue;
            }
            KeyCode::F(2) => {
                self.toggle_dark_mode();
                return Action::Continue;
            }
            _ => {}
        }

        match self.screen {
            Screen::Home => match key.code {
                KeyCode::Enter | KeyCode::Char('s') => self.start_session(),
                KeyCode::Char('l') => self.open_leaderboard(),
                KeyCode::Char('p') => self.open_stats(),
                KeyCode::Esc | KeyCode::Char('q') => return Action::Quit,
                _ => {}
            },
            Screen::Typing => match key.code {
                KeyCode::Esc => self.screen = Screen::ConfirmStop,
                KeyCode::Backspace => self.session.backspace(),
                // chords are not text
                KeyCode::Char(_)
                    if key
                        .modifiers
                        .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) => {}
                KeyCode::Char(c) => {
                    if let Some(result) = self.session.submit_char(c) {
                        self.on_finished(result);
                    }
                }
                _ => {}
            },
            Screen::ConfirmStop => match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                    match self.session.stop() {
                        Some(result) => self.on_finished(result),
                        // ran out of time while the prompt was up
                        None => self.screen = Screen::Results,
                    }
                }
                _ => {
                    self.screen = if self.session.is_running() {
                        Screen::Typing
                    } else {
                        Screen::Results
                    }
                }
            },
            Screen::Results => match key.code {
                KeyCode::Enter | KeyCode::Char('r') => self.start_session(),
                KeyCode::Char('l') => self.open_leaderboard(),
                KeyCode::Char('p') => self.open_stats(),
                KeyCode::Esc => self.screen = Screen::Home,
                KeyCode::Char('q') => return Action::Quit,
                _ => {}
            },
            Screen::Leaderboard | Screen::Stats => match key.code {
                KeyCode::Esc | KeyCode::Backspace | KeyCode::Char('b') => {
                    self.screen = self.return_to
                }
                KeyCode::Char('q') => return Action::Quit,
                _ => {}
            },
        }
        Action::Continue
    }

    fn toggle_dark_mode(&mut self) {
        self.context.dark_mode = !self.context.dark_mode;
    }

    fn show(&mut self, notice: Notice) {
        self.notice = Some((notice, NOTICE_TICKS));
    }

    pub fn start_session(&mut self) {
        match self.session.start(self.session_config) {
            Ok(()) => {
                self.celebration.stop();
                self.screen = Screen::Typing;
            }
            Err(e) => {
                log::error!("cannot start session: {e}");
                self.show(Notice::Error(e.to_string()));
            }
        }
    }

    fn on_finished(&mut self, result: SessionResult) {
        // the confirm prompt may be up when time runs out
        if matches!(self.screen, Screen::Typing | Screen::ConfirmStop) {
            self.screen = Screen::Results;
        }

        if self.context.is_signed_in() && result.wpm > self.personal_best.unwrap_or(0) {
            log::info!("new personal best: {} wpm", result.wpm);
            self.personal_best = Some(result.wpm);
            self.celebration.start(self.viewport.0, self.viewport.1);
            self.show(Notice::PersonalBest(result.wpm));
        }
    }

    fn open_leaderboard(&mut self) {
        let Some(worker) = &self.worker else {
            self.show(Notice::Error("no results store available".into()));
            return;
        };
        match worker.top_results(LEADERBOARD_SIZE) {
            Ok(entries) => self.leaderboard = entries,
            Err(e) => {
                log::error!("error fetching leaderboard: {e}");
                self.leaderboard.clear();
                self.show(Notice::Error("could not load leaderboard".into()));
            }
        }
        self.return_to = self.screen;
        self.screen = Screen::Leaderboard;
    }

    fn open_stats(&mut self) {
        let (Some(identity), Some(worker)) = (&self.context.identity, &self.worker) else {
            self.show(Notice::Error("sign in with --user to keep statistics".into()));
            return;
        };
        match worker.results_for_identity(identity) {
            Ok(records) => self.user_stats = UserStats::from_records(&records),
            Err(e) => {
                log::error!("error fetching stats: {e}");
                self.user_stats = None;
                self.show(Notice::Error("could not load statistics".into()));
            }
        }
        self.return_to = self.screen;
        self.screen = Screen::Stats;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Identity;
    use crate::controller::ManualClock;
    use crate::difficulty::Difficulty;
    use crate::store::test_support::FailingStore;
    use crate::store::SqliteResultsStore;
    use crate::words::WordBank;
    use std::time::Duration;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.on_key(key(KeyCode::Char(c)));
        }
    }

    fn app(context: AppContext, with_store: bool) -> (App, ManualClock) {
        let clock = ManualClock::default();
        let bank = WordBank::default().with_tier(Difficulty::Easy, ["one", "two", "three", "four"]);
        let session = TypingSession::new(bank, &context).with_clock(clock.clone());
        let worker =
            with_store.then(|| StoreWorker::spawn(SqliteResultsStore::open_in_memory().unwrap()));
        let config = SessionConfig::new(30, Difficulty::Easy).unwrap();
        (App::new(context, config, session, worker), clock)
    }

    fn ada() -> AppContext {
        AppContext {
            identity: Identity::from_name("Ada"),
            ..Default::default()
        }
    }

    #[test]
    fn home_enter_starts_typing() {
        let (mut app, _) = app(AppContext::default(), false);
        assert_eq!(app.screen, Screen::Home);
        app.on_key(key(KeyCode::Enter));
        assert_eq!(app.screen, Screen::Typing);
        assert!(app.session.is_running());
    }

    #[test]
    fn stop_requires_confirmation() {
        let (mut app, _) = app(AppContext::default(), false);
        app.start_session();

        app.on_key(key(KeyCode::Esc));
        assert_eq!(app.screen, Screen::ConfirmStop);
        app.on_key(key(KeyCode::Char('n')));
        assert_eq!(app.screen, Screen::Typing);
        assert!(app.session.is_running());

        app.on_key(key(KeyCode::Esc));
        app.on_key(key(KeyCode::Char('y')));
        assert_eq!(app.screen, Screen::Results);
        assert!(app.session.last_result().is_some());
    }

    #[test]
    fn timeout_moves_to_results() {
        let (mut app, clock) = app(AppContext::default(), false);
        app.start_session();
        clock.advance(Duration::from_secs(30));
        app.on_tick();
        assert_eq!(app.screen, Screen::Results);
    }

    #[test]
    fn timeout_during_confirm_prompt() {
        let (mut app, clock) = app(AppContext::default(), false);
        app.start_session();
        app.on_key(key(KeyCode::Esc));
        clock.advance(Duration::from_secs(31));
        app.on_tick();
        assert_eq!(app.screen, Screen::Results);
        app.on_key(key(KeyCode::Char('y')));
        assert_eq!(app.screen, Screen::Results);
    }

    #[test]
    fn results_retry_restarts() {
        let (mut app, _) = app(AppContext::default(), false);
        app.start_session();
        let first = app.session.state().words[0].clone();
        type_text(&mut app, &format!("{first} "));
        app.on_key(key(KeyCode::Esc));
        app.on_key(key(KeyCode::Enter));
        assert_eq!(app.screen, Screen::Results);

        app.on_key(key(KeyCode::Char('r')));
        assert_eq!(app.screen, Screen::Typing);
        assert_eq!(app.session.state().cursor, 0);
    }

    #[test]
    fn anonymous_stats_shows_notice() {
        let (mut app, _) = app(AppContext::default(), true);
        app.on_key(key(KeyCode::Char('p')));
        assert_eq!(app.screen, Screen::Home);
        assert!(matches!(app.notice, Some((Notice::Error(_), _))));
    }

    #[test]
    fn personal_best_celebrates_and_persists() {
        let (mut app, clock) = app(ada(), true);
        assert_eq!(app.personal_best, None);

        app.start_session();
        let words = app.session.state().words.clone();
        type_text(&mut app, &format!("{} {} ", words[0], words[1]));
        clock.advance(Duration::from_secs(30));
        app.on_tick();

        assert_eq!(app.screen, Screen::Results);
        assert_eq!(app.personal_best, Some(4));
        assert!(app.celebration.is_active);
        assert_eq!(app.notice.as_ref().map(|n| &n.0), Some(&Notice::PersonalBest(4)));

        app.on_key(key(KeyCode::Char('l')));
        assert_eq!(app.screen, Screen::Leaderboard);
        assert_eq!(app.leaderboard.len(), 1);
        assert_eq!(app.leaderboard[0].display_name, "Ada");
        assert_eq!(app.leaderboard[0].wpm, 4);

        app.on_key(key(KeyCode::Esc));
        assert_eq!(app.screen, Screen::Results);

        app.on_key(key(KeyCode::Char('p')));
        assert_eq!(app.screen, Screen::Stats);
        let stats = app.user_stats.clone().unwrap();
        assert_eq!(stats.total_tests, 1);
        assert_eq!(stats.best_wpm, 4);
        assert_eq!(stats.total_time_secs, 30);
    }

    #[test]
    fn slower_run_does_not_celebrate() {
        let (mut app, clock) = app(ada(), true);
        app.personal_best = Some(100);
        app.start_session();
        clock.advance(Duration::from_secs(30));
        app.on_tick();
        assert!(!app.celebration.is_active);
        assert_eq!(app.personal_best, Some(100));
    }

    #[test]
    fn dark_mode_toggles() {
        let (mut app, _) = app(AppContext::default(), false);
        app.on_key(KeyEvent::new(KeyCode::Char('d'), KeyModifiers::CONTROL));
        assert!(app.context.dark_mode);
        app.on_key(key(KeyCode::F(2)));
        assert!(!app.context.dark_mode);
    }

    #[test]
    fn ctrl_c_quits_anywhere() {
        let (mut app, _) = app(AppContext::default(), false);
        app.start_session();
        assert_eq!(
            app.on_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Action::Quit
        );
    }

    #[test]
    fn notices_expire() {
        let (mut app, _) = app(AppContext::default(), false);
        app.on_key(key(KeyCode::Char('l')));
        assert!(app.notice.is_some());
        for _ in 0..NOTICE_TICKS {
            app.on_tick();
        }
        assert!(app.notice.is_none());
    }

    #[test]
    fn failed_save_surfaces_a_notice() {
        let clock = ManualClock::default();
        let context = ada();
        let bank = WordBank::default().with_tier(Difficulty::Easy, ["one", "two"]);
        let session = TypingSession::new(bank, &context).with_clock(clock.clone());
        let config = SessionConfig::new(30, Difficulty::Easy).unwrap();
        let worker = StoreWorker::spawn(FailingStore);
        let mut app = App::new(context, config, session, Some(worker));

        app.start_session();
        app.on_key(key(KeyCode::Esc));
        app.on_key(key(KeyCode::Char('y')));
        assert_eq!(app.screen, Screen::Results);

        // the write happens on the worker thread
        for _ in 0..200 {
            app.on_tick();
            if matches!(app.notice, Some((Notice::SaveFailed, _))) {
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_matches::assert_matches!(app.notice, Some((Notice::SaveFailed, _)));
    }

    #[test]
    fn modifier_chords_are_not_typed() {
        let (mut app, _) = app(AppContext::default(), false);
        app.start_session();
        app.on_key(KeyEvent::new(KeyCode::Char('w'), KeyModifiers::CONTROL));
        app.on_key(KeyEvent::new(KeyCode::Char('x'), KeyModifiers::ALT));
        assert!(app.session.state().input.is_empty());

        app.on_key(KeyEvent::new(KeyCode::Char('A'), KeyModifiers::SHIFT));
        assert_eq!(app.session.state().input, "A");
    }
}
