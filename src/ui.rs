use itertools::Itertools;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Cell, Clear, Paragraph, Row, Table, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use crate::app::{App, Notice, Screen};
use crate::celebration::Celebration;

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;
const UPCOMING_WORDS: usize = 10;
const LOW_TIME_SECS: u32 = 10;

/// Presentation palette. Only the UI reads the dark mode flag.
#[derive(Debug, Clone, Copy)]
struct Theme {
    bg: Color,
    text: Color,
    dim: Color,
    accent: Color,
    good: Color,
    bad: Color,
}

impl Theme {
    fn new(dark: bool) -> Self {
        if dark {
            Self {
                bg: Color::Black,
                text: Color::White,
                dim: Color::DarkGray,
                accent: Color::Cyan,
                good: Color::Green,
                bad: Color::Red,
            }
        } else {
            Self {
                bg: Color::White,
                text: Color::Black,
                dim: Color::Gray,
                accent: Color::Blue,
                good: Color::Green,
                bad: Color::Red,
            }
        }
    }

    fn base(&self) -> Style {
        Style::default().bg(self.bg).fg(self.text)
    }

    fn bold(&self) -> Style {
        self.base().add_modifier(Modifier::BOLD)
    }

    fn dim(&self) -> Style {
        self.base().fg(self.dim)
    }
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let theme = Theme::new(self.context.dark_mode);
        Block::default().style(theme.base()).render(area, buf);

        let [body, notice] =
            Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).areas(area);
        let body = Rect {
            x: body.x + HORIZONTAL_MARGIN.min(body.width / 4),
            y: body.y + VERTICAL_MARGIN.min(body.height / 4),
            width: body
                .width
                .saturating_sub(2 * HORIZONTAL_MARGIN.min(body.width / 4)),
            height: body
                .height
                .saturating_sub(2 * VERTICAL_MARGIN.min(body.height / 4)),
        };

        match self.screen {
            Screen::Home => render_home(self, body, buf, &theme),
            Screen::Typing => render_typing(self, body, buf, &theme),
            Screen::ConfirmStop => {
                render_typing(self, body, buf, &theme);
                render_confirm(body, buf, &theme);
            }
            Screen::Results => render_results(self, body, buf, &theme),
            Screen::Leaderboard => render_leaderboard(self, body, buf, &theme),
            Screen::Stats => render_stats(self, body, buf, &theme),
        }

        render_notice(self, notice, buf, &theme);

        if self.celebration.is_active {
            render_confetti(&self.celebration, area, buf);
        }
    }
}

fn render_home(app: &App, area: Rect, buf: &mut Buffer, theme: &Theme) {
    let config = &app.session_config;
    let who = match &app.context.identity {
        Some(identity) => format!("signed in as {}", identity.display_name),
        None => "not signed in, results will not be saved".to_string(),
    };

    let lines = vec![
        Line::from(Span::styled(
            "Typing Speed Test",
            theme.bold().fg(theme.accent),
        )),
        Line::default(),
        Line::from(Span::styled(
            format!(
                "{}s  ·  {}  ·  {} on mistakes",
                config.duration_secs, config.difficulty, config.policy
            ),
            theme.base(),
        )),
        Line::from(Span::styled(who, theme.dim())),
        Line::default(),
        Line::from(Span::styled(
            "(enter) start / (l)eaderboard / (p)ersonal stats / (q)uit",
            theme.dim().add_modifier(Modifier::ITALIC),
        )),
    ];

    let height = lines.len() as u16;
    let [_, middle, _] = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(height),
        Constraint::Fill(1),
    ])
    .areas(area);

    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .render(middle, buf);
}

fn render_typing(app: &App, area: Rect, buf: &mut Buffer, theme: &Theme) {
    let state = app.session.state();

    let [_, status, _, prompt, input, _, legend] = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(3),
        Constraint::Length(1),
        Constraint::Fill(1),
        Constraint::Length(1),
    ])
    .areas(area);

    let timer_style = if state.seconds_remaining <= LOW_TIME_SECS {
        theme.bold().fg(theme.bad)
    } else {
        theme.bold()
    };
    Paragraph::new(Line::from(vec![
        Span::styled(format!("{}s", state.seconds_remaining), timer_style),
        Span::styled(format!("   Words: {}", state.cursor), theme.base()),
        Span::styled(format!("   Errors: {}", state.errors), theme.base()),
    ]))
    .alignment(Alignment::Center)
    .render(status, buf);

    let upcoming = state.upcoming(UPCOMING_WORDS);
    let mut spans = Vec::with_capacity(upcoming.len() * 2);
    if let Some((current, rest)) = upcoming.split_first() {
        let on_track = current.starts_with(state.input.as_str());
        let current_style = theme
            .bold()
            .fg(if on_track { theme.good } else { theme.bad })
            .add_modifier(Modifier::UNDERLINED);
        spans.push(Span::styled(current.clone(), current_style));
        if !rest.is_empty() {
            spans.push(Span::styled(
                format!(" {}", rest.iter().join(" ")),
                theme.dim().add_modifier(Modifier::BOLD),
            ));
        }
    }
    Paragraph::new(Line::from(spans))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .render(prompt, buf);

    // keep the end of long input visible
    let max_width = input.width.saturating_sub(4) as usize;
    let mut shown = state.input.as_str();
    while shown.width() > max_width && !shown.is_empty() {
        let mut chars = shown.chars();
        chars.next();
        shown = chars.as_str();
    }
    Paragraph::new(Line::from(vec![
        Span::styled("> ", theme.dim()),
        Span::styled(shown.to_string(), theme.bold()),
        Span::styled("_", theme.dim().add_modifier(Modifier::SLOW_BLINK)),
    ]))
    .alignment(Alignment::Center)
    .render(input, buf);

    Paragraph::new(Span::styled(
        "(space) submit word / (esc) stop",
        theme.dim().add_modifier(Modifier::ITALIC),
    ))
    .render(legend, buf);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn render_confirm(area: Rect, buf: &mut Buffer, theme: &Theme) {
    let popup = centered(area, 44, 5);
    Clear.render(popup, buf);
    Paragraph::new(vec![
        Line::from(Span::styled("Are you sure you want to stop the test?", theme.bold())),
        Line::from(Span::styled("(y)es / any other key to keep typing", theme.dim())),
    ])
    .alignment(Alignment::Center)
    .block(Block::bordered().style(theme.base()).border_style(theme.bold().fg(theme.bad)))
    .render(popup, buf);
}

fn render_results(app: &App, area: Rect, buf: &mut Buffer, theme: &Theme) {
    let Some(result) = app.session.last_result() else {
        return render_home(app, area, buf, theme);
    };

    let label = theme.dim();
    let value = theme.bold().fg(theme.accent);
    let row = |name: &'static str, shown: String| {
        Row::new(vec![
            Cell::from(Span::styled(name, label)),
            Cell::from(Span::styled(shown, value)),
        ])
    };

    let table = Table::new(
        vec![
            row("WPM", result.wpm.to_string()),
            row("Accuracy", format!("{}%", result.accuracy)),
            row("Words", result.total_words.to_string()),
            row("Errors", result.errors.to_string()),
        ],
        [Constraint::Length(10), Constraint::Length(8)],
    )
    .style(theme.base())
    .block(
        Block::bordered()
            .title(Span::styled(" Test Results ", theme.bold()))
            .style(theme.base()),
    );

    let [_, card, best, _, legend] = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(6),
        Constraint::Length(1),
        Constraint::Fill(1),
        Constraint::Length(1),
    ])
    .areas(area);

    table.render(centered(card, 24, 6), buf);

    if let Some(best_wpm) = app.personal_best {
        Paragraph::new(Span::styled(format!("personal best: {best_wpm} wpm"), theme.dim()))
            .alignment(Alignment::Center)
            .render(best, buf);
    }

    Paragraph::new(Span::styled(
        "(r)etry / (l)eaderboard / (p)ersonal stats / (esc) home / (q)uit",
        theme.dim().add_modifier(Modifier::ITALIC),
    ))
    .render(legend, buf);
}

fn medal_color(rank: usize) -> Option<Color> {
    match rank {
        1 => Some(Color::Yellow),
        2 => Some(Color::Gray),
        3 => Some(Color::Rgb(205, 127, 50)),
        _ => None,
    }
}

fn render_leaderboard(app: &App, area: Rect, buf: &mut Buffer, theme: &Theme) {
    let [board, legend] =
        Layout::vertical([Constraint::Min(3), Constraint::Length(1)]).areas(area);

    let block = Block::bordered()
        .title(Span::styled(" Leaderboard ", theme.bold().fg(Color::Yellow)))
        .style(theme.base());

    if app.leaderboard.is_empty() {
        Paragraph::new(Span::styled("No results yet.", theme.dim()))
            .alignment(Alignment::Center)
            .block(block)
            .render(board, buf);
    } else {
        let rows = app
            .leaderboard
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let rank = i + 1;
                let rank_cell = match medal_color(rank) {
                    Some(color) => {
                        Cell::from(Span::styled(format!("#{rank}"), theme.bold().fg(color)))
                    }
                    None => Cell::from(Span::styled(format!("{rank}"), theme.dim())),
                };
                Row::new(vec![
                    rank_cell,
                    Cell::from(Span::styled(entry.display_name.clone(), theme.bold())),
                    Cell::from(Span::styled(format!("{} WPM", entry.wpm), theme.base())),
                    Cell::from(Span::styled(format!("{}%", entry.accuracy), theme.dim())),
                ])
            })
            .collect::<Vec<_>>();

        Table::new(
            rows,
            [
                Constraint::Length(4),
                Constraint::Fill(1),
                Constraint::Length(9),
                Constraint::Length(5),
            ],
        )
        .header(
            Row::new(vec!["", "Name", "Speed", "Acc"]).style(theme.bold().fg(theme.accent)),
        )
        .style(theme.base())
        .block(block)
        .render(board, buf);
    }

    Paragraph::new(Span::styled(
        "(esc) back / (q)uit",
        theme.dim().add_modifier(Modifier::ITALIC),
    ))
    .render(legend, buf);
}

fn render_stats(app: &App, area: Rect, buf: &mut Buffer, theme: &Theme) {
    let [card, legend] =
        Layout::vertical([Constraint::Min(3), Constraint::Length(1)]).areas(area);

    let block = Block::bordered()
        .title(Span::styled(" Your Stats ", theme.bold()))
        .style(theme.base());

    match &app.user_stats {
        Some(stats) => {
            let value = theme.bold().fg(theme.accent);
            let row = |name: &'static str, shown: String| {
                Row::new(vec![
                    Cell::from(Span::styled(name, theme.dim())),
                    Cell::from(Span::styled(shown, value)),
                ])
            };
            Table::new(
                vec![
                    row("Best WPM", stats.best_wpm.to_string()),
                    row("Avg. Accuracy", format!("{}%", stats.average_accuracy)),
                    row("Total Tests", stats.total_tests.to_string()),
                    row("Avg. WPM", stats.average_wpm.to_string()),
                    row("Time Typed", stats.total_time_text()),
                ],
                [Constraint::Length(15), Constraint::Fill(1)],
            )
            .style(theme.base())
            .block(block)
            .render(card, buf);
        }
        None => {
            Paragraph::new(Span::styled(
                "No tests completed yet. Start typing to see your stats!",
                theme.dim(),
            ))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(block)
            .render(card, buf);
        }
    }

    Paragraph::new(Span::styled(
        "(esc) back / (q)uit",
        theme.dim().add_modifier(Modifier::ITALIC),
    ))
    .render(legend, buf);
}

fn render_notice(app: &App, area: Rect, buf: &mut Buffer, theme: &Theme) {
    let Some((notice, _)) = &app.notice else {
        return;
    };
    let (text, style) = match notice {
        Notice::PersonalBest(wpm) => (
            format!("New personal best! {wpm} wpm"),
            theme.bold().fg(theme.good),
        ),
        Notice::SaveFailed => (
            "Failed to save results".to_string(),
            theme.bold().fg(theme.bad),
        ),
        Notice::Error(message) => (message.clone(), theme.bold().fg(theme.bad)),
    };
    Paragraph::new(Span::styled(text, style))
        .alignment(Alignment::Center)
        .render(area, buf);
}

fn render_confetti(celebration: &Celebration, area: Rect, buf: &mut Buffer) {
    let colors = [
        Color::Yellow,
        Color::Magenta,
        Color::Cyan,
        Color::Green,
        Color::Red,
        Color::Blue,
        Color::LightYellow,
    ];

    for piece in &celebration.pieces {
        if piece.x < 0.0 || piece.y < 0.0 {
            continue;
        }
        let (x, y) = (piece.x as u16, piece.y as u16);
        if x < area.width && y < area.height {
            if let Some(cell) = buf.cell_mut((area.x + x, area.y + y)) {
                cell.set_char(piece.symbol);
                cell.set_fg(colors[piece.color_index % colors.len()]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{AppContext, Identity};
    use crate::controller::{ManualClock, TypingSession};
    use crate::difficulty::Difficulty;
    use crate::session::SessionConfig;
    use crate::stats::UserStats;
    use crate::store::LeaderboardEntry;
    use crate::words::WordBank;
    use std::time::Duration;

    fn test_app(context: AppContext) -> (App, ManualClock) {
        let clock = ManualClock::default();
        let bank = WordBank::default().with_tier(Difficulty::Easy, ["alpha", "beta", "gamma"]);
        let session = TypingSession::new(bank, &context).with_clock(clock.clone());
        let config = SessionConfig::new(15, Difficulty::Easy).unwrap();
        (App::new(context, config, session, None), clock)
    }

    fn render(app: &App, width: u16, height: u16) -> String {
        let area = Rect::new(0, 0, width, height);
        let mut buffer = Buffer::empty(area);
        app.render(area, &mut buffer);
        buffer.content().iter().map(|c| c.symbol()).collect()
    }

    #[test]
    fn home_shows_settings() {
        let (app, _) = test_app(AppContext::default());
        let rendered = render(&app, 80, 24);
        assert!(rendered.contains("Typing Speed Test"));
        assert!(rendered.contains("15s"));
        assert!(rendered.contains("easy"));
        assert!(rendered.contains("not signed in"));
    }

    #[test]
    fn home_names_the_signed_in_user() {
        let (app, _) = test_app(AppContext {
            identity: Identity::from_name("Ada"),
            ..Default::default()
        });
        assert!(render(&app, 80, 24).contains("signed in as Ada"));
    }

    #[test]
    fn typing_shows_timer_counts_and_words() {
        let (mut app, clock) = test_app(AppContext::default());
        app.start_session();
        clock.advance(Duration::from_secs(3));
        app.on_tick();

        let rendered = render(&app, 80, 24);
        assert!(rendered.contains("12s"));
        assert!(rendered.contains("Words: 0"));
        assert!(rendered.contains("Errors: 0"));
        for word in &app.session.state().words {
            assert!(rendered.contains(word.as_str()));
        }
    }

    #[test]
    fn confirm_prompt_overlays_typing() {
        let (mut app, _) = test_app(AppContext::default());
        app.start_session();
        app.screen = Screen::ConfirmStop;
        assert!(render(&app, 80, 24).contains("stop the test?"));
    }

    #[test]
    fn results_show_score() {
        let (mut app, clock) = test_app(AppContext::default());
        app.start_session();
        let first = app.session.state().words[0].clone();
        for c in format!("{first} ").chars() {
            app.session.submit_char(c);
        }
        clock.advance(Duration::from_secs(15));
        app.on_tick();

        let rendered = render(&app, 80, 24);
        assert!(rendered.contains("Test Results"));
        assert!(rendered.contains("100%"));
        // 1 word in 15s
        assert!(rendered.contains('4'));
    }

    #[test]
    fn leaderboard_lists_entries() {
        let (mut app, _) = test_app(AppContext::default());
        app.leaderboard = vec![
            LeaderboardEntry {
                display_name: "Ada".into(),
                wpm: 88,
                accuracy: 97,
            },
            LeaderboardEntry {
                display_name: "Anonymous".into(),
                wpm: 61,
                accuracy: 90,
            },
        ];
        app.screen = Screen::Leaderboard;
        let rendered = render(&app, 80, 24);
        assert!(rendered.contains("Leaderboard"));
        assert!(rendered.contains("88 WPM"));
        assert!(rendered.contains("Anonymous"));
        assert!(rendered.contains("#1"));
    }

    #[test]
    fn empty_stats_message() {
        let (mut app, _) = test_app(AppContext::default());
        app.screen = Screen::Stats;
        assert!(render(&app, 100, 24).contains("No tests completed yet"));
    }

    #[test]
    fn stats_card() {
        let (mut app, _) = test_app(AppContext::default());
        app.user_stats = Some(UserStats {
            total_tests: 3,
            average_wpm: 47,
            average_accuracy: 91,
            best_wpm: 55,
            total_time_secs: 150,
        });
        app.screen = Screen::Stats;
        let rendered = render(&app, 80, 24);
        assert!(rendered.contains("Best WPM"));
        assert!(rendered.contains("55"));
        assert!(rendered.contains("91%"));
    }

    #[test]
    fn notice_is_rendered() {
        let (mut app, _) = test_app(AppContext::default());
        app.notice = Some((Notice::SaveFailed, 3));
        assert!(render(&app, 80, 24).contains("Failed to save results"));
    }

    #[test]
    fn tiny_area_does_not_panic() {
        let (mut app, _) = test_app(AppContext::default());
        render(&app, 10, 3);
        app.start_session();
        render(&app, 10, 3);
        app.screen = Screen::ConfirmStop;
        render(&app, 4, 2);
        app.celebration.start(4, 2);
        render(&app, 4, 2);
    }
}
