use crate::shared::DisplayState;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use super::grid::draw_step_grid;

const HELP: &str = "space start/stop  g/G genre  i instrument  l locality  -/= bpm  esc quit";

pub fn render(frame: &mut Frame, area: Rect, state: &DisplayState, blink_on: bool) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6), // lcd screen
            Constraint::Length(3), // chord row
            Constraint::Min(12),   // step grid + log
            Constraint::Length(1), // key help
        ])
        .split(area);

    draw_screen(frame, sections[0], state, blink_on);
    draw_chords(frame, sections[1], state);

    let lower = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(sections[2]);
    draw_step_grid(frame, lower[0], &state.leds);
    draw_log(frame, lower[1], state);

    frame.render_widget(
        Paragraph::new(HELP).style(Style::default().fg(Color::DarkGray)),
        sections[3],
    );
}

fn draw_screen(frame: &mut Frame, area: Rect, state: &DisplayState, blink_on: bool) {
    let status = if state.live {
        let dot = if blink_on { "●" } else { " " };
        Span::styled(format!("{dot} LIVE"), Style::default().fg(Color::Red).add_modifier(Modifier::BOLD))
    } else {
        Span::styled("  idle", Style::default().fg(Color::DarkGray))
    };
    let key = match (&state.key, state.live) {
        (Some(k), _) => Span::styled(
            format!("key {k}"),
            Style::default().fg(Color::LightGreen).add_modifier(Modifier::BOLD),
        ),
        (None, true) => Span::styled("listening...", Style::default().fg(Color::Yellow)),
        (None, false) => Span::styled("key ?", Style::default().fg(Color::DarkGray)),
    };

    let lines = vec![
        Line::from(vec![status, Span::raw("   "), key]),
        Line::from(vec![
            Span::styled(state.genre.name(), Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(format!("  {}  swing {:.2}", state.feel, state.swing)),
        ]),
        Line::from(format!(
            "{} bpm   {}   {}",
            state.bpm, state.instrument, state.locality
        )),
        Line::from(if state.playing { "band playing" } else { "band waiting for a key" }),
    ];
    let screen = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" jampilot "));
    frame.render_widget(screen, area);
}

fn draw_chords(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let mut spans = Vec::new();
    if state.chords.is_empty() {
        spans.push(Span::styled("-", Style::default().fg(Color::DarkGray)));
    }
    for (i, chord) in state.chords.iter().enumerate() {
        let style = if state.playing && i == state.current_bar {
            Style::default().fg(Color::Black).bg(Color::LightGreen)
        } else {
            Style::default()
        };
        spans.push(Span::styled(format!(" {chord} "), style));
        spans.push(Span::raw(" "));
    }
    let row = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).title(" chords "));
    frame.render_widget(row, area);
}

fn draw_log(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let visible = area.height.saturating_sub(2) as usize;
    let lines: Vec<Line> = state
        .logs
        .iter()
        .take(visible)
        .map(|l| {
            let style = if l.is_error { Style::default().fg(Color::Red) } else { Style::default() };
            Line::from(vec![
                Span::styled(l.time.format("%H:%M:%S ").to_string(), Style::default().fg(Color::DarkGray)),
                Span::styled(l.message.as_str(), style),
            ])
        })
        .collect();
    let log = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" log "));
    frame.render_widget(log, area);
}
