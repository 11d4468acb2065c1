use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind};

use crate::shared::{InputEvent, BPM_NUDGE};

// poll for input from the terminal and resolve key presses into input
// events for the middle layer
pub fn poll_input(timeout: Duration) -> anyhow::Result<Vec<InputEvent>> {
    if !event::poll(timeout)? {
        return Ok(vec![]);
    }

    if let Event::Key(key) = event::read()? {
        if key.kind != KeyEventKind::Press {
            return Ok(vec![]);
        }
        return Ok(handle_key(key.code));
    }
    Ok(vec![])
}

pub fn handle_key(code: KeyCode) -> Vec<InputEvent> {
    match code {
        KeyCode::Esc => vec![InputEvent::Quit],
        KeyCode::Char(' ') => vec![InputEvent::ToggleSession],

        // selection, lowercase = forward and shifted = back where it matters
        KeyCode::Char('g') => vec![InputEvent::NextGenre],
        KeyCode::Char('G') => vec![InputEvent::PrevGenre],
        KeyCode::Char('i') => vec![InputEvent::NextInstrument],
        KeyCode::Char('l') => vec![InputEvent::NextLocality],

        KeyCode::Char('-') => vec![InputEvent::NudgeBpm(-BPM_NUDGE)],
        KeyCode::Char('=') => vec![InputEvent::NudgeBpm(BPM_NUDGE)],

        _ => vec![],
    }
}
