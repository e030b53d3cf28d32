use crossterm::event::KeyCode;

/// What a key press asks the radio to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    ChangeVolume(i32),
    SwitchStation,
    /// Alternates between switching the radio off and on.
    TogglePower,
    Quit,
}

impl Command {
    /// Maps a key to a command, `step` being the volume change of `+`/`-`.
    pub fn from_key(key: KeyCode, step: i32) -> Option<Self> {
        match key {
            KeyCode::Char('+') => Some(Command::ChangeVolume(step)),
            KeyCode::Char('-') => Some(Command::ChangeVolume(-step)),
            KeyCode::Char(' ') => Some(Command::SwitchStation),
            KeyCode::Esc => Some(Command::TogglePower),
            KeyCode::Char('q') | KeyCode::Char('Q') => Some(Command::Quit),
            _ => None,
        }
    }
}

pub const USAGE: &str = " Usage: volume: +/-, station: SPACE on/off: ESC, quit: Q";
