//! Terminal front-end of the radio client.

use std::io::{self, Stdout};
use std::time::Duration;

use anyhow::Result;
use carsimclient::{ClientState, Command, RadioClient, USAGE};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Paragraph};
use tracing::debug;

const TICK_RATE: Duration = Duration::from_millis(200);

/// Restores the terminal even when the loop fails.
struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    Ok(Terminal::new(CrosstermBackend::new(stdout))?)
}

/// Runs the interactive client until the user quits.
pub fn run(client: &RadioClient, step: i32) -> Result<()> {
    let mut guard = TerminalGuard {
        terminal: setup_terminal()?,
    };
    let mut state = client.state();
    let mut redraw = true;

    loop {
        if let Some(update) = client.take_update() {
            state = update;
            redraw = true;
        }
        if redraw {
            guard.terminal.draw(|f| draw(f, &state))?;
            redraw = false;
        }

        if !event::poll(TICK_RATE)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        // Raw mode swallows SIGINT
        let ctrl_c =
            key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c');
        let command = if ctrl_c {
            Some(Command::Quit)
        } else {
            Command::from_key(key.code, step)
        };
        let Some(command) = command else {
            continue;
        };

        match client.execute(command) {
            Ok(true) => break,
            Ok(false) => {}
            Err(err) => debug!(error = %err, ?command, "Command not delivered"),
        }
    }
    Ok(())
}

fn draw(f: &mut ratatui::Frame<'_>, state: &ClientState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(7),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(f.size());

    let lines: Vec<Line> = state.render().into_iter().map(Line::from).collect();
    let style = if state.in_reverse {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    let screen = Paragraph::new(lines)
        .style(style)
        .block(Block::default().borders(Borders::ALL).title(" CarSim radio "));

    f.render_widget(screen, chunks[0]);
    f.render_widget(Paragraph::new(USAGE), chunks[1]);
}
