//! TUI event handling
//!
//! Polls terminal events (keyboard, resize) with crossterm on a background
//! task and feeds them to the render loop together with periodic ticks.

use crossterm::event::{self, Event as CrosstermEvent, KeyCode, KeyEvent, KeyModifiers};
use std::time::Duration;
use tokio::sync::mpsc;

/// Terminal event types
#[derive(Debug, Clone)]
pub enum Event {
    /// Keyboard input event
    Key(KeyEvent),
    /// Terminal resize event
    Resize(u16, u16),
    /// Tick event for periodic UI updates
    Tick,
}

/// User actions derived from keyboard input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Quit the application
    Quit,
    /// Clear all accumulated traffic state
    Clear,
    /// Halve the window (more reactive display)
    NarrowWindow,
    /// Double the window (smoother display)
    WidenWindow,
    /// No action
    None,
}

impl From<KeyEvent> for Action {
    fn from(key: KeyEvent) -> Self {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Action::Quit,

            KeyCode::Char('c') => Action::Clear,

            KeyCode::Char('+') | KeyCode::Char('=') => Action::NarrowWindow,
            KeyCode::Char('-') | KeyCode::Char('_') => Action::WidenWindow,

            _ => Action::None,
        }
    }
}

/// Event handler that polls terminal events in a background task
pub struct EventHandler {
    /// Receiver for events
    rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
    /// Create a new event handler
    ///
    /// Spawns a background task that polls for terminal events
    /// and sends them through the channel.
    pub fn new(tick_rate: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let mut last_tick = std::time::Instant::now();

            loop {
                let timeout = tick_rate
                    .checked_sub(last_tick.elapsed())
                    .unwrap_or(Duration::ZERO);

                if crossterm::event::poll(timeout).unwrap_or(false) {
                    match event::read() {
                        Ok(CrosstermEvent::Key(key)) => {
                            // Ignore key release events on some platforms
                            if key.kind == crossterm::event::KeyEventKind::Press
                                && tx.send(Event::Key(key)).is_err()
                            {
                                break;
                            }
                        }
                        Ok(CrosstermEvent::Resize(width, height)) => {
                            if tx.send(Event::Resize(width, height)).is_err() {
                                break;
                            }
                        }
                        Ok(_) => {} // Ignore other events (mouse, focus, paste)
                        Err(_) => break,
                    }
                }

                if last_tick.elapsed() >= tick_rate {
                    if tx.send(Event::Tick).is_err() {
                        break;
                    }
                    last_tick = std::time::Instant::now();
                }
            }
        });

        Self { rx }
    }

    /// Receive the next event
    ///
    /// Returns None if the event channel is closed.
    pub async fn next(&mut self) -> Option<Event> {
        self.rx.recv().await
    }
}
