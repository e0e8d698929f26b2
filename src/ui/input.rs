/// Keyboard state tracker.
///
/// Tracks which keys are currently held down, enabling:
///   - Arrow keys and `1`/`2` held as logical inputs
///   - Edge-triggered operator commands (only fire on initial press)
///
/// Uses crossterm's keyboard enhancement for Release events when available.
/// Falls back to timeout-based release detection on terminals that don't support it.
/// With Release events, OS auto-repeat is ignored entirely; without them a
/// repeat only keeps the key alive.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::domain::input::{InputState, LogicalInput};
use crate::sim::theatre::Command;

/// After this duration without a Press/Repeat event, consider the key released.
/// Only used when the terminal doesn't report Release events.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

pub struct KeyboardState {
    /// Timestamp of last Press/Repeat event for each key.
    last_active: HashMap<KeyCode, Instant>,

    /// Keys that transitioned from "not held" → "held" during the
    /// most recent drain_events() call.
    fresh_presses: Vec<KeyCode>,

    ctrl_c: bool,

    /// Whether to honor Release events. Only true when keyboard
    /// enhancement is confirmed working.
    pub honor_release: bool,
}

fn logical_key(code: KeyCode) -> Option<LogicalInput> {
    match code {
        KeyCode::Up => Some(LogicalInput::Up),
        KeyCode::Down => Some(LogicalInput::Down),
        KeyCode::Left => Some(LogicalInput::Left),
        KeyCode::Right => Some(LogicalInput::Right),
        KeyCode::Char('1') => Some(LogicalInput::A),
        KeyCode::Char('2') => Some(LogicalInput::B),
        _ => None,
    }
}

fn command_key(code: KeyCode) -> Option<Command> {
    let KeyCode::Char(c) = code else {
        return None;
    };
    match c.to_ascii_lowercase() {
        'x' => Some(Command::ToggleReverse),
        's' => Some(Command::SpeedDown),
        'f' => Some(Command::SpeedUp),
        'e' => Some(Command::Celebrate),
        'g' => Some(Command::ToggleGravity),
        'a' => Some(Command::ToggleAnimation),
        'z' => Some(Command::DebugGravityJump),
        'u' => Some(Command::DebugTopEntryJump),
        _ => None,
    }
}

impl KeyboardState {
    pub fn new() -> Self {
        KeyboardState {
            last_active: HashMap::with_capacity(16),
            fresh_presses: Vec::with_capacity(8),
            ctrl_c: false,
            honor_release: false,
        }
    }

    /// Drain all pending terminal events and update key states.
    /// Call this once per frame, before the theatre tick.
    pub fn drain_events(&mut self) {
        self.begin_frame();

        // Read all available events without blocking
        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                self.handle_key(key, Instant::now());
            }
        }

        self.expire(Instant::now());
    }

    fn begin_frame(&mut self) {
        self.fresh_presses.clear();
        self.ctrl_c = false;
    }

    fn handle_key(&mut self, key: KeyEvent, now: Instant) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && matches!(key.code, KeyCode::Char('c' | 'C')) {
            self.ctrl_c = true;
            return;
        }
        match key.kind {
            KeyEventKind::Release if self.honor_release => {
                self.last_active.remove(&key.code);
            }
            KeyEventKind::Release => {
                // rely on timeout-based expiry instead
            }
            KeyEventKind::Repeat if self.honor_release => {}
            _ => {
                let was_held = self.is_held_at(key.code, now);
                self.last_active.insert(key.code, now);
                if !was_held {
                    self.fresh_presses.push(key.code);
                }
            }
        }
    }

    /// Expire keys that have timed out (fallback for terminals without Release)
    fn expire(&mut self, now: Instant) {
        if self.honor_release {
            return;
        }
        self.last_active.retain(|_, t| now.duration_since(*t) < HOLD_TIMEOUT);
    }

    /// Held keys as logical inputs.
    pub fn logical(&self) -> InputState {
        let now = Instant::now();
        let mut state = InputState::new();
        for &code in self.last_active.keys() {
            if let Some(input) = logical_key(code) {
                if self.is_held_at(code, now) {
                    state.set(input, true);
                }
            }
        }
        state
    }

    /// Commands pressed this frame, in press order.
    pub fn commands(&self) -> Vec<Command> {
        self.fresh_presses.iter().filter_map(|&c| command_key(c)).collect()
    }

    pub fn quit_requested(&self) -> bool {
        self.ctrl_c
            || self
                .fresh_presses
                .iter()
                .any(|c| matches!(c, KeyCode::Esc | KeyCode::Char('q' | 'Q')))
    }

    // ── Internal ──

    fn is_held_at(&self, code: KeyCode, now: Instant) -> bool {
        match self.last_active.get(&code) {
            Some(_) if self.honor_release => true,
            Some(t) => now.duration_since(*t) < HOLD_TIMEOUT,
            None => false,
        }
    }
}
