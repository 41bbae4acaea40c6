/// Keyboard state tracker.
///
/// Terminal keys are folded into logical `Key`s, then tracked in two layers:
///   - held: continuous, drives movement
///   - pressed this frame: edge-triggered, drives bombs and menus
///
/// Key releases come from crossterm's keyboard enhancement when the
/// terminal offers it. Elsewhere a key counts as released once its
/// auto-repeat stops for `HOLD_TIMEOUT`.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::domain::grid::Dir;

/// Silence after which a key without a Release event is let go.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Key {
    Move(Dir),
    Bomb,
    Confirm,
    Back,
    Quit,
}

impl Key {
    /// Arrows and WASD move, Space/X bombs, Enter confirms, Esc backs out, Q quits.
    pub fn from_code(code: KeyCode) -> Option<Key> {
        let key = match code {
            KeyCode::Up => Key::Move(Dir::Up),
            KeyCode::Down => Key::Move(Dir::Down),
            KeyCode::Left => Key::Move(Dir::Left),
            KeyCode::Right => Key::Move(Dir::Right),
            KeyCode::Enter => Key::Confirm,
            KeyCode::Esc => Key::Back,
            KeyCode::Char(c) => match c.to_ascii_lowercase() {
                'w' => Key::Move(Dir::Up),
                's' => Key::Move(Dir::Down),
                'a' => Key::Move(Dir::Left),
                'd' => Key::Move(Dir::Right),
                ' ' | 'x' => Key::Bomb,
                'q' => Key::Quit,
                _ => return None,
            },
            _ => return None,
        };
        Some(key)
    }
}

pub struct InputState {
    /// When each held key last produced a Press or Repeat.
    last_active: HashMap<Key, Instant>,

    /// Keys that went from "not held" to "held" during the most recent
    /// `drain_events()`. Cleared at the start of every drain.
    fresh_presses: Vec<Key>,

    ctrl_c: bool,

    /// Set by the loop once keyboard enhancement was pushed.
    pub honor_release: bool,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            last_active: HashMap::with_capacity(16),
            fresh_presses: Vec::with_capacity(8),
            ctrl_c: false,
            honor_release: false,
        }
    }

    /// Read every queued terminal event. Once per frame.
    /// Call this once per frame, before the simulation step.
    pub fn drain_events(&mut self) {
        self.begin_frame();

        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                self.record(key, Instant::now());
            }
        }

        // Repeat has stopped: treat as released.
        let now = Instant::now();
        self.last_active.retain(|_, t| now.duration_since(*t) < HOLD_TIMEOUT);
    }

    fn begin_frame(&mut self) {
        self.fresh_presses.clear();
        self.ctrl_c = false;
    }

    fn record(&mut self, key: KeyEvent, at: Instant) {
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('C'))
        {
            self.ctrl_c = true;
            return;
        }
        let Some(logical) = Key::from_code(key.code) else { return };

        match key.kind {
            KeyEventKind::Release if self.honor_release => {
                self.last_active.remove(&logical);
            }
            // Without enhancement, rely on timeout-based expiry instead.
            KeyEventKind::Release => {}
            _ => {
                let was_held = self.is_held_at(logical, at);
                self.last_active.insert(logical, at);
                if !was_held {
                    self.fresh_presses.push(logical);
                }
            }
        }
    }

    pub fn is_held(&self, key: Key) -> bool {
        self.is_held_at(key, Instant::now())
    }

    /// Pressed since the previous drain.
    pub fn was_pressed(&self, key: Key) -> bool {
        self.fresh_presses.contains(&key)
    }

    pub fn ctrl_c_pressed(&self) -> bool {
        self.ctrl_c
    }

    /// First held direction in Up, Down, Left, Right order.
    pub fn movement(&self) -> Option<Dir> {
        Dir::ALL.into_iter().find(|&d| self.is_held(Key::Move(d)))
    }

    // ── Internal ──

    fn is_held_at(&self, key: Key, now: Instant) -> bool {
        self.last_active
            .get(&key)
            .map(|t| now.saturating_duration_since(*t) < HOLD_TIMEOUT)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn wasd_and_arrows_map_to_the_same_moves() {
        assert_eq!(Key::from_code(KeyCode::Char('W')), Some(Key::Move(Dir::Up)));
        assert_eq!(Key::from_code(KeyCode::Up), Some(Key::Move(Dir::Up)));
        assert_eq!(Key::from_code(KeyCode::Char(' ')), Some(Key::Bomb));
        assert_eq!(Key::from_code(KeyCode::Char('x')), Some(Key::Bomb));
        assert_eq!(Key::from_code(KeyCode::Char('z')), None);
    }

    #[test]
    fn repeat_events_do_not_refire() {
        let mut kb = InputState::new();
        let t = Instant::now();
        kb.record(press(KeyCode::Char(' ')), t);
        assert!(kb.was_pressed(Key::Bomb));

        kb.begin_frame();
        kb.record(press(KeyCode::Char(' ')), t);
        assert!(!kb.was_pressed(Key::Bomb));
        assert!(kb.is_held_at(Key::Bomb, t));
    }

    #[test]
    fn release_honored_only_with_enhancement() {
        let mut kb = InputState::new();
        let t = Instant::now();
        let mut release = press(KeyCode::Left);
        release.kind = KeyEventKind::Release;

        kb.record(press(KeyCode::Left), t);
        kb.record(release, t);
        assert!(kb.is_held_at(Key::Move(Dir::Left), t));

        kb.honor_release = true;
        kb.record(release, t);
        assert!(!kb.is_held_at(Key::Move(Dir::Left), t));
    }

    #[test]
    fn ctrl_c_is_flagged_per_frame() {
        let mut kb = InputState::new();
        kb.record(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL), Instant::now());
        assert!(kb.ctrl_c_pressed());
        assert!(!kb.was_pressed(Key::Move(Dir::Right)));
        kb.begin_frame();
        assert!(!kb.ctrl_c_pressed());
    }

    #[test]
    fn held_keys_time_out() {
        let mut kb = InputState::new();
        let t = Instant::now();
        kb.record(press(KeyCode::Char('d')), t);
        assert!(kb.is_held_at(Key::Move(Dir::Right), t + Duration::from_millis(100)));
        assert!(!kb.is_held_at(Key::Move(Dir::Right), t + Duration::from_millis(200)));
    }
}
