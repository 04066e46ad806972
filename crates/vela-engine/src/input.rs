//! Keyboard state capture.
//!
//! The host forwards key events into [`InputCapture`]; systems read the held
//! set and the per-tick pressed/released edges. Keys are identified by
//! DOM-style physical key codes (`"KeyW"`, `"ArrowUp"`, `"Space"`).

use std::collections::HashSet;

/// Keys that move a controlled entity, grouped by direction.
pub mod keys {
    /// Toward `-Z`.
    pub const FORWARD: &[&str] = &["KeyW", "ArrowUp"];
    /// Toward `+Z`.
    pub const BACKWARD: &[&str] = &["KeyS", "ArrowDown"];
    /// Toward `-X`.
    pub const LEFT: &[&str] = &["KeyA", "ArrowLeft"];
    /// Toward `+X`.
    pub const RIGHT: &[&str] = &["KeyD", "ArrowRight"];
    /// Upward impulse, only while grounded.
    pub const JUMP: &str = "Space";
}

/// A single key transition as delivered by the host.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct KeyEvent {
    /// Physical key code, e.g. `"KeyW"`.
    pub code: String,
    /// `true` for key down, `false` for key up.
    pub pressed: bool,
    /// Auto-repeat of a held key.
    #[serde(default)]
    pub repeat: bool,
}

impl KeyEvent {
    /// A fresh key-down event.
    pub fn down(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            pressed: true,
            repeat: false,
        }
    }

    /// A key-up event.
    pub fn up(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            pressed: false,
            repeat: false,
        }
    }
}

/// Held keys plus the edges since the last [`update`](Self::update).
#[derive(Debug, Clone)]
pub struct InputCapture {
    held: HashSet<String>,
    pressed: HashSet<String>,
    released: HashSet<String>,
    attached: bool,
}

impl Default for InputCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl InputCapture {
    /// A capture that is attached and accepting events.
    pub fn new() -> Self {
        Self {
            held: HashSet::new(),
            pressed: HashSet::new(),
            released: HashSet::new(),
            attached: true,
        }
    }

    /// Record `code` as held. Ignored once detached.
    pub fn on_key_down(&mut self, code: &str) {
        if !self.attached {
            return;
        }
        // A down for a key already held is auto-repeat, not a new press.
        if self.held.insert(code.to_owned()) {
            self.pressed.insert(code.to_owned());
        }
    }

    /// Record `code` as released. A key that was not held produces no edge.
    pub fn on_key_up(&mut self, code: &str) {
        if !self.attached {
            return;
        }
        if self.held.remove(code) {
            self.released.insert(code.to_owned());
        }
    }

    /// Route a host event to [`on_key_down`](Self::on_key_down) or
    /// [`on_key_up`](Self::on_key_up). Auto-repeat downs are dropped.
    pub fn handle_event(&mut self, event: &KeyEvent) {
        match (event.pressed, event.repeat) {
            (true, false) => self.on_key_down(&event.code),
            (true, true) => {}
            (false, _) => self.on_key_up(&event.code),
        }
    }

    /// Whether `code` is currently held.
    pub fn is_down(&self, code: &str) -> bool {
        self.held.contains(code)
    }

    /// True only during the tick in which `code` went down.
    pub fn is_pressed(&self, code: &str) -> bool {
        self.pressed.contains(code)
    }

    /// True only during the tick in which `code` went up.
    pub fn is_released(&self, code: &str) -> bool {
        self.released.contains(code)
    }

    /// Whether any of `codes` is held.
    pub fn any_down(&self, codes: &[&str]) -> bool {
        codes.iter().any(|c| self.is_down(c))
    }

    /// Clear the per-tick edges. Called once per simulation tick after the
    /// systems have read them.
    pub fn update(&mut self) {
        self.pressed.clear();
        self.released.clear();
    }

    /// Stop accepting events and forget all key state.
    pub fn cleanup(&mut self) {
        if self.attached {
            tracing::debug!("input capture detached");
        }
        self.attached = false;
        self.held.clear();
        self.pressed.clear();
        self.released.clear();
    }

    /// `false` after [`cleanup`](Self::cleanup).
    pub fn is_attached(&self) -> bool {
        self.attached
    }
}
