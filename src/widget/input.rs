//! Input control: auto-grow and the Ctrl+Enter submit chord.

use super::{ChatWidget, SubmitOutcome};

/// Text and height of the input control.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct InputState {
    pub(crate) text: String,
    pub(crate) height: u32,
}

/// Key identity, reduced to what the widget reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Char(char),
    Other,
}

/// A key press with modifier state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPress {
    pub key: Key,
    pub ctrl: bool,
    pub shift: bool,
}

impl KeyPress {
    #[must_use]
    pub fn new(key: Key) -> Self {
        Self {
            key,
            ctrl: false,
            shift: false,
        }
    }

    #[must_use]
    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    #[must_use]
    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    /// Ctrl+Enter sends the message.
    #[must_use]
    pub fn is_submit_chord(&self) -> bool {
        self.ctrl && self.key == Key::Enter
    }
}

impl ChatWidget {
    /// The input changed: store it and recompute the control height.
    pub fn on_input(&self, text: &str) {
        let display = &self.inner.config.display;
        let natural = self.inner.surface.content_height(text, display.line_height);
        let height = natural.min(display.input_max_height);
        {
            let mut input = self.input();
            input.text = text.to_string();
            input.height = height;
        }
        self.inner.surface.set_input(text, height);
    }

    /// Handle a key press in the input. Returns the submission outcome when
    /// the press was the submit chord.
    pub async fn on_key(&self, press: KeyPress) -> Option<SubmitOutcome> {
        if press.is_submit_chord() {
            Some(self.submit().await)
        } else {
            None
        }
    }

    #[must_use]
    pub fn input_text(&self) -> String {
        self.input().text.clone()
    }

    #[must_use]
    pub fn input_height(&self) -> u32 {
        self.input().height
    }
}
