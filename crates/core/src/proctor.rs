//! Proctoring rules: which input events are allowed, swallowed, or end the attempt.

use crate::model::SubmitReason;

/// Keys the guard distinguishes. Anything else is `Other`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Tab,
    Enter,
    Escape,
    Up,
    Down,
    Left,
    Right,
    Backspace,
    Delete,
    Home,
    End,
    PageUp,
    PageDown,
    Function(u8),
    Meta,
    PrintScreen,
    Other(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPress {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyPress {
    #[must_use]
    pub fn plain(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::default(),
        }
    }

    #[must_use]
    pub fn with_ctrl(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers {
                ctrl: true,
                ..Modifiers::default()
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipboardAction {
    Copy,
    Cut,
    Paste,
    SelectStart,
}

/// Input event observed while an attempt is running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProctorEvent {
    FullscreenChanged { active: bool },
    KeyDown(KeyPress),
    ContextMenu,
    Clipboard(ClipboardAction),
}

impl ProctorEvent {
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::FullscreenChanged { .. } => EventKind::FullscreenChange,
            Self::KeyDown(_) => EventKind::KeyDown,
            Self::ContextMenu => EventKind::ContextMenu,
            Self::Clipboard(_) => EventKind::Clipboard,
        }
    }
}

/// Listener channels an event source exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    FullscreenChange,
    KeyDown,
    ContextMenu,
    Clipboard,
}

impl EventKind {
    pub const ALL: [Self; 4] = [
        Self::FullscreenChange,
        Self::KeyDown,
        Self::ContextMenu,
        Self::Clipboard,
    ];
}

/// What should happen to an event. Ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verdict {
    Allow,
    Suppress,
    Violation(SubmitReason),
}

impl Verdict {
    #[must_use]
    pub fn is_suppressed(&self) -> bool {
        !matches!(self, Self::Allow)
    }

    /// Combine two verdicts, keeping the more severe one.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        self.max(other)
    }
}

/// Classify a key press.
///
/// Meta is checked first so that meta+letter is a violation, not a printable key.
#[must_use]
pub fn classify_key(press: &KeyPress) -> Verdict {
    if press.key == Key::Meta || press.modifiers.meta {
        return Verdict::Violation(SubmitReason::RuleViolation);
    }

    let navigation = matches!(
        press.key,
        Key::Tab
            | Key::Enter
            | Key::Escape
            | Key::Up
            | Key::Down
            | Key::Left
            | Key::Right
            | Key::Backspace
            | Key::Delete
            | Key::Home
            | Key::End
            | Key::PageUp
            | Key::PageDown
    );
    let printable = matches!(press.key, Key::Char(_)) && !press.modifiers.ctrl;
    if printable || navigation {
        return Verdict::Allow;
    }

    if matches!(press.key, Key::Function(_) | Key::PrintScreen) {
        return Verdict::Violation(SubmitReason::RuleViolation);
    }

    Verdict::Suppress
}

/// Classify any proctored event.
#[must_use]
pub fn evaluate(event: &ProctorEvent) -> Verdict {
    match event {
        ProctorEvent::FullscreenChanged { active: true } => Verdict::Allow,
        ProctorEvent::FullscreenChanged { active: false } => {
            Verdict::Violation(SubmitReason::LeftFullscreen)
        }
        ProctorEvent::KeyDown(press) => classify_key(press),
        ProctorEvent::ContextMenu | ProctorEvent::Clipboard(_) => Verdict::Suppress,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn printable_and_navigation_keys_pass() {
        assert_eq!(classify_key(&KeyPress::plain(Key::Char('a'))), Verdict::Allow);
        assert_eq!(classify_key(&KeyPress::plain(Key::Char('3'))), Verdict::Allow);
        assert_eq!(classify_key(&KeyPress::plain(Key::Escape)), Verdict::Allow);
        assert_eq!(classify_key(&KeyPress::plain(Key::PageDown)), Verdict::Allow);
    }

    #[test]
    fn ctrl_shortcuts_are_suppressed() {
        assert_eq!(
            classify_key(&KeyPress::with_ctrl(Key::Char('c'))),
            Verdict::Suppress
        );
        assert_eq!(
            classify_key(&KeyPress::plain(Key::Other("Insert".into()))),
            Verdict::Suppress
        );
    }

    #[test]
    fn meta_and_function_keys_are_violations() {
        let violation = Verdict::Violation(SubmitReason::RuleViolation);
        assert_eq!(classify_key(&KeyPress::plain(Key::Meta)), violation);
        assert_eq!(classify_key(&KeyPress::plain(Key::Function(12))), violation);
        assert_eq!(classify_key(&KeyPress::plain(Key::PrintScreen)), violation);

        let meta_letter = KeyPress {
            key: Key::Char('v'),
            modifiers: Modifiers {
                meta: true,
                ..Modifiers::default()
            },
        };
        assert_eq!(classify_key(&meta_letter), violation);
    }

    #[test]
    fn leaving_fullscreen_is_a_violation() {
        assert_eq!(
            evaluate(&ProctorEvent::FullscreenChanged { active: false }),
            Verdict::Violation(SubmitReason::LeftFullscreen)
        );
        assert_eq!(
            evaluate(&ProctorEvent::FullscreenChanged { active: true }),
            Verdict::Allow
        );
    }

    #[test]
    fn context_menu_and_clipboard_are_swallowed() {
        assert_eq!(evaluate(&ProctorEvent::ContextMenu), Verdict::Suppress);
        assert_eq!(
            evaluate(&ProctorEvent::Clipboard(ClipboardAction::Paste)),
            Verdict::Suppress
        );
    }

    #[test]
    fn merge_keeps_most_severe() {
        let v = Verdict::Violation(SubmitReason::LeftFullscreen);
        assert_eq!(Verdict::Allow.merge(Verdict::Suppress), Verdict::Suppress);
        assert_eq!(Verdict::Suppress.merge(v), v);
    }
}
