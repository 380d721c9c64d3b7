use crate::ops::{Command, MarkKind};

/// A key press as reported by the host: the typed key plus modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyChord {
    pub key: char,
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
    pub alt: bool,
}

impl KeyChord {
    pub fn new(key: char) -> Self {
        Self {
            key,
            ctrl: false,
            meta: false,
            shift: false,
            alt: false,
        }
    }

    pub fn ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn meta(mut self) -> Self {
        self.meta = true;
        self
    }

    pub fn shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn alt(mut self) -> Self {
        self.alt = true;
        self
    }

    /// Ctrl on most platforms, Cmd on macOS.
    fn primary(&self) -> bool {
        self.ctrl || self.meta
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shortcut {
    Command(Command),
    Undo,
    Redo,
}

pub fn shortcut_for(chord: KeyChord) -> Option<Shortcut> {
    if !chord.primary() || chord.alt {
        return None;
    }
    let shortcut = match (chord.key.to_ascii_lowercase(), chord.shift) {
        ('b', false) => Shortcut::Command(Command::ToggleMark(MarkKind::Bold)),
        ('i', false) => Shortcut::Command(Command::ToggleMark(MarkKind::Italic)),
        ('u', false) => Shortcut::Command(Command::ToggleMark(MarkKind::Underline)),
        ('z', false) => Shortcut::Undo,
        ('z', true) | ('y', false) => Shortcut::Redo,
        _ => return None,
    };
    Some(shortcut)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_formatting_and_history_keys() {
        assert_eq!(
            shortcut_for(KeyChord::new('b').ctrl()),
            Some(Shortcut::Command(Command::ToggleMark(MarkKind::Bold)))
        );
        assert_eq!(
            shortcut_for(KeyChord::new('I').meta()),
            Some(Shortcut::Command(Command::ToggleMark(MarkKind::Italic)))
        );
        assert_eq!(shortcut_for(KeyChord::new('z').ctrl()), Some(Shortcut::Undo));
        assert_eq!(shortcut_for(KeyChord::new('Z').ctrl().shift()), Some(Shortcut::Redo));
        assert_eq!(shortcut_for(KeyChord::new('y').meta()), Some(Shortcut::Redo));
    }

    #[test]
    fn ignores_plain_and_alt_chords() {
        assert_eq!(shortcut_for(KeyChord::new('b')), None);
        assert_eq!(shortcut_for(KeyChord::new('b').ctrl().alt()), None);
        assert_eq!(shortcut_for(KeyChord::new('q').ctrl()), None);
    }
}
