// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Keyboard shortcut handling.
//!
//! Defaults are written the same way users write overrides in the practice
//! file: a key name and an action name, so both go through one parser.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crossterm::event::{KeyCode, KeyModifiers};
use tracing::warn;

use super::ControlAction;

/// Help section a binding is listed under
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeyCategory {
    Transport,
    Tempo,
    Volume,
    View,
    /// Added from the practice file
    Custom,
}

impl fmt::Display for KeyCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KeyCategory::Transport => "Transport",
            KeyCategory::Tempo => "Tempo",
            KeyCategory::Volume => "Volume",
            KeyCategory::View => "View",
            KeyCategory::Custom => "Custom",
        };
        f.write_str(name)
    }
}

/// (key, action, help text, section)
const DEFAULT_BINDINGS: &[(&str, &str, &str, KeyCategory)] = &[
    ("space", "toggle_play", "Play/Pause", KeyCategory::Transport),
    ("enter", "play_together", "Play Video + Metronome", KeyCategory::Transport),
    ("m", "metronome_only", "Metronome Only", KeyCategory::Transport),
    ("p", "pause", "Pause", KeyCategory::Transport),
    ("esc", "stop", "Stop", KeyCategory::Transport),
    ("up", "tempo+1", "Tempo +1 BPM", KeyCategory::Tempo),
    ("down", "tempo-1", "Tempo -1 BPM", KeyCategory::Tempo),
    ("shift+up", "tempo+10", "Tempo +10 BPM", KeyCategory::Tempo),
    ("shift+down", "tempo-10", "Tempo -10 BPM", KeyCategory::Tempo),
    ("t", "tap_tempo", "Tap Tempo", KeyCategory::Tempo),
    ("b", "cycle_time_signature", "Next Time Signature", KeyCategory::Tempo),
    ("d", "cycle_subdivision", "Next Subdivision", KeyCategory::Tempo),
    ("e", "enter_tempo", "Type Tempo", KeyCategory::Tempo),
    ("y", "vote_up", "Tempo Is Right", KeyCategory::Tempo),
    ("n", "vote_down", "Tempo Is Wrong", KeyCategory::Tempo),
    ("+", "volume+5", "Volume Up", KeyCategory::Volume),
    ("=", "volume+5", "Volume Up", KeyCategory::Volume),
    ("-", "volume-5", "Volume Down", KeyCategory::Volume),
    ("?", "toggle_help", "Toggle Help", KeyCategory::View),
    ("h", "toggle_help", "Toggle Help", KeyCategory::View),
    ("q", "quit", "Quit", KeyCategory::View),
    ("ctrl+c", "quit", "Quit", KeyCategory::View),
];

/// A key plus the modifiers held with it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shortcut {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl Shortcut {
    pub fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        Self { code, modifiers }
    }

    /// Shortcut without modifiers
    pub fn key(code: KeyCode) -> Self {
        Self::new(code, KeyModifiers::NONE)
    }

    /// Parse a key name from the practice file.
    ///
    /// Examples: `q`, `space`, `enter`, `f5`, `shift+up`, `ctrl+c`. A lone
    /// `+` is the plus key itself.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if let Some(c) = single_char(text) {
            return Some(Self::key(KeyCode::Char(c)));
        }

        let (prefix, key) = text.rsplit_once('+')?;
        let mut modifiers = KeyModifiers::NONE;
        for part in prefix.split('+') {
            modifiers |= match part.to_ascii_lowercase().as_str() {
                "ctrl" | "control" => KeyModifiers::CONTROL,
                "shift" => KeyModifiers::SHIFT,
                "alt" => KeyModifiers::ALT,
                _ => return None,
            };
        }
        Some(Self::new(parse_key(key)?, modifiers))
    }
}

impl fmt::Display for Shortcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (flag, name) in [
            (KeyModifiers::CONTROL, "Ctrl+"),
            (KeyModifiers::ALT, "Alt+"),
            (KeyModifiers::SHIFT, "Shift+"),
        ] {
            if self.modifiers.contains(flag) {
                f.write_str(name)?;
            }
        }
        match self.code {
            KeyCode::Char(' ') => f.write_str("Space"),
            KeyCode::Char(c) => write!(f, "{}", c.to_uppercase()),
            KeyCode::F(n) => write!(f, "F{}", n),
            KeyCode::Up => f.write_str("↑"),
            KeyCode::Down => f.write_str("↓"),
            KeyCode::Left => f.write_str("←"),
            KeyCode::Right => f.write_str("→"),
            KeyCode::Enter => f.write_str("Enter"),
            KeyCode::Esc => f.write_str("Esc"),
            KeyCode::Tab => f.write_str("Tab"),
            KeyCode::Backspace => f.write_str("Backspace"),
            _ => f.write_str("?"),
        }
    }
}

fn single_char(text: &str) -> Option<char> {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

fn parse_key(name: &str) -> Option<KeyCode> {
    if let Some(c) = single_char(name) {
        return Some(KeyCode::Char(c));
    }
    let code = match name.to_ascii_lowercase().as_str() {
        "space" => KeyCode::Char(' '),
        "enter" | "return" => KeyCode::Enter,
        "esc" | "escape" => KeyCode::Esc,
        "tab" => KeyCode::Tab,
        "backspace" => KeyCode::Backspace,
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,
        other => {
            let n: u8 = other.strip_prefix('f')?.parse().ok()?;
            if !(1..=12).contains(&n) {
                return None;
            }
            KeyCode::F(n)
        }
    };
    Some(code)
}

/// A shortcut bound to an action
#[derive(Debug, Clone)]
pub struct KeyBinding {
    pub shortcut: Shortcut,
    pub action: ControlAction,
    /// Help text
    pub description: String,
    pub category: KeyCategory,
}

/// Key map for the terminal front end
#[derive(Debug, Clone, Default)]
pub struct KeyboardController {
    bindings: HashMap<Shortcut, KeyBinding>,
}

impl KeyboardController {
    /// Empty key map
    pub fn new() -> Self {
        Self::default()
    }

    /// Key map with the built-in bindings
    pub fn with_defaults() -> Self {
        let mut controller = Self::new();
        for &(key, action, description, category) in DEFAULT_BINDINGS {
            if let (Some(shortcut), Some(action)) = (Shortcut::parse(key), ControlAction::from_name(action)) {
                controller.bind(shortcut, action, description, category);
            }
        }
        controller
    }

    /// Bind a shortcut, replacing any previous binding for it
    pub fn bind(
        &mut self,
        shortcut: Shortcut,
        action: ControlAction,
        description: impl Into<String>,
        category: KeyCategory,
    ) {
        self.bindings.insert(
            shortcut,
            KeyBinding {
                shortcut,
                action,
                description: description.into(),
                category,
            },
        );
    }

    /// Apply `key: action` overrides from the practice file.
    ///
    /// Entries that fail to parse are logged and skipped. Returns how many
    /// were applied.
    pub fn apply_overrides(&mut self, overrides: &HashMap<String, String>) -> usize {
        let mut applied = 0;
        for (key, name) in overrides {
            let Some(shortcut) = Shortcut::parse(key) else {
                warn!("Ignoring binding for unknown key {:?}", key);
                continue;
            };
            let Some(action) = ControlAction::from_name(name) else {
                warn!("Ignoring unknown action {:?} for key {:?}", name, key);
                continue;
            };
            self.bind(shortcut, action, name.trim(), KeyCategory::Custom);
            applied += 1;
        }
        applied
    }

    /// Action bound to a key press.
    ///
    /// Terminals report shifted punctuation such as `?` or `+` with Shift
    /// set, so character keys fall back to an unshifted lookup.
    pub fn action_for(&self, code: KeyCode, modifiers: KeyModifiers) -> Option<ControlAction> {
        let binding = self.bindings.get(&Shortcut::new(code, modifiers)).or_else(|| match code {
            KeyCode::Char(_) if modifiers.contains(KeyModifiers::SHIFT) => self
                .bindings
                .get(&Shortcut::new(code, modifiers.difference(KeyModifiers::SHIFT))),
            _ => None,
        })?;
        Some(binding.action.clone())
    }

    /// Bindings per help section, sorted by key label
    pub fn sections(&self) -> BTreeMap<KeyCategory, Vec<&KeyBinding>> {
        let mut sections: BTreeMap<KeyCategory, Vec<&KeyBinding>> = BTreeMap::new();
        for binding in self.bindings.values() {
            sections.entry(binding.category).or_default().push(binding);
        }
        for bindings in sections.values_mut() {
            bindings.sort_by_cached_key(|b| b.shortcut.to_string());
        }
        sections
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(controller: &KeyboardController, code: KeyCode) -> Option<ControlAction> {
        controller.action_for(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_every_default_binding_parses() {
        let controller = KeyboardController::with_defaults();
        assert_eq!(controller.len(), DEFAULT_BINDINGS.len());
    }

    #[test]
    fn test_default_keys() {
        let controller = KeyboardController::with_defaults();
        assert_eq!(press(&controller, KeyCode::Char(' ')), Some(ControlAction::TogglePlay));
        assert_eq!(press(&controller, KeyCode::Enter), Some(ControlAction::PlayTogether));
        assert_eq!(press(&controller, KeyCode::Esc), Some(ControlAction::Stop));
        assert_eq!(press(&controller, KeyCode::Down), Some(ControlAction::AdjustTempo(-1)));
        assert_eq!(
            controller.action_for(KeyCode::Up, KeyModifiers::SHIFT),
            Some(ControlAction::AdjustTempo(10))
        );
        assert_eq!(
            controller.action_for(KeyCode::Char('c'), KeyModifiers::CONTROL),
            Some(ControlAction::Quit)
        );
        assert_eq!(press(&controller, KeyCode::Char('c')), None);
    }

    #[test]
    fn test_shifted_punctuation() {
        let controller = KeyboardController::with_defaults();
        assert_eq!(
            controller.action_for(KeyCode::Char('?'), KeyModifiers::SHIFT),
            Some(ControlAction::ToggleHelp)
        );
        assert_eq!(
            controller.action_for(KeyCode::Char('+'), KeyModifiers::SHIFT),
            ControlAction::from_name("volume+5")
        );
        // Arrows keep their own shifted binding
        assert_eq!(
            controller.action_for(KeyCode::Down, KeyModifiers::SHIFT),
            Some(ControlAction::AdjustTempo(-10))
        );
    }

    #[test]
    fn test_parse_shortcut() {
        let shift_up = Shortcut::new(KeyCode::Up, KeyModifiers::SHIFT);
        let ctrl_c = Shortcut::new(KeyCode::Char('c'), KeyModifiers::CONTROL);

        assert_eq!(Shortcut::parse("q"), Some(Shortcut::key(KeyCode::Char('q'))));
        assert_eq!(Shortcut::parse("+"), Some(Shortcut::key(KeyCode::Char('+'))));
        assert_eq!(Shortcut::parse(" space "), Some(Shortcut::key(KeyCode::Char(' '))));
        assert_eq!(Shortcut::parse("Shift+Up"), Some(shift_up));
        assert_eq!(Shortcut::parse("ctrl+c"), Some(ctrl_c));
        assert_eq!(Shortcut::parse("f5"), Some(Shortcut::key(KeyCode::F(5))));
        assert_eq!(
            Shortcut::parse("ctrl+shift+left"),
            Some(Shortcut::new(KeyCode::Left, KeyModifiers::CONTROL | KeyModifiers::SHIFT))
        );

        assert_eq!(Shortcut::parse("f13"), None);
        assert_eq!(Shortcut::parse("hyper+x"), None);
        assert_eq!(Shortcut::parse("nonsense"), None);
    }

    #[test]
    fn test_apply_overrides() {
        let mut controller = KeyboardController::with_defaults();
        let mut overrides = HashMap::new();
        overrides.insert("x".to_string(), "tap_tempo".to_string());
        overrides.insert("right".to_string(), "tempo+5".to_string());
        overrides.insert("y".to_string(), "launch_rocket".to_string());
        overrides.insert("meta+z".to_string(), "quit".to_string());

        assert_eq!(controller.apply_overrides(&overrides), 2);
        assert_eq!(press(&controller, KeyCode::Char('x')), Some(ControlAction::TapTempo));
        assert_eq!(press(&controller, KeyCode::Right), Some(ControlAction::AdjustTempo(5)));
        assert_eq!(press(&controller, KeyCode::Char('y')), None);
        assert!(controller.sections().contains_key(&KeyCategory::Custom));
    }

    #[test]
    fn test_override_replaces_default() {
        let mut controller = KeyboardController::with_defaults();
        let overrides = HashMap::from([("t".to_string(), "stop".to_string())]);
        controller.apply_overrides(&overrides);
        assert_eq!(press(&controller, KeyCode::Char('t')), Some(ControlAction::Stop));
        assert_eq!(controller.len(), DEFAULT_BINDINGS.len());
    }

    #[test]
    fn test_shortcut_labels() {
        assert_eq!(Shortcut::key(KeyCode::Char(' ')).to_string(), "Space");
        assert_eq!(
            Shortcut::new(KeyCode::Char('c'), KeyModifiers::CONTROL).to_string(),
            "Ctrl+C"
        );
        assert_eq!(Shortcut::new(KeyCode::Up, KeyModifiers::SHIFT).to_string(), "Shift+↑");
        assert_eq!(Shortcut::key(KeyCode::F(5)).to_string(), "F5");
    }

    #[test]
    fn test_sections() {
        let controller = KeyboardController::with_defaults();
        let sections = controller.sections();
        let names: Vec<String> = sections.keys().map(|c| c.to_string()).collect();
        assert_eq!(names, ["Transport", "Tempo", "Volume", "View"]);
        assert_eq!(sections[&KeyCategory::Transport].len(), 5);
    }
}
