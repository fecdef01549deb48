#![forbid(unsafe_code)]

//! Key bindings for the interactive shell.
//!
//! | Key            | Action                 |
//! |----------------|------------------------|
//! | `m`            | Mount / unmount        |
//! | `r`            | Remount, while offered |
//! | `+` / `=`      | Count +10              |
//! | `-` / `_`      | Count -10              |
//! | `s`            | Start / stop stress    |
//! | `q`, Esc, ^C   | Quit                   |

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use mountlab_core::{Controls, Intent};

/// What a key press asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Forward to the lab.
    Intent(Intent),
    /// Leave the shell.
    Quit,
}

/// Resolve a key event against the controls currently on screen.
///
/// Releases and repeats are ignored, and `r` does nothing unless the remount
/// button is offered.
pub fn map_key(key: &KeyEvent, controls: &Controls) -> Option<Action> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') | KeyCode::Char('C') => Some(Action::Quit),
            _ => None,
        };
    }
    let action = match key.code {
        KeyCode::Esc => Action::Quit,
        KeyCode::Char(c) => match c.to_ascii_lowercase() {
            'q' => Action::Quit,
            'm' => Action::Intent(Intent::ToggleMount),
            'r' if controls.remount_enabled => Action::Intent(Intent::Remount),
            's' => Action::Intent(Intent::ToggleStress),
            '+' | '=' => Action::Intent(Intent::INCREASE),
            '-' | '_' => Action::Intent(Intent::DECREASE),
            _ => return None,
        },
        _ => return None,
    };
    Some(action)
}

/// One-line key help shown under the grid.
pub const KEY_HELP: &str = "m mount/unmount  r remount  +/- count  s stress  q quit";
