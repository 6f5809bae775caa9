//! Process-wide keyboard shortcuts with scoped registration.
//!
//! A component subscribes a binding and holds the returned
//! [`ShortcutSubscription`]; dropping it removes the binding. The event loop
//! offers every key to [`ShortcutRegistry::dispatch`] before normal focus
//! routing, so a subscribed shortcut fires no matter what has focus.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyBinding {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeyBinding {
    #[must_use]
    pub const fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        Self { code, modifiers }
    }

    /// Letters match case-insensitively since terminals report Shift+E as
    /// either `e` or `E`.
    #[must_use]
    pub fn matches(&self, key: &KeyEvent) -> bool {
        if key.kind == KeyEventKind::Release || key.modifiers != self.modifiers {
            return false;
        }
        match (self.code, key.code) {
            (KeyCode::Char(a), KeyCode::Char(b)) => a.eq_ignore_ascii_case(&b),
            (a, b) => a == b,
        }
    }
}

/// Cmd on macOS, Ctrl elsewhere.
#[must_use]
pub fn platform_modifier() -> KeyModifiers {
    if cfg!(target_os = "macos") {
        KeyModifiers::SUPER
    } else {
        KeyModifiers::CONTROL
    }
}

/// Platform modifier + Shift + E.
#[must_use]
pub fn toggle_expand_binding() -> KeyBinding {
    KeyBinding::new(KeyCode::Char('e'), platform_modifier() | KeyModifiers::SHIFT)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShortcutId(u64);

#[derive(Debug, Default)]
struct Bindings {
    next_id: u64,
    entries: Vec<(ShortcutId, KeyBinding)>,
}

/// Shared table of active shortcuts. Cloning shares the table.
#[derive(Debug, Clone, Default)]
pub struct ShortcutRegistry {
    inner: Rc<RefCell<Bindings>>,
}

impl ShortcutRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, binding: KeyBinding) -> ShortcutSubscription {
        let mut inner = self.inner.borrow_mut();
        let id = ShortcutId(inner.next_id);
        inner.next_id += 1;
        inner.entries.push((id, binding));
        ShortcutSubscription {
            id,
            registry: Rc::downgrade(&self.inner),
        }
    }

    /// The most recent live subscription matching `key`.
    #[must_use]
    pub fn dispatch(&self, key: &KeyEvent) -> Option<ShortcutId> {
        self.inner
            .borrow()
            .entries
            .iter()
            .rev()
            .find(|(_, binding)| binding.matches(key))
            .map(|(id, _)| *id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Live registration; released on drop.
#[derive(Debug)]
pub struct ShortcutSubscription {
    id: ShortcutId,
    registry: Weak<RefCell<Bindings>>,
}

impl ShortcutSubscription {
    #[must_use]
    pub fn id(&self) -> ShortcutId {
        self.id
    }
}

impl Drop for ShortcutSubscription {
    fn drop(&mut self) {
        if let Some(inner) = self.registry.upgrade() {
            inner.borrow_mut().entries.retain(|(id, _)| *id != self.id);
        }
    }
}
