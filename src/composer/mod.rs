pub mod buffer;
mod keys;
mod machine;
pub mod paste;
pub mod resize;
pub mod selection;
pub mod shortcut;
mod state;
#[cfg(test)]
mod tests;
mod wrap;

pub use buffer::ComposerBuffer;
pub use keys::InputResult;
pub use machine::{Composer, ComposerHandle, TextAreaLayout};
pub use paste::{ClipboardItem, PasteEvent};
pub use resize::{ComposerHeight, CompositionMode};
pub use selection::{Anchored, Selection};
pub use shortcut::{KeyBinding, ShortcutRegistry, ShortcutSubscription};
pub use state::ComposerState;
pub use wrap::{VisualLine, wrap_lines};
