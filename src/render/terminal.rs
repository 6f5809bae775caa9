//! Terminal setup, teardown and full-screen drawing.

use super::StyledLine;
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{
        DisableBracketedPaste, DisableFocusChange, EnableBracketedPaste, EnableFocusChange,
        KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute, queue,
    terminal::{
        self, BeginSynchronizedUpdate, Clear, ClearType, EndSynchronizedUpdate,
        EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
        supports_keyboard_enhancement,
    },
};
use std::io::{self, Write};

/// One frame: rows from the top of the screen plus the cursor.
#[derive(Debug, Default)]
pub struct Screen {
    pub rows: Vec<StyledLine>,
    /// Hidden when None.
    pub cursor: Option<(u16, u16)>,
}

/// Raw mode, alternate screen, bracketed paste and (when supported)
/// disambiguated escape codes so Shift+Enter is reported. Restored on drop.
pub struct Terminal {
    stdout: io::Stdout,
    supports_enhancement: bool,
    width: u16,
    height: u16,
}

impl Terminal {
    pub fn enter() -> io::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(
            stdout,
            EnterAlternateScreen,
            EnableBracketedPaste,
            EnableFocusChange
        )?;

        let supports_enhancement = supports_keyboard_enhancement().unwrap_or(false);
        if supports_enhancement {
            execute!(
                stdout,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES)
            )?;
        }

        let (width, height) = terminal::size()?;
        Ok(Self {
            stdout,
            supports_enhancement,
            width,
            height,
        })
    }

    pub fn update_size(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
    }

    #[must_use]
    pub fn size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    /// Redraw everything inside a synchronized update.
    #[allow(clippy::cast_possible_truncation)]
    pub fn draw(&mut self, screen: &Screen) -> io::Result<()> {
        let out = &mut self.stdout;
        queue!(out, BeginSynchronizedUpdate, Hide)?;
        for (row, line) in screen.rows.iter().take(usize::from(self.height)).enumerate() {
            queue!(out, MoveTo(0, row as u16), Clear(ClearType::CurrentLine))?;
            line.clone().truncated(usize::from(self.width)).write_to(out)?;
        }
        let drawn = screen.rows.len().min(usize::from(self.height)) as u16;
        if drawn < self.height {
            queue!(out, MoveTo(0, drawn), Clear(ClearType::FromCursorDown))?;
        }
        if let Some((x, y)) = screen.cursor {
            queue!(out, MoveTo(x, y), Show)?;
        }
        queue!(out, EndSynchronizedUpdate)?;
        out.flush()
    }

    fn restore(&mut self) -> io::Result<()> {
        let _ = execute!(self.stdout, EndSynchronizedUpdate);
        execute!(self.stdout, DisableBracketedPaste, DisableFocusChange)?;
        if self.supports_enhancement {
            execute!(self.stdout, PopKeyboardEnhancementFlags)?;
        }
        execute!(self.stdout, LeaveAlternateScreen, Show)?;
        disable_raw_mode()
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        if let Err(e) = self.restore() {
            tracing::error!("Failed to restore terminal: {e}");
        }
    }
}

/// Restores the terminal before the default panic output, and the original
/// hook on drop.
pub struct PanicHookGuard {
    original_hook: std::sync::Arc<dyn Fn(&std::panic::PanicHookInfo) + Send + Sync + 'static>,
}

impl PanicHookGuard {
    #[must_use]
    pub fn install() -> Self {
        let original_hook: std::sync::Arc<dyn Fn(&std::panic::PanicHookInfo) + Send + Sync> =
            std::sync::Arc::from(std::panic::take_hook());
        let hook_for_panic = std::sync::Arc::clone(&original_hook);
        std::panic::set_hook(Box::new(move |info| {
            let _ = disable_raw_mode();
            let _ = execute!(io::stdout(), LeaveAlternateScreen, Show);
            (hook_for_panic)(info);
        }));
        Self { original_hook }
    }
}

impl Drop for PanicHookGuard {
    fn drop(&mut self) {
        let original_hook = std::sync::Arc::clone(&self.original_hook);
        std::panic::set_hook(Box::new(move |info| {
            (original_hook)(info);
        }));
    }
}
