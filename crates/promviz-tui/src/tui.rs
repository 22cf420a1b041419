//! Terminal lifecycle: raw mode, alternate screen and mouse capture, undone
//! on drop and from the panic hook so a crash never leaves the shell garbled.

use std::io::{self, Stdout, stdout};

use color_eyre::eyre::Result;
use crossterm::ExecutableCommand;
use crossterm::cursor;
use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

pub type Backend = CrosstermBackend<Stdout>;

pub struct Tui {
    pub terminal: Terminal<Backend>,
    active: bool,
}

impl Tui {
    pub fn new() -> Result<Self> {
        let terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
        Ok(Self {
            terminal,
            active: false,
        })
    }

    /// Switch the terminal into dashboard mode.
    pub fn enter(&mut self) -> Result<()> {
        switch_on(&mut self.active, terminal::enable_raw_mode, || {
            stdout()
                .execute(EnterAlternateScreen)?
                .execute(EnableMouseCapture)?
                .execute(cursor::Hide)?;
            Ok(())
        })?;
        self.terminal.clear()?;
        Ok(())
    }

    /// Give the terminal back. Safe to call more than once.
    pub fn exit(&mut self) {
        if std::mem::take(&mut self.active) {
            restore();
        }
    }

    /// Current size as `(cols, rows)`.
    pub fn size(&self) -> Result<(u16, u16)> {
        let size = self.terminal.size()?;
        Ok((size.width, size.height))
    }
}

impl Drop for Tui {
    fn drop(&mut self) {
        self.exit();
    }
}

/// Raw mode first, then the screen setup. `active` is set as soon as raw
/// mode is on so a failed screen setup is still undone on drop.
fn switch_on(
    active: &mut bool,
    raw_mode: impl FnOnce() -> io::Result<()>,
    screen: impl FnOnce() -> io::Result<()>,
) -> io::Result<()> {
    raw_mode()?;
    *active = true;
    screen()
}

/// Best-effort restoration; every step runs even if an earlier one fails.
fn restore() {
    let mut out = stdout();
    let _ = out.execute(cursor::Show);
    let _ = out.execute(DisableMouseCapture);
    let _ = out.execute(LeaveAlternateScreen);
    let _ = terminal::disable_raw_mode();
}

/// Install the color-eyre report hook and a panic hook that restores the
/// terminal before printing. Call before [`Tui::enter`].
pub fn install_hooks() -> Result<()> {
    let (panic_hook, eyre_hook) = color_eyre::config::HookBuilder::default()
        .display_env_section(false)
        .into_hooks();
    eyre_hook.install()?;

    let panic_hook = panic_hook.into_panic_hook();
    std::panic::set_hook(Box::new(move |info| {
        restore();
        panic_hook(info);
    }));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_screen_setup_still_needs_restore() {
        let mut active = false;
        let result = switch_on(&mut active, || Ok(()), || Err(io::Error::other("no tty")));
        assert!(result.is_err());
        assert!(active);
    }

    #[test]
    fn failed_raw_mode_needs_no_restore() {
        let mut active = false;
        let mut screen_ran = false;
        let result = switch_on(
            &mut active,
            || Err(io::Error::other("no tty")),
            || {
                screen_ran = true;
                Ok(())
            },
        );
        assert!(result.is_err());
        assert!(!active);
        assert!(!screen_ran);
    }
}
