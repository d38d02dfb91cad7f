//! Break surface drawn on the terminal's alternate screen.

use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::style::Print;
use crossterm::terminal::{Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{execute, queue};
use tired_eyes_core::{format_clock, SurfaceError, SurfaceHandle, SurfaceHost};
use tracing::warn;

const HEADING: &str = "Time to rest your eyes";
const DESCRIPTION: &str =
    "Look away from your screen and focus on something at least 20 feet away for the duration of your break.";
const TIPS: [&str; 4] = [
    "Follow the 20-20-20 rule: every 20 minutes, look at something 20 feet away for 20 seconds.",
    "Blink frequently to keep your eyes moist.",
    "Adjust your screen so it's at arm's length and slightly below eye level.",
    "Use proper lighting to reduce eye strain.",
];

const CLOCK_ROW: u16 = 3;
const PROMPT_ROW: u16 = 12;

#[derive(Debug, Default)]
pub struct TerminalHost {
    next: AtomicU64,
    active: Mutex<Option<SurfaceHandle>>,
}

impl TerminalHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn is_current(&self, handle: SurfaceHandle) -> bool {
        *self.active.lock().unwrap_or_else(PoisonError::into_inner) == Some(handle)
    }

    fn draw(&self, duration_secs: u32) -> io::Result<()> {
        let mut out = io::stdout();
        execute!(out, EnterAlternateScreen, Hide, Clear(ClearType::All))?;
        queue!(
            out,
            MoveTo(2, 1),
            Print(HEADING),
            MoveTo(2, CLOCK_ROW),
            Print(format_clock(u64::from(duration_secs))),
            MoveTo(2, 5),
            Print(DESCRIPTION),
            MoveTo(2, 7),
            Print("Eye Care Tips")
        )?;
        for (row, tip) in (8u16..).zip(TIPS) {
            queue!(out, MoveTo(4, row), Print(format!("- {tip}")))?;
        }
        queue!(
            out,
            MoveTo(2, PROMPT_ROW),
            Print("Continue (wait for timer)")
        )?;
        out.flush()
    }

    fn redraw_clock(&self, remaining_secs: u32) -> io::Result<()> {
        let mut out = io::stdout();
        queue!(
            out,
            MoveTo(2, CLOCK_ROW),
            Clear(ClearType::CurrentLine),
            Print(format_clock(u64::from(remaining_secs)))
        )?;
        if remaining_secs == 0 {
            queue!(
                out,
                MoveTo(2, PROMPT_ROW),
                Clear(ClearType::CurrentLine),
                Print("Type `continue` and press Enter"),
                MoveTo(2, PROMPT_ROW + 1)
            )?;
        }
        out.flush()
    }
}

impl SurfaceHost for TerminalHost {
    fn create_fullscreen(&self, duration_secs: u32) -> Result<SurfaceHandle, SurfaceError> {
        self.draw(duration_secs)
            .map_err(|e| SurfaceError::CreateFailed(e.to_string()))?;
        let handle = SurfaceHandle(self.next.fetch_add(1, Ordering::Relaxed));
        *self.active.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
        Ok(handle)
    }

    fn show_countdown(&self, handle: SurfaceHandle, remaining_secs: u32) {
        if !self.is_current(handle) {
            return;
        }
        if let Err(e) = self.redraw_clock(remaining_secs) {
            warn!("failed to draw break countdown: {e}");
        }
    }

    fn close_surface(&self, handle: SurfaceHandle) {
        {
            let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
            if *active != Some(handle) {
                return;
            }
            *active = None;
        }
        if let Err(e) = execute!(io::stdout(), Show, LeaveAlternateScreen) {
            warn!("failed to leave break screen: {e}");
        }
    }
}
