//! Progress spinner drawn by a background thread.
use std::io::{IsTerminal as _, Write as _};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use super::utils::terminal_columns;

const FRAMES: [char; 4] = ['|', '/', '-', '\\'];
const TICK: Duration = Duration::from_millis(120);

/// Set while any spinner owns the current console line.
static DRAWING: AtomicBool = AtomicBool::new(false);

/// A spinner shown while a long-running command executes.
///
/// The spinner is purely cosmetic: it never touches mount state and stops
/// when dropped.
#[derive(Debug)]
pub struct Spinner {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Spinner {
    /// Start a spinner labelled `message`.
    ///
    /// Nothing is drawn when `enabled` is false or stdout is not a terminal.
    #[must_use]
    pub fn start(message: &str, enabled: bool) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        if !enabled || !std::io::stdout().is_terminal() {
            return Self { stop, handle: None };
        }

        let max = terminal_columns().saturating_sub(4);
        let label: String = message.chars().take(max).collect();
        let flag = Arc::clone(&stop);
        let handle = std::thread::spawn(move || {
            DRAWING.store(true, Ordering::SeqCst);
            let mut out = std::io::stdout();
            for frame in FRAMES.iter().cycle() {
                if flag.load(Ordering::SeqCst) {
                    break;
                }
                write!(out, "\r  {frame} {label}").ok();
                out.flush().ok();
                std::thread::sleep(TICK);
            }
            clear_line();
        });
        Self {
            stop,
            handle: Some(handle),
        }
    }

    /// Whether a drawing thread is running.
    #[must_use]
    pub const fn is_drawing(&self) -> bool {
        self.handle.is_some()
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            handle.join().ok();
        }
    }
}

/// Erase the spinner line if one is currently drawn.
///
/// Safe to call from a signal handler thread.
pub fn clear_line() {
    if DRAWING.swap(false, Ordering::SeqCst) {
        let mut out = std::io::stdout();
        write!(out, "\r\x1b[K").ok();
        out.flush().ok();
    }
}
