//! Terminal and timer events, read in a background tokio task.
//!
//! The reader multiplexes crossterm input, the dashboard refresh timer and
//! Ctrl+C delivered as a signal (raw mode usually turns it into a key
//! press, but not when stdin is not a terminal).

use std::time::Duration;

use crossterm::event::{Event as CrosstermEvent, EventStream, KeyEvent, KeyEventKind, MouseEvent};
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Longest refresh the timer honors; anything longer never fires in practice.
const MAX_TICK: Duration = Duration::from_secs(365 * 86_400);

#[derive(Debug)]
pub enum Event {
    Key(KeyEvent),
    Mouse(MouseEvent),
    /// Terminal resized to (cols, rows).
    Resize(u16, u16),
    /// Dashboard refresh interval elapsed.
    Refresh,
    /// SIGINT.
    Interrupt,
}

pub struct EventReader {
    rx: mpsc::UnboundedReceiver<Event>,
    cancel: CancellationToken,
}

impl EventReader {
    /// Spawn the reader. The first `Refresh` fires one full `refresh`
    /// interval after start; the initial fetch is driven by the first resize.
    pub fn new(refresh: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            let mut input = EventStream::new();
            let refresh = tick_period(refresh);
            let mut ticker = tokio::time::interval_at(Instant::now() + refresh, refresh);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut signals = true;

            loop {
                let event = tokio::select! {
                    () = task_cancel.cancelled() => break,

                    _ = ticker.tick() => Event::Refresh,

                    result = tokio::signal::ctrl_c(), if signals => match result {
                        Ok(()) => Event::Interrupt,
                        Err(e) => {
                            debug!(error = %e, "ctrl-c handler unavailable");
                            signals = false;
                            continue;
                        }
                    },

                    Some(Ok(input_event)) = input.next() => match input_event {
                        CrosstermEvent::Key(key) if key.kind == KeyEventKind::Press => Event::Key(key),
                        CrosstermEvent::Mouse(mouse) => Event::Mouse(mouse),
                        CrosstermEvent::Resize(w, h) => Event::Resize(w, h),
                        _ => continue,
                    },
                };

                if tx.send(event).is_err() {
                    break;
                }
            }
            debug!("event reader stopped");
        });

        Self { rx, cancel }
    }

    /// Next event, or `None` once the reader has stopped.
    pub async fn next(&mut self) -> Option<Event> {
        self.rx.recv().await
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

impl Drop for EventReader {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Timer period for a refresh interval, bounded so the first deadline can
/// always be computed.
fn tick_period(refresh: Duration) -> Duration {
    refresh.clamp(Duration::from_millis(1), MAX_TICK)
}
