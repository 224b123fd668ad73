use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam::channel::{bounded, Receiver, Sender};
use log::info;
use parking_lot::Mutex;

/// One-shot cancellation notice shared by every stage of a run.
///
/// Cancelling drops the only sender of `notice`, so every `select!` waiting
/// on it wakes up with a disconnect, and keeps waking up immediately from
/// then on.
#[derive(Debug, Clone)]
pub(crate) struct CancelToken {
    cancelled: Arc<AtomicBool>,
    trigger: Arc<Mutex<Option<Sender<()>>>>,
    notice: Receiver<()>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (trigger, notice) = bounded(0);
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            trigger: Arc::new(Mutex::new(Some(trigger))),
            notice,
        }
    }

    /// Returns `true` only for the call that actually cancelled.
    pub fn cancel(&self) -> bool {
        let trigger = self.trigger.lock().take();
        match trigger {
            Some(trigger) => {
                self.cancelled.store(true, Ordering::Release);
                drop(trigger);
                info!("Cancellation requested");
                true
            }
            None => false,
        }
    }

    #[inline(always)]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Becomes ready (disconnected) once the token is cancelled.
    pub fn notice(&self) -> &Receiver<()> {
        &self.notice
    }
}
