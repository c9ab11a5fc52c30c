//! Single-slot debounce.
//!
//! `schedule` replaces whatever is armed and pushes the deadline out to
//! `now + delay`; `fired` hands back the armed value once the deadline passes
//! untouched.  Each armed value fires at most once.

use std::cell::RefCell;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;

struct Armed<T> {
    deadline: Instant,
    value: T,
}

pub struct DebounceGate<T> {
    delay: Duration,
    slot: RefCell<Option<Armed<T>>>,
    rearmed: Notify,
}

impl<T> DebounceGate<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            slot: RefCell::new(None),
            rearmed: Notify::new(),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn schedule(&self, value: T) {
        let deadline = Instant::now() + self.delay;
        *self.slot.borrow_mut() = Some(Armed { deadline, value });
        self.rearmed.notify_one();
    }

    /// Disarm without firing, returning the dropped value.
    pub fn cancel(&self) -> Option<T> {
        let armed = self.slot.borrow_mut().take();
        if armed.is_some() {
            self.rearmed.notify_one();
        }
        armed.map(|a| a.value)
    }

    pub fn is_armed(&self) -> bool {
        self.slot.borrow().is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.slot.borrow().as_ref().map(|a| a.deadline)
    }

    /// Wait for the armed value to go quiet for `delay`, then take it.
    pub async fn fired(&self) -> T {
        loop {
            let Some(deadline) = self.deadline() else {
                self.rearmed.notified().await;
                continue;
            };

            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => {
                    // A schedule() racing the timer moves the deadline; only a
                    // slot that is still due may fire.
                    let mut slot = self.slot.borrow_mut();
                    if slot.as_ref().is_some_and(|a| a.deadline <= Instant::now()) {
                        if let Some(armed) = slot.take() {
                            return armed.value;
                        }
                    }
                }
                _ = self.rearmed.notified() => {}
            }
        }
    }
}
