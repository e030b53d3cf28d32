//! Wake-on-signal-or-deadline primitive.
//!
//! A [`Monitor`] couples the guarded value with a pending-signal flag, so
//! a signal raised while nobody waits is not lost and spurious condvar
//! wakeups are never reported as signals.

use std::ops::{Deref, DerefMut};
use std::time::Instant;

use parking_lot::{Condvar, Mutex, MutexGuard};

/// Why [`MonitorGuard::wait_until`] returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Wake {
    Signaled,
    TimedOut,
}

struct Slot<T> {
    value: T,
    signaled: bool,
}

pub struct Monitor<T> {
    slot: Mutex<Slot<T>>,
    condvar: Condvar,
}

pub struct MonitorGuard<'a, T> {
    slot: MutexGuard<'a, Slot<T>>,
    condvar: &'a Condvar,
}

impl<T> Monitor<T> {
    pub fn new(value: T) -> Self {
        Self {
            slot: Mutex::new(Slot {
                value,
                signaled: false,
            }),
            condvar: Condvar::new(),
        }
    }

    pub fn lock(&self) -> MonitorGuard<'_, T> {
        MonitorGuard {
            slot: self.slot.lock(),
            condvar: &self.condvar,
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Monitor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slot = self.slot.lock();
        f.debug_struct("Monitor")
            .field("value", &slot.value)
            .field("signaled", &slot.signaled)
            .finish()
    }
}

impl<T> MonitorGuard<'_, T> {
    /// Wakes the waiter, or the next one if nobody waits yet.
    pub fn signal(&mut self) {
        self.slot.signaled = true;
        self.condvar.notify_one();
    }

    /// Releases the lock until signaled or until `deadline` passes.
    ///
    /// `None` waits for a signal only. A pending signal wins over an
    /// elapsed deadline and is consumed by this call. An elapsed deadline
    /// still hands the lock to any thread blocked on it.
    pub fn wait_until(&mut self, deadline: Option<Instant>) -> Wake {
        loop {
            if self.slot.signaled {
                self.slot.signaled = false;
                return Wake::Signaled;
            }
            match deadline {
                Some(deadline) => {
                    if Instant::now() >= deadline {
                        // Let blocked writers in before reporting the timeout
                        MutexGuard::bump(&mut self.slot);
                        if self.slot.signaled {
                            self.slot.signaled = false;
                            return Wake::Signaled;
                        }
                        return Wake::TimedOut;
                    }
                    let _ = self.condvar.wait_until(&mut self.slot, deadline);
                }
                None => self.condvar.wait(&mut self.slot),
            }
        }
    }
}

impl<T> Deref for MonitorGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.slot.value
    }
}

impl<T> DerefMut for MonitorGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.slot.value
    }
}
