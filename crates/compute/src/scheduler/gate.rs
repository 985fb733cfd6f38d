use parking_lot::{Condvar, Mutex};

/// One-shot latch: waiters block until `open` has been called once.
#[derive(Debug, Default)]
pub(crate) struct CompletionGate {
    opened: Mutex<bool>,
    cond: Condvar,
}

impl CompletionGate {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Open the gate. Later calls are no-ops.
    pub(crate) fn open(&self) {
        let mut opened = self.opened.lock();
        if !*opened {
            *opened = true;
            self.cond.notify_all();
        }
    }

    pub(crate) fn is_open(&self) -> bool {
        *self.opened.lock()
    }

    pub(crate) fn wait(&self) {
        let mut opened = self.opened.lock();
        while !*opened {
            self.cond.wait(&mut opened);
        }
    }
}
