use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

// a cooperative, process-wide stop flag shared by the generator, the
// dispatcher and the progress display. it never preempts an in-flight request.
#[derive(Clone, Debug, Default)]
pub struct StopSignal {
    flag: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
