use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// The input field and send affordance, as far as the session controller is
/// concerned.
pub trait InputControl: Send + Sync {
    fn set_enabled(&self, enabled: bool);
    fn is_enabled(&self) -> bool;
    fn clear(&self);
    fn focus(&self);
}

/// Input state shared between the session task and the input box. Clear and
/// focus are requests the input box consumes on its next frame.
#[derive(Debug, Clone)]
pub struct InputState {
    inner: Arc<InputFlags>,
}

#[derive(Debug)]
struct InputFlags {
    enabled: AtomicBool,
    clear_requested: AtomicBool,
    focus_requested: AtomicBool,
}

impl InputState {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(InputFlags {
                enabled: AtomicBool::new(true),
                clear_requested: AtomicBool::new(false),
                focus_requested: AtomicBool::new(false),
            }),
        }
    }

    pub fn take_clear_request(&self) -> bool {
        self.inner.clear_requested.swap(false, Ordering::AcqRel)
    }

    pub fn take_focus_request(&self) -> bool {
        self.inner.focus_requested.swap(false, Ordering::AcqRel)
    }
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}

impl InputControl for InputState {
    fn set_enabled(&self, enabled: bool) {
        self.inner.enabled.store(enabled, Ordering::Release);
    }

    fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::Acquire)
    }

    fn clear(&self) {
        self.inner.clear_requested.store(true, Ordering::Release);
    }

    fn focus(&self) {
        self.inner.focus_requested.store(true, Ordering::Release);
    }
}
