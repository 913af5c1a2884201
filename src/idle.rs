use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// One-shot idle registration offered by the host: the callback runs once
/// when the host is next idle, then the registration disarms itself.
pub trait IdleHost {
    fn register_idle(&mut self, callback: Box<dyn FnMut() + Send>);
}

/// Wraps a closure so it fires at most once even if the host keeps calling
/// its idle registrations. Used to defer setup work past initial load.
pub fn one_shot(mut callback: impl FnMut() + Send + 'static) -> Box<dyn FnMut() + Send> {
    let fired = Arc::new(AtomicBool::new(false));
    Box::new(move || {
        if fired.swap(true, Ordering::SeqCst) {
            return;
        }
        callback();
    })
}

/// Reference `IdleHost`: collects registrations and runs them when the
/// owner decides the host is idle, mirroring an application idle event.
#[derive(Default)]
pub struct IdleQueue {
    callbacks: Vec<Box<dyn FnMut() + Send>>,
}

impl IdleQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fires every registration once, keeping them registered the way a
    /// recurring host idle event would.
    pub fn run_idle(&mut self) {
        for callback in &mut self.callbacks {
            callback();
        }
    }

    pub fn registration_count(&self) -> usize {
        self.callbacks.len()
    }
}

impl IdleHost for IdleQueue {
    fn register_idle(&mut self, callback: Box<dyn FnMut() + Send>) {
        self.callbacks.push(callback);
    }
}
