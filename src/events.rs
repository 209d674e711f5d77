//! Canvas lifecycle notifications.

use std::sync::{Arc, Mutex};

use crate::diagnostics::Diagnostic;
use crate::errors::{Error, Result, ShaderStage};
use crate::utils::object_pool::ObjectPool;

impl_handle!(EventListenerHandle);

/// Details attached to an `Error` notification.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorEvent {
    pub stage: Option<ShaderStage>,
    pub message: String,
    pub diagnostics: Vec<Diagnostic>,
}

impl ErrorEvent {
    pub fn from_error(err: &Error) -> Self {
        match *err {
            Error::ShaderCompile {
                stage,
                ref log,
                ref diagnostics,
            } => ErrorEvent {
                stage: Some(stage),
                message: log.clone(),
                diagnostics: diagnostics.clone(),
            },
            ref err => ErrorEvent {
                stage: None,
                message: format!("{}", err),
                diagnostics: Vec::new(),
            },
        }
    }
}

/// Notifications a canvas raises as it runs.
#[derive(Debug, Clone, PartialEq)]
pub enum CanvasEvent {
    /// A new program was compiled and installed.
    Load,
    /// A frame was drawn.
    Render,
    /// A load or draw failed. The canvas keeps running.
    Error(ErrorEvent),
}

pub trait EventListener {
    fn on(&mut self, v: &CanvasEvent) -> Result<()>;
}

/// Listener registry. Dispatch order follows attachment order, and a
/// listener error is logged without stopping delivery to the rest.
pub struct Events {
    listeners: ObjectPool<EventListenerHandle, Arc<Mutex<dyn EventListener>>>,
}

impl Events {
    pub fn new() -> Self {
        Events {
            listeners: ObjectPool::new(),
        }
    }

    pub fn attach(&mut self, listener: Arc<Mutex<dyn EventListener>>) -> EventListenerHandle {
        self.listeners.create(listener)
    }

    pub fn detach(&mut self, handle: EventListenerHandle) {
        self.listeners.free(handle);
    }

    pub fn emit(&self, v: &CanvasEvent) {
        for listener in self.listeners.values() {
            match listener.lock() {
                Ok(mut listener) => {
                    if let Err(err) = listener.on(v) {
                        warn!("Event listener failed. {}", err);
                    }
                }
                Err(_) => warn!("Skipping poisoned event listener."),
            }
        }
    }
}
