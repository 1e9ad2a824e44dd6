//! Extension handlers for tests.

use std::sync::{Arc, Mutex};

use cfgsync_extensions::{Error, ExtensionHandler, ExtensionKind, Result};

/// One handler invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Install(ExtensionKind, Vec<String>),
    Uninstall(ExtensionKind, Vec<String>),
}

/// Records every call and always succeeds. Clones share the call log.
#[derive(Debug, Clone, Default)]
pub struct RecordingHandler {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls made so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

impl ExtensionHandler for RecordingHandler {
    fn install(&self, kind: ExtensionKind, names: &[String]) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Install(kind, names.to_vec()));
        Ok(())
    }

    fn uninstall(&self, kind: ExtensionKind, names: &[String]) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Uninstall(kind, names.to_vec()));
        Ok(())
    }
}

/// Fails whenever a batch contains `extension`, succeeds otherwise.
#[derive(Debug, Clone)]
pub struct FailingHandler {
    extension: String,
    recorder: RecordingHandler,
}

impl FailingHandler {
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
            recorder: RecordingHandler::new(),
        }
    }

    /// Calls that succeeded.
    pub fn calls(&self) -> Vec<Call> {
        self.recorder.calls()
    }

    fn check(&self, action: &str, names: &[String]) -> Result<()> {
        if names.iter().any(|n| *n == self.extension) {
            return Err(Error::Rejected {
                action: action.to_string(),
                extension: self.extension.clone(),
                reason: "refused by test handler".to_string(),
            });
        }
        Ok(())
    }
}

impl ExtensionHandler for FailingHandler {
    fn install(&self, kind: ExtensionKind, names: &[String]) -> Result<()> {
        self.check("install", names)?;
        self.recorder.install(kind, names)
    }

    fn uninstall(&self, kind: ExtensionKind, names: &[String]) -> Result<()> {
        self.check("uninstall", names)?;
        self.recorder.uninstall(kind, names)
    }
}
