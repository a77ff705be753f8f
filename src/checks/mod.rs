//! Check notification
//!
//! Validation that callers may want to either collect or fail on is reported through a
//! [`CheckNotifier`]. [`ThrowImmediatelyCheckNotifier`] turns failures into errors, while
//! [`ToMemoryCheckNotifier`] records them. Both produce the same message text, so callers that
//! match on wording behave the same way in either mode.

use crate::domain::{RdmpError, Result};
use serde::Serialize;
use std::fmt;
use std::sync::Mutex;

/// Outcome of a single check, ordered from best to worst
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum CheckResult {
    Success,
    Warning,
    Fail,
}

impl fmt::Display for CheckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Success => "Success",
            Self::Warning => "Warning",
            Self::Fail => "Fail",
        };
        f.write_str(label)
    }
}

/// A single reported check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckEvent {
    pub message: String,
    pub result: CheckResult,
}

impl CheckEvent {
    pub fn new(message: impl Into<String>, result: CheckResult) -> Self {
        Self {
            message: message.into(),
            result,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(message, CheckResult::Success)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(message, CheckResult::Warning)
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self::new(message, CheckResult::Fail)
    }
}

/// Receives check events
pub trait CheckNotifier: Send + Sync {
    /// Handles a check event; strict notifiers return an error for failures
    fn on_check_performed(&self, event: CheckEvent) -> Result<()>;
}

/// Strict mode: the first failure (and optionally warning) becomes an [`RdmpError::Check`]
#[derive(Debug, Default, Clone, Copy)]
pub struct ThrowImmediatelyCheckNotifier {
    pub throw_on_warning: bool,
}

impl ThrowImmediatelyCheckNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn throw_on_warnings() -> Self {
        Self {
            throw_on_warning: true,
        }
    }
}

impl CheckNotifier for ThrowImmediatelyCheckNotifier {
    fn on_check_performed(&self, event: CheckEvent) -> Result<()> {
        match event.result {
            CheckResult::Fail => Err(RdmpError::Check(event.message)),
            CheckResult::Warning if self.throw_on_warning => Err(RdmpError::Check(event.message)),
            CheckResult::Warning => {
                tracing::warn!(check = %event.message, "Check warning");
                Ok(())
            }
            CheckResult::Success => {
                tracing::debug!(check = %event.message, "Check passed");
                Ok(())
            }
        }
    }
}

/// Collects every event for later inspection
#[derive(Debug, Default)]
pub struct ToMemoryCheckNotifier {
    events: Mutex<Vec<CheckEvent>>,
}

impl ToMemoryCheckNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<CheckEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// The worst result reported so far, `Success` if nothing was reported
    pub fn worst(&self) -> CheckResult {
        self.events()
            .iter()
            .map(|e| e.result)
            .max()
            .unwrap_or(CheckResult::Success)
    }

    pub fn messages(&self, result: CheckResult) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|e| e.result == result)
            .map(|e| e.message)
            .collect()
    }
}

impl CheckNotifier for ToMemoryCheckNotifier {
    fn on_check_performed(&self, event: CheckEvent) -> Result<()> {
        let mut events = self
            .events
            .lock()
            .map_err(|_| RdmpError::Check("check notifier lock poisoned".to_string()))?;
        events.push(event);
        Ok(())
    }
}
