//! Contains common, primitive types shared across the engine.
//!
//! Alarms and tick observers are stored in slot maps, so their identifiers are
//! generational keys: a removed alarm's id is never handed out again.

use slotmap::new_key_type;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// A prelude module for convenient importing of the identifier types.
///
/// # Example
/// ```
/// use circlock::common::prelude::*;
/// ```
pub mod prelude {
    pub use super::{AlarmId, ObserverId};
}

new_key_type! {
    /// Uniquely and safely identifies an alarm held by the `AlarmRegistry`.
    ///
    /// Log entries keep this key after the alarm is deleted, but lookups
    /// through the registry will miss.
    pub struct AlarmId;

    /// Identifies a tick observer registered with `ClockEngine::on_tick`.
    pub struct ObserverId;
}

/// Outcome of running a user-supplied callback in isolation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CallbackOutcome {
    Completed,
    Failed(String),
    Panicked(String),
}

/// Runs `callback`, converting both returned errors and panics into a
/// `CallbackOutcome` so one misbehaving callback cannot take down a loop.
pub(crate) fn run_isolated<F>(callback: F) -> CallbackOutcome
where
    F: FnOnce() -> anyhow::Result<()>,
{
    match catch_unwind(AssertUnwindSafe(callback)) {
        Ok(Ok(())) => CallbackOutcome::Completed,
        Ok(Err(e)) => CallbackOutcome::Failed(format!("{e:#}")),
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic payload".to_string());
            CallbackOutcome::Panicked(message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completed_callback() {
        assert_eq!(run_isolated(|| Ok(())), CallbackOutcome::Completed);
    }

    #[test]
    fn failed_callback_keeps_context() {
        let outcome = run_isolated(|| Err(anyhow::anyhow!("speaker unplugged")));
        assert_eq!(outcome, CallbackOutcome::Failed("speaker unplugged".into()));
    }

    #[test]
    fn panicking_callback_is_contained() {
        let outcome = run_isolated(|| panic!("boom"));
        assert_eq!(outcome, CallbackOutcome::Panicked("boom".into()));
    }
}
