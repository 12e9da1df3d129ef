//! # Evaluation Errors
//!
//! Hard failures propagate as [`EvalError`]; per-modifier problems are
//! non-fatal, reported through the
//! [`ErrorReporter`](crate::modifier::ErrorReporter) collaborator with
//! the messages defined by [`ModifierIssue`], and evaluation continues.

use meshpipe_attributes::AttributeError;
use meshpipe_core::DerivedError;
use thiserror::Error;

/// Internal pipeline failures (broken invariants, missing layers).
///
/// Never produced by a modifier misbehaving; those are reported and
/// skipped.
#[derive(Debug, Error)]
pub enum EvalError {
    /// Snapshot or derived-cache failure
    #[error(transparent)]
    Derived(#[from] DerivedError),

    /// Attribute-store failure
    #[error(transparent)]
    Attribute(#[from] AttributeError),
}

/// The non-fatal per-modifier problem taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifierIssue {
    /// A modifier requiring original topology sits after a constructive
    /// modifier.
    BadStackPosition,
    /// The modifier does not run in the active evaluation mode.
    UnsupportedMode,
}

impl ModifierIssue {
    /// The message recorded against the modifier.
    pub fn message(self) -> &'static str {
        match self {
            ModifierIssue::BadStackPosition => {
                "Modifier requires original data, bad stack position"
            }
            ModifierIssue::UnsupportedMode => "Not supported in this evaluation mode",
        }
    }
}
