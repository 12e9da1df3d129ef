//! # Modifier Contract
//!
//! The interface every stack entry implements, plus the error-reporting
//! collaborator used for non-fatal per-modifier problems.
//!
//! Concrete modifier algorithms live outside this crate; the evaluator
//! treats each modifier as an opaque transform with the declared
//! contract.

use glam::{DMat4, DVec3};
use meshpipe_attributes::MeshMask;
use meshpipe_core::MeshSnapshot;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Evaluation mode supplied by the dependency-graph collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EvalMode {
    /// Interactive viewport evaluation.
    Realtime,
    /// Final-quality render evaluation.
    Render,
}

/// What a modifier may do to the mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifierKind {
    /// Moves vertices only; topology is preserved.
    OnlyDeform,
    /// May change topology; consumes a snapshot, produces a new one.
    Constructive,
}

/// Per-invocation context handed to modifiers.
pub struct ModifierContext<'a> {
    /// Active evaluation mode.
    pub mode: EvalMode,
    /// Whether intermediate results may be cached by the modifier.
    pub use_cache: bool,
    /// True on the parallel original-coordinate lanes; modifiers skip
    /// expensive side outputs there.
    pub orco_pass: bool,
    /// World transform of the evaluated object.
    pub object_transform: DMat4,
    /// Non-fatal problem sink.
    pub reporter: &'a dyn ErrorReporter,
}

/// A stack entry: an opaque mesh transform with a declared contract.
pub trait Modifier: Send + Sync {
    /// Display name, used in error reports.
    fn name(&self) -> &str;

    /// Deform-only or constructive.
    fn kind(&self) -> ModifierKind;

    /// Whether this modifier runs in `mode`.
    fn is_enabled(&self, mode: EvalMode) -> bool {
        let _ = mode;
        true
    }

    /// Whether output depends on scene time (animated modifiers).
    fn depends_on_time(&self) -> bool {
        false
    }

    /// Whether the deform pass reads vertex normals.
    fn depends_on_normals(&self) -> bool {
        false
    }

    /// Whether origin-index mapping survives this modifier.
    fn supports_mapping(&self) -> bool {
        true
    }

    /// Whether this modifier must see untouched base topology.
    fn requires_original_data(&self) -> bool {
        false
    }

    /// Attribute layers this modifier reads from its input.
    fn required_data_mask(&self) -> MeshMask {
        MeshMask::EMPTY
    }

    /// Deform pass: mutate `positions` in place.
    ///
    /// `mesh` is the current snapshot when one has been materialized
    /// (mid-stack deforms), `None` during the leading deform run.
    fn deform(
        &self,
        ctx: &ModifierContext<'_>,
        mesh: Option<&MeshSnapshot>,
        positions: &mut [DVec3],
    ) {
        let _ = (ctx, mesh, positions);
    }

    /// Constructive pass: produce a new snapshot, or `None` on failure
    /// (the evaluator keeps the previous snapshot).
    fn apply(&self, ctx: &ModifierContext<'_>, mesh: &MeshSnapshot) -> Option<MeshSnapshot> {
        let _ = (ctx, mesh);
        None
    }
}

// =============================================================================
// ERROR REPORTING COLLABORATOR
// =============================================================================

/// One reported per-modifier problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifierError {
    /// Name of the offending modifier.
    pub modifier: String,
    /// Human-readable message for the UI collaborator.
    pub message: String,
}

/// Sink for non-fatal modifier problems.
///
/// Evaluation never aborts on modifier errors; they are reported here
/// and the offending modifier is skipped.
pub trait ErrorReporter: Sync {
    /// Records a problem against a modifier.
    fn report(&self, modifier: &str, message: &str);

    /// Drops previously recorded problems (run at the start of each
    /// evaluation).
    fn clear(&self) {}
}

/// Reporter that retains every problem for later inspection.
#[derive(Debug, Default)]
pub struct CollectingReporter {
    entries: Mutex<Vec<ModifierError>>,
}

impl CollectingReporter {
    /// Creates an empty reporter.
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of the recorded problems.
    pub fn errors(&self) -> Vec<ModifierError> {
        self.entries.lock().clone()
    }

    /// Whether anything was reported.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl ErrorReporter for CollectingReporter {
    fn report(&self, modifier: &str, message: &str) {
        self.entries.lock().push(ModifierError {
            modifier: modifier.to_owned(),
            message: message.to_owned(),
        });
    }

    fn clear(&self) {
        self.entries.lock().clear();
    }
}

/// Reporter that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl ErrorReporter for NullReporter {
    fn report(&self, _modifier: &str, _message: &str) {}
}
