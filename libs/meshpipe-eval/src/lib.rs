//! # Meshpipe Eval
//!
//! The modifier stack evaluator: walks an object's ordered modifier
//! list, classifies each entry as deform-only or constructive, threads
//! position buffers and snapshots between stages, and produces the
//! final and deform-only output lanes (plus parallel original-
//! coordinate lanes when requested).
//!
//! ## Architecture
//!
//! ```text
//! MeshObject (base + stack) ── calc_modifiers ── EvalResult
//!                                     ▲
//!                    EvalCache (per-object memoization)
//! ```
//!
//! Modifier algorithms are external collaborators implementing
//! [`Modifier`]; this crate owns the ordering, filtering, requirement
//! propagation, and failure policy (skip and report, never abort).

pub mod cache;
pub mod error;
pub mod masks;
pub mod modifier;
pub mod object;
mod orco;
pub mod stack;


pub use cache::{should_reevaluate, CacheStats, EvalCache};
pub use error::{EvalError, ModifierIssue};
pub use masks::{calc_data_masks, DataRequirement};
pub use modifier::{
    CollectingReporter, ErrorReporter, EvalMode, Modifier, ModifierContext, ModifierError,
    ModifierKind, NullReporter,
};
pub use object::{MeshObject, ShapeKeyBlock};
pub use stack::{calc_modifiers, EvalOptions, EvalResult};
