//! Error types for the ZAM back end.
//!
//! Errors never cross the public boundary as panics: the compiler routes
//! them through the [`Reporter`](super::adaptor::Reporter) and signals
//! failure by returning `None` from `compile_body`.

use thiserror::Error;

/// Failures raised inside the back end.
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("\"{keyword}\" used without an enclosing {construct}")]
    StrayControl {
        keyword: &'static str,
        construct: &'static str,
    },

    #[error("duplicate frame slot for \"{name}\"")]
    DuplicateSlot { name: String },

    #[error("untargeted inline return")]
    UntargetedInlineReturn,

    #[error("cycle of retired branch forwarders at instruction {inst}")]
    DeadForwarderCycle { inst: usize },

    #[error("live-range start for \"{name}\" walked past the end of the instruction stream")]
    SharedSlotStart { name: String },

    #[error("switch cases mix value types")]
    MixedCaseTypes,

    #[error("unknown identifier \"{name}\"")]
    UnknownIdent { name: String },
}

impl CompileError {
    /// Whether this is a compiler invariant breach rather than a user error.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            CompileError::DuplicateSlot { .. }
                | CompileError::UntargetedInlineReturn
                | CompileError::DeadForwarderCycle { .. }
                | CompileError::SharedSlotStart { .. }
        )
    }
}

/// Result type alias for back-end operations.
pub type CompileResult<T> = Result<T, CompileError>;
