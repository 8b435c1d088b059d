//! zamc - the ZAM script-compiler back end.
//!
//! This crate lowers a reduced, typed AST for a single function body into
//! an executable [`Body`] for the ZAM register virtual machine. The heavy
//! lifting happens in the body finalizer: given the provisional
//! instructions produced by statement lowering, a provisional frame
//! layout, and use-definition information, it numbers instructions,
//! labels loop depths, runs the peephole optimizer, forwards branches
//! through retired code, compacts the instruction vector, finalizes
//! frame-slot sharing, and concretizes the switch case tables.
//!
//! # Usage
//!
//! ```ignore
//! use bumpalo::Bump;
//! use zamc::{Session, ZamCompiler, Options};
//!
//! let arena = Bump::new();
//! let session = Session::new(&arena);
//! // Build idents through the session, a reduced AST for the body, and
//! // the front-end collaborators (profile, use-defs, reducer, reporter).
//! let body = ZamCompiler::new(func, profile, body, use_defs,
//!                             reducer, reporter, Options::default())
//!     .and_then(|compiler| compiler.compile_body());
//! // `body` is None iff errors were reported through the reporter.
//! ```
//!
//! # Architecture
//!
//! - [`core`] - shared infrastructure: session, instructions, frame
//!   allocation, the instruction builder, the analyzer and optimizer
//!   passes, the compiler driver and the executable body.
//! - [`lower`] - the reduced AST and the statement lowerer that drives
//!   the compiler.

pub mod core;
pub mod lower;

pub use crate::core::adaptor::{
    Flavor, FuncId, Function, LogReporter, Options, ProfileSource, Reducer, Reporter, UseDefs,
};
pub use crate::core::body::Body;
pub use crate::core::builder::InstBuilder;
pub use crate::core::cases::{CaseMap, CaseMaps, DoubleKey, FinalCaseMap, FinalCaseMaps};
pub use crate::core::compiler::ZamCompiler;
pub use crate::core::error::{CompileError, CompileResult};
pub use crate::core::frame::{FrameAllocator, FrameSharingInfo, GlobalInfo};
pub use crate::core::ident::{Ident, IdentKind, ZType};
pub use crate::core::inst::{Inst, InstId, Op, Operand};
pub use crate::core::session::Session;
pub use crate::lower::{BinOp, CaseLabel, Expr, Stmt, SwitchCase};
