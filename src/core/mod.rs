//! Core compiler infrastructure.
//!
//! # Key Components
//!
//! ## Session management (`session`)
//! - Arena-based allocation using `bumpalo`
//! - Identifier interning shared by everything downstream
//!
//! ## Instructions (`inst`)
//! - The provisional instruction and its closed opcode set
//! - Handle-typed branch targets into the compiler-owned arena
//!
//! ## Frame allocation (`frame`)
//! - Dense slot assignment for globals, parameters, locals, temporaries
//! - Managed-slot classification and frame-sharing descriptors
//!
//! ## Instruction building (`builder`)
//! - Append-only emission with jump fix-up stacks
//! - The pending pseudo-instruction standing in for "end of function"
//!
//! ## Analysis and optimization (`analyzer`, `peephole`)
//! - Back-edge discovery and loop-depth labeling
//! - Dead-instruction marking and frame-slot sharing
//!
//! ## Finalization (`compiler`, `cases`, `body`)
//! - The multi-pass body finalizer and the executable body it emits

pub mod adaptor;
pub mod analyzer;
pub mod body;
pub mod builder;
pub mod cases;
pub mod compiler;
pub mod dump;
pub mod error;
pub mod frame;
pub mod ident;
pub mod inst;
pub mod peephole;
pub mod session;
pub mod test_utils;


pub use adaptor::{Flavor, FuncId, Function, LogReporter, Options, ProfileSource, Reducer, Reporter, UseDefs};
pub use body::Body;
pub use builder::InstBuilder;
pub use cases::{CaseMap, CaseMaps, DoubleKey, FinalCaseMap, FinalCaseMaps};
pub use compiler::ZamCompiler;
pub use error::{CompileError, CompileResult};
pub use frame::{FrameAllocator, FrameSharingInfo, GlobalInfo};
pub use ident::{Ident, IdentKind, ZType};
pub use inst::{Inst, InstId, Op, Operand};
pub use session::Session;
