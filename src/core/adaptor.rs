// This module defines the traits bridging the back end to the rest of the
// script compiler. The back end never depends on the front end's concrete
// representations: use-definition results, profile data, temporary creation,
// error reporting and the function object are all reached through the small
// trait surfaces below. The design assumes one compiler instance per function
// body; a front end implements these once and hands references or values to
// each ZamCompiler it constructs.

//! Front-end collaborator interfaces.
//!
//! The back end consults these during initialization and lowering only:
//! - [`UseDefs`] decides which parameters get a load instruction.
//! - [`ProfileSource`] enumerates the function's globals and locals.
//! - [`Reducer`] creates temporaries for expression lowering. It is part
//!   of the construction contract but never consulted by the finalizer.
//! - [`Reporter`] receives user and internal errors; its error count is
//!   polled once after statement lowering.
//! - [`Function`] exposes the identity and flavor of the function being
//!   compiled.

use std::collections::HashSet;

use super::ident::{Ident, ZType};

/// Use-definition information for the function body.
pub trait UseDefs<'a> {
    /// Whether usage information exists for the body being compiled.
    fn has_usage(&self) -> bool;

    /// The identifiers the body uses, when usage information exists.
    fn get_usage(&self) -> Option<&HashSet<Ident<'a>>>;

    /// Whether the given identifier is used by the body.
    fn has_id(&self, id: &Ident<'a>) -> bool {
        self.get_usage().is_some_and(|usage| usage.contains(id))
    }
}

/// Profile information about the function being compiled.
pub trait ProfileSource<'a> {
    /// Globals referenced by the function, in first-seen order.
    fn globals(&self) -> &[Ident<'a>];

    /// Locals (including front-end temporaries), in first-seen order.
    fn locals(&self) -> &[Ident<'a>];

    /// Whether the function was proven non-recursive.
    fn non_recursive(&self) -> bool {
        false
    }
}

/// Temporary creation for expression lowering.
///
/// Each call must return a fresh identifier of kind
/// [`IdentKind::Temp`](super::ident::IdentKind).
pub trait Reducer<'a> {
    fn new_temp(&mut self, ty: ZType) -> Ident<'a>;
}

/// Sink for user-visible and internal compiler errors.
pub trait Reporter {
    fn error(&mut self, msg: &str);
    fn internal_error(&mut self, msg: &str);

    /// Number of user errors reported so far.
    fn errors(&self) -> usize;
}

impl<T: Reporter + ?Sized> Reporter for &mut T {
    fn error(&mut self, msg: &str) {
        (**self).error(msg);
    }

    fn internal_error(&mut self, msg: &str) {
        (**self).internal_error(msg);
    }

    fn errors(&self) -> usize {
        (**self).errors()
    }
}

/// A [`Reporter`] that counts errors and forwards them to the logger.
#[derive(Debug, Default)]
pub struct LogReporter {
    errors: usize,
}

impl LogReporter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Reporter for LogReporter {
    fn error(&mut self, msg: &str) {
        self.errors += 1;
        log::error!("error: {msg}");
    }

    fn internal_error(&mut self, msg: &str) {
        log::error!("internal error: {msg}");
    }

    fn errors(&self) -> usize {
        self.errors
    }
}

/// Stable identity of a script function.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FuncId(pub u32);

/// Function flavors distinguished by the back end.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flavor {
    Standard,
    Event,
    /// Top-level breaks in a hook act as structured early returns and are
    /// rewritten to a dedicated opcode at finalize time.
    Hook,
}

/// The function object being compiled.
pub trait Function<'a> {
    fn flavor(&self) -> Flavor;
    fn name(&self) -> &str;
    fn func_id(&self) -> FuncId;

    /// Parameters in declaration order.
    fn params(&self) -> &[Ident<'a>];
}

/// Back-end options.
#[derive(Clone, Copy, Debug, Default)]
pub struct Options {
    /// Disable the peephole optimizer and frame-slot sharing.
    pub no_zam_opt: bool,
    /// Route the diagnostic code dump through the logger after compilation.
    pub dump_code: bool,
}
