// Simple concrete implementations of the front-end collaborator traits,
// enough to drive the back end in tests and examples without a real script
// front end.

//! Ready-made collaborators for driving the compiler in tests.

use std::collections::HashSet;

use super::adaptor::{Flavor, FuncId, Function, ProfileSource, Reducer, Reporter, UseDefs};
use super::ident::{Ident, IdentKind, ZType};
use super::session::Session;

/// A function object described by plain fields.
pub struct TestFunc<'a> {
    pub name: String,
    pub flavor: Flavor,
    pub id: FuncId,
    pub params: Vec<Ident<'a>>,
}

impl<'a> TestFunc<'a> {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            flavor: Flavor::Standard,
            id: FuncId(0),
            params: Vec::new(),
        }
    }
}

impl<'a> Function<'a> for TestFunc<'a> {
    fn flavor(&self) -> Flavor {
        self.flavor
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn func_id(&self) -> FuncId {
        self.id
    }

    fn params(&self) -> &[Ident<'a>] {
        &self.params
    }
}

/// Profile data described by plain fields.
#[derive(Default)]
pub struct TestProfile<'a> {
    pub globals: Vec<Ident<'a>>,
    pub locals: Vec<Ident<'a>>,
    pub non_recursive: bool,
}

impl<'a> ProfileSource<'a> for TestProfile<'a> {
    fn globals(&self) -> &[Ident<'a>] {
        &self.globals
    }

    fn locals(&self) -> &[Ident<'a>] {
        &self.locals
    }

    fn non_recursive(&self) -> bool {
        self.non_recursive
    }
}

/// Use-definition results described by an optional usage set.
#[derive(Default)]
pub struct TestUseDefs<'a> {
    pub usage: Option<HashSet<Ident<'a>>>,
}

impl<'a> TestUseDefs<'a> {
    /// Usage information marking every given identifier as used.
    pub fn using(ids: impl IntoIterator<Item = Ident<'a>>) -> Self {
        Self {
            usage: Some(ids.into_iter().collect()),
        }
    }
}

impl<'a> UseDefs<'a> for TestUseDefs<'a> {
    fn has_usage(&self) -> bool {
        self.usage.is_some()
    }

    fn get_usage(&self) -> Option<&HashSet<Ident<'a>>> {
        self.usage.as_ref()
    }
}

/// A reducer that hands out numbered temporaries.
pub struct TestReducer<'s, 'a> {
    session: &'s Session<'a>,
    counter: u32,
}

impl<'s, 'a> TestReducer<'s, 'a> {
    pub fn new(session: &'s Session<'a>) -> Self {
        Self {
            session,
            counter: 0,
        }
    }
}

impl<'a> Reducer<'a> for TestReducer<'_, 'a> {
    fn new_temp(&mut self, ty: ZType) -> Ident<'a> {
        let name = format!("#t{}", self.counter);
        self.counter += 1;
        self.session.ident(&name, ty, IdentKind::Temp)
    }
}

/// A reporter that keeps every message for inspection.
#[derive(Debug, Default)]
pub struct CollectingReporter {
    pub errors: Vec<String>,
    pub internal: Vec<String>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Reporter for CollectingReporter {
    fn error(&mut self, msg: &str) {
        self.errors.push(msg.to_string());
    }

    fn internal_error(&mut self, msg: &str) {
        self.internal.push(msg.to_string());
    }

    fn errors(&self) -> usize {
        self.errors.len()
    }
}
