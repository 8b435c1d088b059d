// This module provides arena-based session state shared by one or more
// compilations. The Session owns a reference to a bumpalo arena and interns
// identifier names in it, so identifiers, frame layouts and the emitted body
// all borrow the same lifetime and remain valid after the compiler that
// produced them is dropped. A Session may be reused across the functions of a
// script; each function still gets its own compiler instance.

//! Arena-backed compilation session.

use bumpalo::Bump;
use std::cell::RefCell;
use std::collections::HashMap;

use super::ident::{Ident, IdentKind, ZType};

/// Shared allocation and interning state for a compilation run.
///
/// All names handed out by [`Session::intern`] live in the arena, so an
/// [`Ident`] is a pair of copies of small data plus a borrowed `&'arena str`.
pub struct Session<'arena> {
    arena: &'arena Bump,
    interned: RefCell<HashMap<String, &'arena str>>,
}

impl<'arena> Session<'arena> {
    /// Create a session backed by the given arena.
    pub fn new(arena: &'arena Bump) -> Self {
        Self {
            arena,
            interned: RefCell::new(HashMap::new()),
        }
    }

    /// Access the underlying arena.
    pub fn arena(&self) -> &'arena Bump {
        self.arena
    }

    /// Intern a string in the arena, reusing a previous copy if present.
    pub fn intern(&self, s: &str) -> &'arena str {
        let mut interned = self.interned.borrow_mut();
        if let Some(&existing) = interned.get(s) {
            return existing;
        }
        let copy = self.arena.alloc_str(s);
        interned.insert(s.to_string(), copy);
        copy
    }

    /// Build an identifier with an interned name.
    pub fn ident(&self, name: &str, ty: ZType, kind: IdentKind) -> Ident<'arena> {
        Ident::new(self.intern(name), ty, kind)
    }
}
