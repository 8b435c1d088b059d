// Identifiers and their observable types. The compiler only needs three
// facts about an identifier: its name (for frame layouts and diagnostics),
// which class it belongs to (global, parameter, local, temporary), and
// whether its type is managed, i.e. requires an explicit release whenever a
// frame slot holding one of its values is re-assigned. Everything else about
// the script type system stays in the front end.

use std::fmt;
use std::hash::{Hash, Hasher};

/// Script-level value types, reduced to what the back end observes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ZType {
    Bool,
    Int,
    Count,
    Double,
    String,
    Pattern,
    Table,
    Record,
    Vector,
    Func,
    Any,
}

impl ZType {
    /// Whether values of this type need explicit memory management on
    /// slot re-assignment.
    pub fn is_managed(self) -> bool {
        !matches!(self, ZType::Bool | ZType::Int | ZType::Count | ZType::Double)
    }
}

/// Which class of frame denizen an identifier is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IdentKind {
    Global,
    Param,
    Local,
    /// Compiler-generated temporary.
    Temp,
}

/// An identifier with an interned name.
#[derive(Clone, Copy, Debug)]
pub struct Ident<'a> {
    name: &'a str,
    ty: ZType,
    kind: IdentKind,
}

impl<'a> Ident<'a> {
    pub fn new(name: &'a str, ty: ZType, kind: IdentKind) -> Self {
        Self { name, ty, kind }
    }

    pub fn name(&self) -> &'a str {
        self.name
    }

    pub fn ty(&self) -> ZType {
        self.ty
    }

    pub fn kind(&self) -> IdentKind {
        self.kind
    }

    pub fn is_managed(&self) -> bool {
        self.ty.is_managed()
    }
}

// Names are unique per function scope, so identity is the name alone.
impl PartialEq for Ident<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Ident<'_> {}

impl Hash for Ident<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Display for Ident<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
