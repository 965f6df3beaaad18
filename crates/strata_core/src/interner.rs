//! Global String Interner
//!
//! Turns property names into compact integer [`Symbol`]s so that change
//! notifications can be keyed, hashed and compared without touching string
//! data on the hot path.

use std::sync::LazyLock;

use lasso::{Spur, ThreadedRodeo};

static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::new);

/// Compact identifier of an interned string.
pub type Symbol = Spur;

/// Interns `s`, returning the existing symbol if it was seen before.
#[inline]
pub fn intern(s: &str) -> Symbol {
    INTERNER.get_or_intern(s)
}

/// Looks up the symbol of an already interned string without allocating.
#[inline]
#[must_use]
pub fn get(s: &str) -> Option<Symbol> {
    INTERNER.get(s)
}

/// Resolves a symbol back to its string.
#[inline]
#[must_use]
pub fn resolve(sym: Symbol) -> &'static str {
    INTERNER.resolve(&sym)
}
