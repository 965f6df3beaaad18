//! Strata Core
//!
//! Foundational types shared by every Strata crate:
//!
//! - [`NodeHandle`]: generational handle of a scene node
//! - [`StrataError`] / [`Result`]: the engine-wide error type
//! - [`interner`]: global string interner used for property identifiers
//! - [`Signal`]: priority-ordered, single-threaded signal/slot primitive

pub mod errors;
pub mod handles;
pub mod interner;
pub mod signal;

pub use errors::{Result, StrataError};
pub use handles::NodeHandle;
pub use interner::Symbol;
pub use signal::{Connection, Signal};
