//! Lexical layer of the prism shader cross-compiler.
//!
//! Everything here operates at the text/token level on the engine's
//! GLSL 1.x-flavored source dialect: a mutable [`SourceBuffer`] with
//! whole-token find/replace, a declaration parser for
//! `uniform`/`varying`/`out` statements, the variable model, and the
//! static table of `gl_*` built-ins. The backend emitters in
//! `prism-shader` are composed entirely from these primitives.

pub mod buffer;
pub mod builtins;
pub mod decl;
pub mod var;

pub use buffer::SourceBuffer;
pub use decl::{parse_declarations, DeclError};
pub use var::{VarTable, VarType, Variable};
