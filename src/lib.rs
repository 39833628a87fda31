//! # mplc: compiler for the MPL message parameter language
//!
//! MPL describes typed parameters grouped into parameter sets, and categories of
//! commands, responses and events whose arguments are bags of those parameters. The
//! compiler builds an object graph from the source, resolves inheritance between bags and
//! categories, derives the documentation for every output format, validates the result
//! and emits one of several artifacts from it.
//!
//! ## Passes
//!
//! 1. **parse**: [`parser::parse_file`] / [`parser::parse_str`] feed declarations to the
//!    [`Compiler`] operations that build the graph.
//! 2. **wrap-up**: [`Compiler::wrap_up_definition`] assigns parameter IDs and closes
//!    message families.
//! 3. **doc conversion**: [`Compiler::convert_doc`] turns raw doc comments into Doxygen,
//!    LaTeX and help entries, with a [`doc::LocalTagHandler`] for local tags.
//! 4. **check**: [`Compiler::check_parameters`] rejects dangling references, virtual
//!    parameters without a concrete descendant and inconsistent defaults.
//! 5. **emit**: [`backend::render`] / [`backend::write_all`] for one [`CodegenMode`].
//!
//! [`Compiler::finish`] runs passes 2 to 4.
//!
//! ## Example
//!
//! ```text
//! parameter_set P {
//!     uint8 x max = 10;
//!     string s;
//! }
//!
//! category Cat {
//!     parameter_set = P;
//!
//!     /** Set x. */
//!     command Set(x) => (s);
//! }
//! ```
//!
//! ## Usage
//!
//! See the `mplcomp` binary and `tests/integration.rs` for full examples.

pub mod backend;
pub mod category;
pub mod compiler;
pub mod doc;
pub mod dump;
pub mod error;
pub mod escape;
pub mod names;
pub mod object;
pub mod parameter;
pub mod paramset;
pub mod parser;
pub mod types;

pub use category::{Category, CategoryId, Command, Event, MessageKind, MessageSpec};
pub use compiler::{CodegenMode, Compiler};
pub use doc::{AtCommandTags, LocalTagHandler, NoLocalTags};
pub use error::{CompileError, CompileResult, Position};
pub use parameter::{Direction, ParamId, ParamKind, Parameter, ParameterListEntry};
pub use paramset::{ParamSetId, ParameterSet};
pub use parser::{parse_file, parse_str};
