//! Language adapter families

mod brace;
mod indent;

pub use brace::BraceAdapter;
pub use indent::IndentAdapter;
