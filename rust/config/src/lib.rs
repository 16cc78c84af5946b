//! Environment catalog and run parameters shared by the driving harness.

mod catalog;
mod run;
mod types;

pub use catalog::*;
pub use run::*;
pub use types::*;
