#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]
pub mod assets;
pub mod causes;
pub mod check;
pub mod config;
pub mod error;
pub mod errorlog;
#[cfg(any(test, feature = "test-fixtures"))]
pub mod fixtures;
pub mod io;
pub mod layout;
pub mod progress;
pub mod run;
pub mod scoring;
pub mod sci;
pub mod select;
pub mod types;

#[path = "../csmf/mod.rs"]
pub mod csmf;

pub use error::CodError;
pub use run::{Engine, RunOptions, RunResult, run};
