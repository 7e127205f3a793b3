pub mod container;
pub mod error;
pub mod harness;
pub mod interactive;
pub mod monitor;
pub mod prelude;
pub mod probe;

pub use error::{Error, Result};
