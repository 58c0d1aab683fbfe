#![forbid(unsafe_code)]

//! Domain model for proctored, timed MCQ test attempts.

pub mod countdown;
pub mod error;
pub mod model;
pub mod proctor;
pub mod time;

pub use error::Error;
pub use time::Clock;
