//! streamguard core: windowed failure escalation for stream-processing workers.

pub mod action;
pub mod clock;
pub mod config;
pub mod error;
pub mod policy;
pub mod runner;
pub mod tracker;
pub mod transform;

pub use action::*;
pub use clock::*;
pub use config::*;
pub use error::*;
pub use policy::*;
pub use runner::*;
pub use tracker::*;
pub use transform::*;

#[cfg(test)]
mod tests_scenarios;
