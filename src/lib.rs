//! Launch Risk Library
//!
//! Rug-pull, creator and holder risk signals for freshly launched tokens.

pub mod config;
pub mod error;
pub mod outcome;
pub mod provider;
pub mod risk;
pub mod storage;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
pub use outcome::{AbsenceReason, Outcome};
