//! Core types for Erudite.

pub mod generation;
pub mod message;
pub mod note;
pub mod paper;
pub mod progress;

pub use generation::*;
pub use message::*;
pub use note::*;
pub use paper::*;
pub use progress::*;
