//! Mira - hand-gesture interpretation.
//!
//! Consumes per-frame hand landmarks from an external detector and turns
//! them into pointer, click, scroll, window-switch and volume actions, plus
//! recognized gesture labels from a pair of trained models.

pub mod classify;
pub mod command;
pub mod config;
pub mod hand;
pub mod replay;
pub mod session;
pub mod sexp;

pub use config::InterpreterConfig;
