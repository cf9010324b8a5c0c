//! Testing utilities and mock implementations
//!
//! Mocks for the language-model and capability seams, so crews can be run in
//! tests without API keys or network access.

pub mod mocks;

pub use mocks::*;
