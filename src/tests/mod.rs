//! Cross-module tests for the thread manager.

mod helpers;
mod property;
