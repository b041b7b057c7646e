//! Behavioural tests for the client runtime.

mod runner;
mod support;
