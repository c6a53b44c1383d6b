//! Core SAYRA library (session channel, config, logging).

pub mod config;
pub mod interrupt;
pub mod logging;
pub mod session;
