pub mod commands;
pub mod config;
pub mod install;
pub mod runtime;
pub mod tooling;
