// ABOUTME: Root module for switchboard - routes operator requests to capability agents.
// ABOUTME: Re-exports all public types from submodules.

pub mod agent;
pub mod config;
pub mod conversation;
pub mod error;
pub mod oracle;
pub mod orchestrator;
pub mod prelude;
pub mod rules;
pub mod session;
pub mod tool;
pub mod tools;

pub use error::SwitchboardError;
