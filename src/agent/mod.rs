// ABOUTME: Capability agent module - descriptors, the roster, and the agent runner.
// ABOUTME: Provides CapabilityAgent, AgentDescriptor, AgentRoster, and domain presets.

mod definition;
mod presets;
mod runner;

pub use definition::{AgentDescriptor, AgentRoster};
pub use presets::{AZURE_AGENT, BUILD_AGENT, FILE_AGENT, PRESETS, Preset, STORAGE_AGENT, standard_roster};
pub use runner::{CapabilityAgent, Proposal};

#[cfg(test)]
mod runner_test;
