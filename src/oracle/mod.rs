// ABOUTME: Oracle module - the text-completion collaborator behind agents and the judge.
// ABOUTME: Defines request/reply types, the Oracle trait, retry wrapper, and the Azure client.

mod azure;
mod client;
mod retry;
mod scripted;
mod types;

pub use azure::*;
pub use client::*;
pub use retry::*;
pub use scripted::*;
pub use types::*;

#[cfg(test)]
mod azure_test;
#[cfg(test)]
mod retry_test;
