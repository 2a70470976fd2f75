// ABOUTME: Conversation module - the per-task message log and its state machine.
// ABOUTME: Enforces turn order, round budget, and call/result pairing.

mod conversation;
mod message;
mod state;

pub use conversation::*;
pub use message::*;
pub use state::*;
