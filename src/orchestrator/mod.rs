// ABOUTME: Orchestrator module - the Manager loop and its pluggable pieces.
// ABOUTME: Speaker selection, completion judgment, aggregation, and run outcomes.

mod aggregate;
mod judge;
mod manager;
mod outcome;
mod selection;

pub use aggregate::{Finding, FindingSource, aggregate, compose};
pub use judge::{CompletionJudge, ExhaustiveJudge, OracleJudge};
pub use manager::Manager;
pub use outcome::{Failure, FinalResult};
pub use selection::{KeywordSelector, Selection, SpeakerSelector, score};
