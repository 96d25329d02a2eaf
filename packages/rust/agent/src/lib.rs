//! Decision agent: AI-backed content analysis with a deterministic
//! heuristic fallback.
//!
//! The AI backend is an enhancement, never a dependency — any backend
//! failure or timeout degrades to the heuristic path and the pipeline
//! carries on.

mod backend;
mod decision;
mod heuristic;

pub use backend::{AiBackend, AnalysisInput, AnalysisPayload, OpenAiBackend};
pub use decision::DecisionAgent;
pub use heuristic::heuristic_decision;
