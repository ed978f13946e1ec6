//! iep-orchestrator - the durable workflow engine driving the IEP
//! processing state graph (C8): S1 (start) through S10 (finalize), with
//! per-step timeouts, bounded retries, and the concurrency/merge strategy
//! for the English extraction fan-out (S7) and per-language translation
//! fan-out (S9).

pub mod context;
pub mod engine;
pub mod error;
pub mod retry;

pub use context::StepContext;
pub use engine::{run, ExecutionInput, ExecutionOutcome};
pub use error::OrchestratorError;
