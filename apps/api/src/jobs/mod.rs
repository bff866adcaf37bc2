// Job execution: the engine, its two dispatch modes, and the record store.
// Every path that touches an AnalysisJob after creation goes through ExecutionEngine.

pub mod bounded;
pub mod dispatch;
pub mod engine;
pub mod handlers;
pub mod queue;
pub mod store;
pub mod worker;

#[cfg(test)]
pub mod testing;
