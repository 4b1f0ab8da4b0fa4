// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// RESEARCH AGENT - PIPELINE LINEAR
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Estado de formato fixo (`state`), steps que delegam a um colaborador
// externo (`steps`), o orquestrador (`graph`) e a superfície de entrada
// (`pipeline`).
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

mod graph;
mod pipeline;
mod state;
/// Steps do pipeline e a trait [`steps::Step`]
pub mod steps;

pub use graph::{CompiledGraph, ResearchGraph, RunTrace, StepRecord, END};
pub use pipeline::{four_stage, two_stage, ResearchPipeline, Topology};
pub use state::{ResearchState, StateField, StateUpdate, WriteConflict};
pub use steps::{ResearchOptions, Step};
