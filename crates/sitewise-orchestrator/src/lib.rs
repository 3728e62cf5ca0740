//! Sitewise Orchestrator - Query orchestration and project lifecycle
//!
//! This crate turns a natural-language request into a reply: special queries,
//! the strategy chain (intelligent agent, then direct invocation), the
//! deterministic pipeline, project naming, and lifecycle management.

pub mod commands;
pub mod engine;
pub mod guidance;
pub mod lifecycle;
pub mod naming;
pub mod reply;
pub mod strategy;
pub mod trace;

pub use commands::{classify_special, parse_lifecycle, LifecycleCommand, SpecialQuery};
pub use engine::{Orchestrator, OrchestratorDeps, Pipeline};
pub use guidance::{Guidance, LIST_PROJECTS_QUERY};
pub use lifecycle::{
    BulkDeleteOutcome, Dashboard, DashboardEntry, DashboardTotals, DuplicateChoiceOutcome,
    ProjectExport, ProjectLifecycleManager, SearchFilters, EXPORT_FORMAT_VERSION,
};
pub use naming::ProjectNameGenerator;
pub use strategy::{AgentStrategy, DirectInvocationStrategy, Strategy, StrategyOutcome};
pub use trace::TraceRecorder;
