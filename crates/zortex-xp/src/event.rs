//! The tagged union of events carried on the [`zortex_events::EventBus`]
//! used by the XP subsystem (spec §6 "Event schema").

use zortex_events::EventKindOf;

use crate::model::{Objective, Project, Task, TransactionKind};

/// Resolved document context for a task lifecycle event: the project the
/// task belongs to (if any) and the objectives visible to it, used by
/// `build_context` to enumerate key-result-linked areas (spec §4.4).
#[derive(Debug, Clone, Default)]
pub struct DocContext {
    pub project: Option<Project>,
    pub objectives: Vec<Objective>,
}

#[derive(Debug, Clone)]
pub enum Event {
    TaskCompleted { task: Task, doc_context: DocContext },
    TaskUncompleted { task: Task, doc_context: DocContext },
    ProjectChanged { project: Project, objectives: Vec<Objective> },
    XpAwarded { kind: TransactionKind, id: String, amount: i64 },
    XpRemoved { kind: TransactionKind, id: String, amount: i64 },
    SeasonLeveledUp { old_level: u32, new_level: u32, tier: Option<String> },
    SeasonStarted { name: String },
    SeasonEnded { name: String },
    StoreSaved { store: String },
}

impl EventKindOf for Event {
    fn kind(&self) -> &'static str {
        match self {
            Event::TaskCompleted { .. } => "task:completed",
            Event::TaskUncompleted { .. } => "task:uncompleted",
            Event::ProjectChanged { .. } => "project:changed",
            Event::XpAwarded { .. } => "xp:awarded",
            Event::XpRemoved { .. } => "xp:removed",
            Event::SeasonLeveledUp { .. } => "season:leveled_up",
            Event::SeasonStarted { .. } => "season:started",
            Event::SeasonEnded { .. } => "season:ended",
            Event::StoreSaved { .. } => "store:saved",
        }
    }
}
