//! Entities from spec §3: Task, Project, Area, Season, and the XP Transaction
//! the ledger is keyed on.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// A `/`-separated area path. Stored canonical; lookups elsewhere in the
/// system may be case-insensitive, but the path carried through contexts and
/// transactions keeps whatever case it was given.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AreaPath(String);

impl AreaPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn eq_ignore_case(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other)
    }
}

impl std::fmt::Display for AreaPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskSize {
    Xs,
    Sm,
    Md,
    Lg,
    Xl,
}

impl Default for TaskSize {
    fn default() -> Self {
        TaskSize::Md
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectSize {
    Xs,
    Sm,
    Md,
    Lg,
    Xl,
    Epic,
    Legendary,
    Mythic,
    Ultimate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    P1,
    P2,
    P3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    I1,
    I2,
    I3,
}

/// A task: either standalone or a child of a [`Project`] (spec §3 Task).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub size: Option<TaskSize>,
    pub priority: Option<Priority>,
    pub importance: Option<Importance>,
    pub areas: Vec<AreaPath>,
    pub completed: bool,
}

impl Task {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            size: None,
            priority: None,
            importance: None,
            areas: Vec::new(),
            completed: false,
        }
    }
}

/// A project and its ordered child tasks (spec §3 Project). Task order fixes
/// curve phase position; it must not be re-sorted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub link: String,
    pub size: Option<ProjectSize>,
    pub priority: Option<Priority>,
    pub importance: Option<Importance>,
    pub areas: Vec<AreaPath>,
    pub tasks: Vec<Task>,
}

impl Project {
    pub fn new(link: impl Into<String>) -> Self {
        Self {
            link: link.into(),
            size: None,
            priority: None,
            importance: None,
            areas: Vec::new(),
            tasks: Vec::new(),
        }
    }

    pub fn total_tasks(&self) -> usize {
        self.tasks.len()
    }

    pub fn completed_tasks(&self) -> usize {
        self.tasks.iter().filter(|t| t.completed).count()
    }
}

/// A key result belonging to an [`Objective`], linking a set of projects by
/// their `link`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyResult {
    pub id: String,
    pub linked_projects: HashSet<String>,
}

/// An objective carrying its own areas and key results. A project whose
/// `link` is named by one of the objective's key results has every one of
/// the objective's areas upgraded to a `key_result` link (spec §4.4).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Objective {
    pub id: String,
    pub areas: Vec<AreaPath>,
    pub key_results: Vec<KeyResult>,
}

/// An active season (spec §3 Season).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveSeason {
    pub name: String,
    pub start_date: chrono::NaiveDate,
    pub end_date: chrono::NaiveDate,
}

/// An archived season, recorded into `season_history` on `end_season()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonRecord {
    pub name: String,
    pub start_date: chrono::NaiveDate,
    pub end_date: chrono::NaiveDate,
    pub final_level: u32,
    pub final_xp: i64,
    pub xp_transactions: std::collections::BTreeMap<String, Transaction>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Task,
    Project,
}

/// One row in the XP ledger, keyed by `id` (spec §3 "XP Transaction").
/// Recording a transaction for an existing id replaces it: the old
/// contributions are reversed before the new ones are applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub kind: TransactionKind,
    pub id: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub base_xp: i64,
    pub season_xp: i64,
    pub area_xp: std::collections::BTreeMap<String, i64>,
}

impl Transaction {
    /// Aggregated total of this transaction's contributions.
    pub fn total(&self) -> i64 {
        self.season_xp + self.area_xp.values().sum::<i64>()
    }
}

/// Whether an area link was reached directly (a plain mention on a task or
/// project) or upgraded via an objective's key result (spec §4.2.3,
/// §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AreaLinkType {
    Basic,
    KeyResult,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AreaLink {
    pub area: AreaPath,
    pub link_type: AreaLinkType,
}
