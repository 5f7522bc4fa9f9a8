//! `XPService`: translates lifecycle events into ledger transactions (spec
//! §4.4).

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::debug;
use zortex_config::ZortexConfig;
use zortex_events::EventBus;

use crate::calculator;
use crate::event::{DocContext, Event};
use crate::model::{AreaLink, AreaLinkType, AreaPath, Objective, Project, Task, Transaction, TransactionKind};
use crate::store::XpStore;

/// Where a context's `amount` comes from: a single standalone task, or a
/// project's curve recomputed from its current task list (spec §4.4
/// `kind: task | project`).
enum AmountSource {
    StandaloneTask { task: Task, completed: bool },
    ProjectCurve { project: Project },
}

/// The resolved inputs `update_xp` needs: where the ledger entry is keyed,
/// which areas receive a share, and where the raw amount comes from.
pub struct XpContext {
    kind: TransactionKind,
    id: String,
    areas: Vec<AreaLink>,
    amount_source: AmountSource,
}

fn push_unique(path: &AreaPath, ordered: &mut Vec<AreaPath>, seen: &mut HashSet<AreaPath>) {
    if seen.insert(path.clone()) {
        ordered.push(path.clone());
    }
}

/// Enumerates areas in the order fixed by spec §4.4: project areas, then
/// task areas, then objective-linked areas, each deduplicated against
/// earlier insertions. An area is marked `key_result` if it belongs to an
/// objective whose key result links the project's `link`; otherwise
/// `basic`.
fn collect_areas(project: Option<&Project>, task: Option<&Task>, objectives: &[Objective]) -> Vec<AreaLink> {
    let mut ordered: Vec<AreaPath> = Vec::new();
    let mut seen: HashSet<AreaPath> = HashSet::new();

    if let Some(p) = project {
        for a in &p.areas {
            push_unique(a, &mut ordered, &mut seen);
        }
    }
    if let Some(t) = task {
        for a in &t.areas {
            push_unique(a, &mut ordered, &mut seen);
        }
    }

    let mut key_result_areas: HashSet<AreaPath> = HashSet::new();
    if let Some(p) = project {
        for objective in objectives {
            let linked = objective.key_results.iter().any(|kr| kr.linked_projects.contains(&p.link));
            if linked {
                for a in &objective.areas {
                    push_unique(a, &mut ordered, &mut seen);
                    key_result_areas.insert(a.clone());
                }
            }
        }
    }

    ordered
        .into_iter()
        .map(|area| {
            let link_type = if key_result_areas.contains(&area) {
                AreaLinkType::KeyResult
            } else {
                AreaLinkType::Basic
            };
            AreaLink { area, link_type }
        })
        .collect()
}

/// Builds the [`XpContext`] for a lifecycle event (spec §4.4
/// `build_context`).
pub fn build_context(event: &Event) -> Option<XpContext> {
    match event {
        Event::TaskCompleted { task, doc_context } | Event::TaskUncompleted { task, doc_context } => {
            let completed = matches!(event, Event::TaskCompleted { .. });
            match &doc_context.project {
                Some(project) => Some(XpContext {
                    kind: TransactionKind::Project,
                    id: project.link.clone(),
                    areas: collect_areas(Some(project), Some(task), &doc_context.objectives),
                    amount_source: AmountSource::ProjectCurve { project: project.clone() },
                }),
                None => Some(XpContext {
                    kind: TransactionKind::Task,
                    id: task.id.clone(),
                    areas: collect_areas(None, Some(task), &[]),
                    amount_source: AmountSource::StandaloneTask { task: task.clone(), completed },
                }),
            }
        }
        Event::ProjectChanged { project, objectives } => Some(XpContext {
            kind: TransactionKind::Project,
            id: project.link.clone(),
            areas: collect_areas(Some(project), None, objectives),
            amount_source: AmountSource::ProjectCurve { project: project.clone() },
        }),
        _ => None,
    }
}

fn calculate_xp(context: &XpContext, config: &ZortexConfig) -> i64 {
    match &context.amount_source {
        AmountSource::StandaloneTask { task, completed } => {
            if *completed {
                calculator::task_xp(
                    task,
                    &config.xp.modifiers.task_sizes,
                    &config.xp.modifiers.priority_multipliers,
                    &config.xp.modifiers.importance_multipliers,
                )
            } else {
                0
            }
        }
        AmountSource::ProjectCurve { project } => {
            let pool = calculator::project_pool(project, &config.xp);
            calculator::project_earned_xp(project, pool)
        }
    }
}

/// Orchestrates `build_context` → `calculate_xp` → `calculate_distributions`
/// → `record_transaction`, emitting `xp:awarded`/`xp:removed` and
/// `season:leveled_up` on the shared [`EventBus`] (spec §4.4).
pub struct XpService {
    config: Arc<ZortexConfig>,
    store: Arc<XpStore>,
}

impl XpService {
    pub fn new(config: Arc<ZortexConfig>, store: Arc<XpStore>) -> Self {
        Self { config, store }
    }

    /// Registers this service's handlers on `bus` for `task:completed`,
    /// `task:uncompleted`, and `project:changed` (spec §4.4).
    pub fn register_handlers(self: &Arc<Self>, bus: &Arc<EventBus<Event>>) {
        for kind in ["task:completed", "task:uncompleted", "project:changed"] {
            let svc = self.clone();
            let bus_for_handler = bus.clone();
            bus.on(kind, format!("xp_service::{kind}"), 0, move |event| {
                svc.update_xp(event, &bus_for_handler);
                Ok(())
            });
        }
    }

    /// `update_xp(context)` (spec §4.4): computes the amount, distributes
    /// it, records the transaction, and emits the resulting events.
    pub fn update_xp(&self, event: &Event, bus: &Arc<EventBus<Event>>) {
        let Some(context) = build_context(event) else {
            return;
        };

        let amount = calculate_xp(&context, &self.config);
        let distributions = calculator::calculate_distributions(
            amount,
            self.store.has_active_season(),
            &context.areas,
            &self.config.xp.area.type_factors,
        );

        let txn = Transaction {
            kind: context.kind,
            id: context.id.clone(),
            timestamp: Utc::now(),
            base_xp: amount,
            season_xp: distributions.season_xp,
            area_xp: distributions
                .area_shares
                .iter()
                .map(|(area, _, amt)| (area.as_str().to_string(), *amt))
                .collect(),
        };

        let outcome = self.store.record_transaction(txn, &self.config.xp.season);
        debug!(id = %context.id, delta = outcome.delta, "xp transaction recorded");

        if outcome.delta > 0 {
            bus.emit(Event::XpAwarded { kind: context.kind, id: context.id.clone(), amount: outcome.delta });
        } else if outcome.delta < 0 {
            bus.emit(Event::XpRemoved { kind: context.kind, id: context.id.clone(), amount: -outcome.delta });
        }

        if let Some((old_level, new_level)) = outcome.leveled_up {
            let tier = calculator::current_tier(new_level, &self.config.xp.seasons.tiers)
                .map(|t| t.name.clone());
            bus.emit(Event::SeasonLeveledUp { old_level, new_level, tier });
        }
    }
}
