//! Pure numeric derivations (spec §4.2): no I/O, no hidden state. Every
//! function here is a straight translation of a formula in the spec and is
//! covered by the property tests in `tests.rs`.

use zortex_config::{
    AreaTypeFactors, ImportanceMultipliers, PriorityMultipliers, ProjectSizesConfig,
    SizeMultiplier, TaskSizesConfig, TierConfig, XpConfig,
};

use crate::model::{
    AreaLink, AreaLinkType, AreaPath, Importance, Priority, Project, ProjectSize, Task, TaskSize,
};

fn task_size_multiplier(size: TaskSize, cfg: &TaskSizesConfig) -> f64 {
    let m: SizeMultiplier = match size {
        TaskSize::Xs => cfg.xs,
        TaskSize::Sm => cfg.sm,
        TaskSize::Md => cfg.md,
        TaskSize::Lg => cfg.lg,
        TaskSize::Xl => cfg.xl,
    };
    m.multiplier
}

fn project_size_multiplier(size: ProjectSize, cfg: &ProjectSizesConfig) -> f64 {
    let m: SizeMultiplier = match size {
        ProjectSize::Xs => cfg.xs,
        ProjectSize::Sm => cfg.sm,
        ProjectSize::Md => cfg.md,
        ProjectSize::Lg => cfg.lg,
        ProjectSize::Xl => cfg.xl,
        ProjectSize::Epic => cfg.epic,
        ProjectSize::Legendary => cfg.legendary,
        ProjectSize::Mythic => cfg.mythic,
        ProjectSize::Ultimate => cfg.ultimate,
    };
    m.multiplier
}

fn priority_multiplier(priority: Option<Priority>, cfg: &PriorityMultipliers) -> f64 {
    match priority {
        Some(Priority::P1) => cfg.p1,
        Some(Priority::P2) => cfg.p2,
        Some(Priority::P3) => cfg.p3,
        None => cfg.default,
    }
}

fn importance_multiplier(importance: Option<Importance>, cfg: &ImportanceMultipliers) -> f64 {
    match importance {
        Some(Importance::I1) => cfg.i1,
        Some(Importance::I2) => cfg.i2,
        Some(Importance::I3) => cfg.i3,
        None => cfg.default,
    }
}

/// `task_xp(task) = base × size_mult × priority_mult × importance_mult`,
/// floored to a non-negative integer (spec §4.2.1). Absent `size` behaves as
/// `md` (spec B1).
pub fn task_xp(
    task: &Task,
    sizes: &TaskSizesConfig,
    priorities: &PriorityMultipliers,
    importances: &ImportanceMultipliers,
) -> i64 {
    let size_mult = task_size_multiplier(task.size.unwrap_or_default(), sizes);
    let priority_mult = priority_multiplier(task.priority, priorities);
    let importance_mult = importance_multiplier(task.importance, importances);
    let value = sizes.base as f64 * size_mult * priority_mult * importance_mult;
    value.floor().max(0.0) as i64
}

/// Total XP pool for a project (spec §4.2.2): either its own size-derived
/// value, or the sum of its child tasks' `task_xp` when no size is set.
pub fn project_pool(project: &Project, cfg: &XpConfig) -> i64 {
    match project.size {
        Some(size) => {
            let size_mult = project_size_multiplier(size, &cfg.modifiers.project_sizes);
            let priority_mult = priority_multiplier(project.priority, &cfg.modifiers.priority_multipliers);
            let importance_mult =
                importance_multiplier(project.importance, &cfg.modifiers.importance_multipliers);
            let value = cfg.modifiers.project_sizes.base_xp as f64 * size_mult * priority_mult * importance_mult;
            value.floor().max(0.0) as i64
        }
        None => project
            .tasks
            .iter()
            .map(|t| {
                task_xp(
                    t,
                    &cfg.modifiers.task_sizes,
                    &cfg.modifiers.priority_multipliers,
                    &cfg.modifiers.importance_multipliers,
                )
            })
            .sum(),
    }
}

enum PhaseSize {
    Count(usize),
    Fraction(f64),
}

struct Phase {
    size: PhaseSize,
    xp_share: f64,
}

const SMALL_PHASES: [Phase; 3] = [
    Phase { size: PhaseSize::Fraction(0.2), xp_share: 0.40 },
    Phase { size: PhaseSize::Fraction(0.4), xp_share: 0.40 },
    Phase { size: PhaseSize::Fraction(0.4), xp_share: 0.20 },
];
const MEDIUM_PHASES: [Phase; 3] = [
    Phase { size: PhaseSize::Count(3), xp_share: 0.25 },
    Phase { size: PhaseSize::Fraction(0.6), xp_share: 0.50 },
    Phase { size: PhaseSize::Count(3), xp_share: 0.25 },
];
const LARGE_PHASES: [Phase; 3] = [
    Phase { size: PhaseSize::Fraction(0.15), xp_share: 0.20 },
    Phase { size: PhaseSize::Fraction(0.70), xp_share: 0.50 },
    Phase { size: PhaseSize::Fraction(0.15), xp_share: 0.30 },
];

fn phases_for(task_count: usize) -> &'static [Phase; 3] {
    if task_count <= 5 {
        &SMALL_PHASES
    } else if task_count <= 15 {
        &MEDIUM_PHASES
    } else {
        &LARGE_PHASES
    }
}

struct PhaseBoundary {
    start: usize,
    count: usize,
    xp_share: f64,
}

/// Walks the curve for `task_count` tasks, clamping fractional counts with
/// `max(1, floor(n·frac))` and assigning whatever remains to the final phase
/// so the boundaries always sum to exactly `task_count` (spec §4.2.2).
fn compute_phase_boundaries(task_count: usize) -> Vec<PhaseBoundary> {
    if task_count == 0 {
        return Vec::new();
    }
    let phases = phases_for(task_count);
    let mut boundaries = Vec::with_capacity(phases.len());
    let mut start = 0usize;
    let mut remaining = task_count;

    for (i, phase) in phases.iter().enumerate() {
        let count = if i == phases.len() - 1 {
            remaining
        } else {
            let raw = match phase.size {
                PhaseSize::Count(c) => c,
                PhaseSize::Fraction(f) => ((task_count as f64) * f).floor().max(1.0) as usize,
            };
            raw.min(remaining)
        };
        boundaries.push(PhaseBoundary { start, count, xp_share: phase.xp_share });
        start += count;
        remaining -= count;
    }

    boundaries
}

/// Earned project XP: `Σ over phases of (pool × phase_xp_share ×
/// min(1, completed_in_phase / phase_task_count))`, floored (spec §4.2.2).
/// A project with zero tasks earns zero regardless of completion count
/// (spec B2).
pub fn project_earned_xp(project: &Project, pool: i64) -> i64 {
    let task_count = project.total_tasks();
    if task_count == 0 {
        return 0;
    }

    let boundaries = compute_phase_boundaries(task_count);
    let mut earned = 0.0_f64;
    for boundary in &boundaries {
        if boundary.count == 0 {
            continue;
        }
        let completed_in_phase = project.tasks[boundary.start..boundary.start + boundary.count]
            .iter()
            .filter(|t| t.completed)
            .count();
        let ratio = (completed_in_phase as f64 / boundary.count as f64).min(1.0);
        earned += pool as f64 * boundary.xp_share * ratio;
    }

    earned.floor().max(0.0) as i64
}

pub struct Distributions {
    pub season_xp: i64,
    pub area_shares: Vec<(AreaPath, AreaLinkType, i64)>,
}

fn type_factor(link_type: AreaLinkType, factors: &AreaTypeFactors) -> f64 {
    match link_type {
        AreaLinkType::Basic => factors.basic,
        AreaLinkType::KeyResult => factors.key_result,
    }
}

/// Splits `amount` between the active season (100% or nothing) and a
/// harmonic-weighted share per linked area (spec §4.2.3). The last area's
/// share is the remainder of the floored total rather than its own floor, so
/// the per-area integers always sum exactly and any rounding drift is
/// absorbed by the last entry.
pub fn calculate_distributions(
    amount: i64,
    season_active: bool,
    areas: &[AreaLink],
    factors: &AreaTypeFactors,
) -> Distributions {
    let season_xp = if season_active { amount } else { 0 };

    let n = areas.len();
    if n == 0 {
        return Distributions { season_xp, area_shares: Vec::new() };
    }

    let harmonic_weights: Vec<f64> = (1..=n).map(|i| 1.0 / i as f64).collect();
    let harmonic_sum: f64 = harmonic_weights.iter().sum();
    let normalized: Vec<f64> = harmonic_weights.iter().map(|w| w / harmonic_sum).collect();

    let real_shares: Vec<f64> = areas
        .iter()
        .zip(normalized.iter())
        .map(|(link, w)| amount as f64 * w * type_factor(link.link_type, factors))
        .collect();

    let total_real: f64 = real_shares.iter().sum();
    let mut amounts: Vec<i64> = real_shares[..n - 1].iter().map(|v| v.floor() as i64).collect();
    let earlier_sum: i64 = amounts.iter().sum();
    amounts.push(total_real.floor() as i64 - earlier_sum);

    let area_shares = areas
        .iter()
        .zip(amounts)
        .map(|(link, amt)| (link.area.clone(), link.link_type, amt))
        .collect();

    Distributions { season_xp, area_shares }
}

/// `threshold(L) = floor(base · L^exponent)` (spec §6).
pub fn xp_threshold(level: u32, base: f64, exponent: f64) -> i64 {
    (base * (level as f64).powf(exponent)).floor() as i64
}

/// Smallest `L ≥ 1` such that `xp < threshold(L+1)` (spec §4.2.4). Monotone
/// in `xp` for any `base > 0`, `exponent > 0` (spec P6).
pub fn derive_level(xp: i64, base: f64, exponent: f64) -> u32 {
    let mut level = 1u32;
    while xp >= xp_threshold(level + 1, base, exponent) {
        level += 1;
        if level >= 1_000_000 {
            break;
        }
    }
    level
}

/// Progress into the next level, clamped to `[0,1]` (spec §4.2.4).
pub fn level_progress(xp: i64, level: u32, base: f64, exponent: f64) -> f64 {
    let lower = xp_threshold(level, base, exponent) as f64;
    let upper = xp_threshold(level + 1, base, exponent) as f64;
    if upper <= lower {
        return 1.0;
    }
    ((xp as f64 - lower) / (upper - lower)).clamp(0.0, 1.0)
}

/// Highest tier whose `required_level <= level` (spec §4.2.4). `tiers` must
/// be sorted ascending by `required_level` (enforced by
/// `zortex_config::SeasonsConfig::validate`).
pub fn current_tier<'a>(level: u32, tiers: &'a [TierConfig]) -> Option<&'a TierConfig> {
    tiers.iter().rev().find(|t| t.required_level <= level)
}

/// Immediate successor tier after the current one, if any (spec §4.2.4).
pub fn next_tier<'a>(level: u32, tiers: &'a [TierConfig]) -> Option<&'a TierConfig> {
    tiers.iter().find(|t| t.required_level > level)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AreaLink;
    use zortex_config::ZortexConfig;

    fn areas(paths: &[&str]) -> Vec<AreaLink> {
        paths
            .iter()
            .map(|p| AreaLink { area: AreaPath::new(*p), link_type: AreaLinkType::Basic })
            .collect()
    }

    #[test]
    fn standalone_task_default_md_matches_explicit_md() {
        let cfg = ZortexConfig::default();
        let a = Task::new("a");
        let mut b = Task::new("b");
        b.size = Some(TaskSize::Md);
        assert_eq!(
            task_xp(&a, &cfg.xp.modifiers.task_sizes, &cfg.xp.modifiers.priority_multipliers, &cfg.xp.modifiers.importance_multipliers),
            task_xp(&b, &cfg.xp.modifiers.task_sizes, &cfg.xp.modifiers.priority_multipliers, &cfg.xp.modifiers.importance_multipliers)
        );
    }

    #[test]
    fn task_xp_matches_scenario_1() {
        let cfg = ZortexConfig::default();
        let t = Task::new("t1");
        let xp = task_xp(
            &t,
            &cfg.xp.modifiers.task_sizes,
            &cfg.xp.modifiers.priority_multipliers,
            &cfg.xp.modifiers.importance_multipliers,
        );
        assert_eq!(xp, 10);
    }

    #[test]
    fn two_basic_areas_matches_scenario_2() {
        let cfg = ZortexConfig::default();
        let links = areas(&["Health", "Work"]);
        let dist = calculate_distributions(10, true, &links, &cfg.xp.area.type_factors);
        assert_eq!(dist.season_xp, 10);
        let health = dist.area_shares.iter().find(|(a, ..)| a.as_str() == "Health").unwrap();
        let work = dist.area_shares.iter().find(|(a, ..)| a.as_str() == "Work").unwrap();
        assert_eq!(health.2, 1);
        assert_eq!(work.2, 1);
    }

    #[test]
    fn small_project_curve_matches_scenario_3() {
        let cfg = ZortexConfig::default();
        let mut project = Project::new("p1");
        for i in 0..5 {
            project.tasks.push(Task::new(format!("t{i}")));
        }
        let pool = project_pool(&project, &cfg.xp);
        assert_eq!(pool, 50);

        project.tasks[0].completed = true;
        assert_eq!(project_earned_xp(&project, pool), 20);

        project.tasks[1].completed = true;
        assert_eq!(project_earned_xp(&project, pool), 30);

        for t in &mut project.tasks {
            t.completed = true;
        }
        assert_eq!(project_earned_xp(&project, pool), 50);
    }

    #[test]
    fn zero_task_project_earns_zero() {
        let project = Project::new("empty");
        assert_eq!(project_earned_xp(&project, 100), 0);
    }

    #[test]
    fn project_curve_is_monotone_in_completed_count() {
        let mut project = Project::new("p");
        for i in 0..9 {
            project.tasks.push(Task::new(format!("t{i}")));
        }
        let pool = 900;
        let mut previous = 0;
        for i in 0..project.tasks.len() {
            project.tasks[i].completed = true;
            let earned = project_earned_xp(&project, pool);
            assert!(earned >= previous);
            previous = earned;
        }
    }

    #[test]
    fn season_level_stays_at_one_for_low_xp() {
        assert_eq!(derive_level(10, 100.0, 1.2), 1);
    }

    #[test]
    fn season_level_is_monotone() {
        let mut previous_level = derive_level(0, 100.0, 1.2);
        let mut previous_xp = 0;
        for xp in (0..5000).step_by(7) {
            let level = derive_level(xp, 100.0, 1.2);
            assert!(level >= previous_level);
            assert!(xp >= previous_xp);
            previous_level = level;
            previous_xp = xp;
        }
    }

    #[test]
    fn tier_lookup_picks_highest_satisfied() {
        let cfg = ZortexConfig::default();
        let tiers = &cfg.xp.seasons.tiers;
        assert_eq!(current_tier(1, tiers).unwrap().name, "Bronze");
        assert_eq!(current_tier(4, tiers).unwrap().name, "Bronze");
        assert_eq!(current_tier(5, tiers).unwrap().name, "Silver");
        assert_eq!(current_tier(34, tiers).unwrap().name, "Platinum");
        assert_eq!(current_tier(35, tiers).unwrap().name, "Diamond");
        assert_eq!(next_tier(5, tiers).unwrap().name, "Gold");
        assert!(next_tier(35, tiers).is_none());
    }

    #[test]
    fn distribution_sum_never_exceeds_floored_total() {
        let cfg = ZortexConfig::default();
        let links = areas(&["a", "b", "c", "d", "e"]);
        let dist = calculate_distributions(101, true, &links, &cfg.xp.area.type_factors);
        let sum: i64 = dist.area_shares.iter().map(|(_, _, amt)| amt).sum();
        assert_eq!(sum, (101.0 * cfg.xp.area.type_factors.basic).floor() as i64);
        assert!(dist.area_shares.iter().all(|(_, _, amt)| *amt >= 0));
    }
}
