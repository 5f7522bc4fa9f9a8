use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Top-level configuration recognized by the gamification engine.
///
/// Mirrors the keys documented in spec §6 exactly: `xp.*` and
/// `notifications.*`. Every field carries a default so a missing or partial
/// TOML file still produces a usable configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZortexConfig {
    pub xp: XpConfig,
    pub notifications: NotificationsConfig,
}

impl Default for ZortexConfig {
    fn default() -> Self {
        Self {
            xp: XpConfig::default(),
            notifications: NotificationsConfig::default(),
        }
    }
}

impl ZortexConfig {
    /// Validate cross-field invariants that a bare `#[serde(default)]`
    /// derive cannot express (spec §7 `ConfigError`).
    pub fn validate(&self) -> ConfigResult<()> {
        self.xp.seasons.validate()?;
        self.notifications.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct XpConfig {
    pub modifiers: ModifiersConfig,
    pub season: SeasonCurveConfig,
    pub area: AreaConfig,
    pub seasons: SeasonsConfig,
}

impl Default for XpConfig {
    fn default() -> Self {
        Self {
            modifiers: ModifiersConfig::default(),
            season: SeasonCurveConfig::default(),
            area: AreaConfig::default(),
            seasons: SeasonsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizeMultiplier {
    pub multiplier: f64,
}

impl SizeMultiplier {
    const fn new(multiplier: f64) -> Self {
        Self { multiplier }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModifiersConfig {
    pub task_sizes: TaskSizesConfig,
    pub project_sizes: ProjectSizesConfig,
    pub priority_multipliers: PriorityMultipliers,
    pub importance_multipliers: ImportanceMultipliers,
}

impl Default for ModifiersConfig {
    fn default() -> Self {
        Self {
            task_sizes: TaskSizesConfig::default(),
            project_sizes: ProjectSizesConfig::default(),
            priority_multipliers: PriorityMultipliers::default(),
            importance_multipliers: ImportanceMultipliers::default(),
        }
    }
}

/// `xp.modifiers.task_sizes.{base,xs,sm,md,lg,xl}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskSizesConfig {
    pub base: i64,
    pub xs: SizeMultiplier,
    pub sm: SizeMultiplier,
    pub md: SizeMultiplier,
    pub lg: SizeMultiplier,
    pub xl: SizeMultiplier,
}

impl Default for TaskSizesConfig {
    fn default() -> Self {
        Self {
            base: 10,
            xs: SizeMultiplier::new(0.5),
            sm: SizeMultiplier::new(0.8),
            md: SizeMultiplier::new(1.0),
            lg: SizeMultiplier::new(1.5),
            xl: SizeMultiplier::new(2.0),
        }
    }
}

/// `xp.modifiers.project_sizes.{base_xp,xs,...,ultimate}`. Project sizes are
/// a broader enum than task sizes (spec §3 Project: "broader enum including
/// epic/legendary/mythic/ultimate").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectSizesConfig {
    pub base_xp: i64,
    pub xs: SizeMultiplier,
    pub sm: SizeMultiplier,
    pub md: SizeMultiplier,
    pub lg: SizeMultiplier,
    pub xl: SizeMultiplier,
    pub epic: SizeMultiplier,
    pub legendary: SizeMultiplier,
    pub mythic: SizeMultiplier,
    pub ultimate: SizeMultiplier,
}

impl Default for ProjectSizesConfig {
    fn default() -> Self {
        Self {
            base_xp: 50,
            xs: SizeMultiplier::new(0.5),
            sm: SizeMultiplier::new(0.8),
            md: SizeMultiplier::new(1.0),
            lg: SizeMultiplier::new(1.5),
            xl: SizeMultiplier::new(2.0),
            epic: SizeMultiplier::new(3.0),
            legendary: SizeMultiplier::new(5.0),
            mythic: SizeMultiplier::new(8.0),
            ultimate: SizeMultiplier::new(13.0),
        }
    }
}

/// `xp.modifiers.priority_multipliers.{p1,p2,p3,default}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityMultipliers {
    pub p1: f64,
    pub p2: f64,
    pub p3: f64,
    pub default: f64,
}

impl Default for PriorityMultipliers {
    fn default() -> Self {
        Self {
            p1: 1.5,
            p2: 1.2,
            p3: 1.0,
            default: 0.9,
        }
    }
}

/// `xp.modifiers.importance_multipliers.{i1,i2,i3,default}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportanceMultipliers {
    pub i1: f64,
    pub i2: f64,
    pub i3: f64,
    pub default: f64,
}

impl Default for ImportanceMultipliers {
    fn default() -> Self {
        Self {
            i1: 1.5,
            i2: 1.2,
            i3: 1.0,
            default: 0.9,
        }
    }
}

/// `xp.season.curve.{base,exponent}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeasonCurveConfig {
    pub base: f64,
    pub exponent: f64,
}

impl Default for SeasonCurveConfig {
    fn default() -> Self {
        Self {
            base: 100.0,
            exponent: 1.2,
        }
    }
}

/// `xp.area.level_curve.{base,exponent}` plus the basic/key_result transfer
/// factors (spec §4.2.3, configurable per spec §9's open question).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AreaConfig {
    pub level_curve: AreaLevelCurveConfig,
    pub type_factors: AreaTypeFactors,
}

impl Default for AreaConfig {
    fn default() -> Self {
        Self {
            level_curve: AreaLevelCurveConfig::default(),
            type_factors: AreaTypeFactors::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AreaLevelCurveConfig {
    pub base: f64,
    pub exponent: f64,
}

impl Default for AreaLevelCurveConfig {
    fn default() -> Self {
        Self {
            base: 1000.0,
            exponent: 2.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AreaTypeFactors {
    pub basic: f64,
    pub key_result: f64,
}

impl Default for AreaTypeFactors {
    fn default() -> Self {
        Self {
            basic: 0.2,
            key_result: 1.0,
        }
    }
}

/// `xp.seasons.tiers`: ordered `{required_level, name}` entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeasonsConfig {
    pub tiers: Vec<TierConfig>,
}

impl Default for SeasonsConfig {
    fn default() -> Self {
        Self {
            tiers: vec![
                TierConfig::new(1, "Bronze"),
                TierConfig::new(5, "Silver"),
                TierConfig::new(10, "Gold"),
                TierConfig::new(20, "Platinum"),
                TierConfig::new(35, "Diamond"),
            ],
        }
    }
}

impl SeasonsConfig {
    fn validate(&self) -> ConfigResult<()> {
        let mut last_level: Option<u32> = None;
        for tier in &self.tiers {
            if let Some(prev) = last_level {
                if tier.required_level <= prev {
                    return Err(ConfigError::Validation(format!(
                        "xp.seasons.tiers must be sorted by required_level ascending with no duplicates, found {} after {}",
                        tier.required_level, prev
                    )));
                }
            }
            last_level = Some(tier.required_level);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierConfig {
    pub required_level: u32,
    pub name: String,
}

impl TierConfig {
    fn new(required_level: u32, name: &str) -> Self {
        Self {
            required_level,
            name: name.to_string(),
        }
    }
}

/// `notifications.*`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    pub check_interval_minutes: u64,
    pub calendar: CalendarNotifyConfig,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            check_interval_minutes: 1,
            calendar: CalendarNotifyConfig::default(),
        }
    }
}

impl NotificationsConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.check_interval_minutes == 0 {
            return Err(ConfigError::Validation(
                "notifications.check_interval_minutes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarNotifyConfig {
    pub default_advance_minutes: u64,
}

impl Default for CalendarNotifyConfig {
    fn default() -> Self {
        Self {
            default_advance_minutes: 10,
        }
    }
}
