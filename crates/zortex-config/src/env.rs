use crate::error::{ConfigError, ConfigResult};
use crate::schema::ZortexConfig;

/// Apply `ZORTEX_`-prefixed environment variable overrides on top of a
/// loaded configuration. Mirrors `knhk-config`'s `apply_env_overrides`:
/// a curated set of well-known keys, not a generic reflection-based
/// override mechanism.
pub fn apply_env_overrides(config: &mut ZortexConfig) -> ConfigResult<()> {
    if let Ok(value) = std::env::var("ZORTEX_XP_TASK_BASE") {
        config.xp.modifiers.task_sizes.base = parse_i64("ZORTEX_XP_TASK_BASE", &value)?;
    }

    if let Ok(value) = std::env::var("ZORTEX_XP_PROJECT_BASE") {
        config.xp.modifiers.project_sizes.base_xp = parse_i64("ZORTEX_XP_PROJECT_BASE", &value)?;
    }

    if let Ok(value) = std::env::var("ZORTEX_XP_SEASON_CURVE_BASE") {
        config.xp.season.base = parse_f64("ZORTEX_XP_SEASON_CURVE_BASE", &value)?;
    }

    if let Ok(value) = std::env::var("ZORTEX_XP_SEASON_CURVE_EXPONENT") {
        config.xp.season.exponent = parse_f64("ZORTEX_XP_SEASON_CURVE_EXPONENT", &value)?;
    }

    if let Ok(value) = std::env::var("ZORTEX_XP_AREA_CURVE_BASE") {
        config.xp.area.level_curve.base = parse_f64("ZORTEX_XP_AREA_CURVE_BASE", &value)?;
    }

    if let Ok(value) = std::env::var("ZORTEX_XP_AREA_CURVE_EXPONENT") {
        config.xp.area.level_curve.exponent = parse_f64("ZORTEX_XP_AREA_CURVE_EXPONENT", &value)?;
    }

    if let Ok(value) = std::env::var("ZORTEX_NOTIFICATIONS_CHECK_INTERVAL_MINUTES") {
        config.notifications.check_interval_minutes =
            parse_u64("ZORTEX_NOTIFICATIONS_CHECK_INTERVAL_MINUTES", &value)?;
    }

    if let Ok(value) = std::env::var("ZORTEX_NOTIFICATIONS_CALENDAR_DEFAULT_ADVANCE_MINUTES") {
        config.notifications.calendar.default_advance_minutes = parse_u64(
            "ZORTEX_NOTIFICATIONS_CALENDAR_DEFAULT_ADVANCE_MINUTES",
            &value,
        )?;
    }

    Ok(())
}

fn parse_i64(key: &str, value: &str) -> ConfigResult<i64> {
    value
        .parse()
        .map_err(|_| ConfigError::Validation(format!("invalid integer for {key}: {value}")))
}

fn parse_u64(key: &str, value: &str) -> ConfigResult<u64> {
    value
        .parse()
        .map_err(|_| ConfigError::Validation(format!("invalid integer for {key}: {value}")))
}

fn parse_f64(key: &str, value: &str) -> ConfigResult<f64> {
    value
        .parse()
        .map_err(|_| ConfigError::Validation(format!("invalid number for {key}: {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn overrides_check_interval() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("ZORTEX_NOTIFICATIONS_CHECK_INTERVAL_MINUTES", "7");
        let mut config = ZortexConfig::default();
        apply_env_overrides(&mut config).unwrap();
        assert_eq!(config.notifications.check_interval_minutes, 7);
        std::env::remove_var("ZORTEX_NOTIFICATIONS_CHECK_INTERVAL_MINUTES");
    }

    #[test]
    fn rejects_malformed_override() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("ZORTEX_XP_TASK_BASE", "not-a-number");
        let mut config = ZortexConfig::default();
        let err = apply_env_overrides(&mut config).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        std::env::remove_var("ZORTEX_XP_TASK_BASE");
    }
}
