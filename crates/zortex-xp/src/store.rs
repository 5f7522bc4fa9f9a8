//! `XPStore`: owns the ledger and the derived aggregates (spec §4.3).

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use zortex_config::{AreaLevelCurveConfig, SeasonCurveConfig};
use zortex_store::{DirtyStore, PersistentStore, StoreResult};

use crate::calculator;
use crate::error::{XpError, XpResult};
use crate::model::{ActiveSeason, SeasonRecord, Transaction};

/// The persisted shape from spec §4.3, encoded 1:1 to JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct XpState {
    pub season_xp: i64,
    pub season_level: u32,
    pub current_season: Option<ActiveSeason>,
    pub area_xp: BTreeMap<String, i64>,
    pub xp_transactions: BTreeMap<String, Transaction>,
    pub season_history: Vec<SeasonRecord>,
}

/// Outcome of [`XpStore::record_transaction`]: the net change to the
/// recipient's aggregate total, and whether the season leveled up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordOutcome {
    pub delta: i64,
    pub leveled_up: Option<(u32, u32)>,
}

/// Semantic layer over [`PersistentStore`] holding season state, area
/// totals, and the transaction ledger (spec §4.3). `XPStore` is the sole
/// owner of these aggregates; callers never touch the underlying file.
pub struct XpStore {
    persistent: Arc<PersistentStore<XpState>>,
}

impl XpStore {
    pub fn open(path: impl Into<std::path::PathBuf>) -> XpResult<Self> {
        let persistent = Arc::new(PersistentStore::open(path)?);
        Ok(Self { persistent })
    }

    /// Handle suitable for registration with a
    /// [`zortex_store::PersistenceManager`], so the ledger participates in
    /// batched flushes alongside every other store.
    pub fn persistence_handle(&self) -> Arc<dyn DirtyStore> {
        self.persistent.clone()
    }

    pub fn save(&self) -> StoreResult<()> {
        self.persistent.save()
    }

    pub fn snapshot(&self) -> XpState {
        self.persistent.snapshot()
    }

    pub fn has_active_season(&self) -> bool {
        self.persistent.with(|s| s.current_season.is_some())
    }

    pub fn season_xp(&self) -> i64 {
        self.persistent.with(|s| s.season_xp)
    }

    pub fn season_level(&self) -> u32 {
        self.persistent.with(|s| s.season_level)
    }

    pub fn area_xp(&self, area: &str) -> i64 {
        self.persistent.with(|s| *s.area_xp.get(area).unwrap_or(&0))
    }

    pub fn area_level(&self, area: &str, cfg: &AreaLevelCurveConfig) -> u32 {
        let xp = self.area_xp(area);
        calculator::derive_level(xp, cfg.base, cfg.exponent)
    }

    pub fn season_level_progress(&self, cfg: &SeasonCurveConfig) -> f64 {
        self.persistent
            .with(|s| calculator::level_progress(s.season_xp, s.season_level, cfg.base, cfg.exponent))
    }

    /// Record (or replace) a transaction. Reverses the prior entry's
    /// contributions first, then applies the new one, then recomputes the
    /// season level if a season is active (spec §4.3 algorithm).
    pub fn record_transaction(&self, txn: Transaction, season_curve: &SeasonCurveConfig) -> RecordOutcome {
        self.persistent.with_mut(|state| {
            let mut xp_change = 0i64;

            if let Some(old) = state.xp_transactions.remove(&txn.id) {
                state.season_xp = (state.season_xp - old.season_xp).max(0);
                for (area, amount) in &old.area_xp {
                    let entry = state.area_xp.entry(area.clone()).or_insert(0);
                    *entry = (*entry - amount).max(0);
                }
                xp_change -= old.base_xp;
            }

            if txn.base_xp == 0 {
                return RecordOutcome { delta: xp_change, leveled_up: None };
            }

            state.season_xp += txn.season_xp;
            for (area, amount) in &txn.area_xp {
                *state.area_xp.entry(area.clone()).or_insert(0) += amount;
            }
            xp_change += txn.base_xp;
            state.xp_transactions.insert(txn.id.clone(), txn);

            let leveled_up = if state.current_season.is_some() {
                let new_level = calculator::derive_level(state.season_xp, season_curve.base, season_curve.exponent);
                let old_level = state.season_level;
                state.season_level = new_level;
                if new_level > old_level {
                    Some((old_level, new_level))
                } else {
                    None
                }
            } else {
                None
            };

            RecordOutcome { delta: xp_change, leveled_up }
        })
    }

    /// Starts a season: requires no active season, resets `season_xp`,
    /// `season_level`, and the transaction ledger (spec §4.3). Area XP is
    /// untouched.
    pub fn start_season(&self, name: impl Into<String>, end_date: NaiveDate) -> XpResult<()> {
        if self.has_active_season() {
            return Err(XpError::SeasonAlreadyActive);
        }
        let name = name.into();
        self.persistent.with_mut(|state| {
            state.season_xp = 0;
            state.season_level = 1;
            state.xp_transactions.clear();
            state.current_season = Some(ActiveSeason { name, start_date: Utc::now().date_naive(), end_date });
        });
        Ok(())
    }

    /// Ends the active season: snapshots it into `season_history`, clears
    /// `season_xp`, `season_level`, `current_season`, and the transaction
    /// ledger. Area XP is untouched (spec §4.3).
    pub fn end_season(&self) -> XpResult<String> {
        if !self.has_active_season() {
            return Err(XpError::NoActiveSeason);
        }
        let ended = self.persistent.with_mut(|state| {
            let season = state.current_season.take().expect("checked active above");
            let name = season.name.clone();
            state.season_history.push(SeasonRecord {
                name: season.name,
                start_date: season.start_date,
                end_date: season.end_date,
                final_level: state.season_level,
                final_xp: state.season_xp,
                xp_transactions: state.xp_transactions.clone(),
            });
            state.season_xp = 0;
            state.season_level = 0;
            state.xp_transactions.clear();
            name
        });
        Ok(ended)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TransactionKind;
    use chrono::NaiveDate;

    fn txn(id: &str, base_xp: i64, season_xp: i64, area_xp: &[(&str, i64)]) -> Transaction {
        Transaction {
            kind: TransactionKind::Task,
            id: id.to_string(),
            timestamp: Utc::now(),
            base_xp,
            season_xp,
            area_xp: area_xp.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        }
    }

    fn curve() -> SeasonCurveConfig {
        SeasonCurveConfig { base: 100.0, exponent: 1.2 }
    }

    #[test]
    fn recording_applies_season_and_area_contributions() {
        let dir = tempfile::tempdir().unwrap();
        let store = XpStore::open(dir.path().join("xp.json")).unwrap();
        let outcome = store.record_transaction(txn("t1", 10, 10, &[("health", 1)]), &curve());
        assert_eq!(outcome.delta, 10);
        assert_eq!(store.season_xp(), 10);
        assert_eq!(store.area_xp("health"), 1);
    }

    #[test]
    fn re_recording_same_id_reverses_before_applying() {
        let dir = tempfile::tempdir().unwrap();
        let store = XpStore::open(dir.path().join("xp.json")).unwrap();
        store.record_transaction(txn("t1", 10, 10, &[("health", 1)]), &curve());
        let outcome = store.record_transaction(txn("t1", 30, 30, &[("health", 3)]), &curve());
        assert_eq!(outcome.delta, 20);
        assert_eq!(store.season_xp(), 30);
        assert_eq!(store.area_xp("health"), 3);
    }

    #[test]
    fn zero_base_xp_reverts_without_recording() {
        let dir = tempfile::tempdir().unwrap();
        let store = XpStore::open(dir.path().join("xp.json")).unwrap();
        store.record_transaction(txn("t1", 10, 10, &[]), &curve());
        let outcome = store.record_transaction(txn("t1", 0, 0, &[]), &curve());
        assert_eq!(outcome.delta, -10);
        assert_eq!(store.season_xp(), 0);
        assert!(store.snapshot().xp_transactions.get("t1").is_none());
    }

    #[test]
    fn aggregates_never_go_negative() {
        let dir = tempfile::tempdir().unwrap();
        let store = XpStore::open(dir.path().join("xp.json")).unwrap();
        store.record_transaction(txn("t1", 10, 10, &[("health", 5)]), &curve());
        // Force a revert below zero by replacing with a smaller transaction
        // after an external season reset (simulated by ending the season).
        store.start_season("s1", NaiveDate::from_ymd_opt(2026, 12, 31).unwrap()).unwrap();
        store.end_season().unwrap();
        let outcome = store.record_transaction(txn("t1", 0, 0, &[]), &curve());
        assert_eq!(store.season_xp(), 0);
        assert!(outcome.delta <= 0);
    }

    #[test]
    fn season_lifecycle_preserves_area_xp() {
        let dir = tempfile::tempdir().unwrap();
        let store = XpStore::open(dir.path().join("xp.json")).unwrap();
        store.record_transaction(txn("t1", 10, 10, &[("health", 5)]), &curve());
        store.start_season("Q1", NaiveDate::from_ymd_opt(2026, 3, 31).unwrap()).unwrap();
        store.record_transaction(txn("t2", 500, 500, &[]), &curve());
        let ended = store.end_season().unwrap();
        assert_eq!(ended, "Q1");
        assert_eq!(store.season_xp(), 0);
        assert_eq!(store.season_level(), 0);
        assert_eq!(store.area_xp("health"), 5);
        let snap = store.snapshot();
        assert_eq!(snap.season_history.len(), 1);
        assert_eq!(snap.season_history[0].final_xp, 500);
    }

    #[test]
    fn starting_a_season_twice_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = XpStore::open(dir.path().join("xp.json")).unwrap();
        store.start_season("Q1", NaiveDate::from_ymd_opt(2026, 3, 31).unwrap()).unwrap();
        let err = store.start_season("Q2", NaiveDate::from_ymd_opt(2026, 6, 30).unwrap());
        assert!(matches!(err, Err(XpError::SeasonAlreadyActive)));
    }

    #[test]
    fn leveling_up_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = XpStore::open(dir.path().join("xp.json")).unwrap();
        store.start_season("Q1", NaiveDate::from_ymd_opt(2026, 3, 31).unwrap()).unwrap();
        let outcome = store.record_transaction(txn("big", 300, 300, &[]), &curve());
        assert!(outcome.leveled_up.is_some());
    }
}
