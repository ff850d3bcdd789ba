use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, info};
use rust_decimal::Decimal;

use crate::chain::{Block, Ledger};
use crate::error::ChainError;
use crate::panel::PanelRecord;

const CHAIN_FILE: &str = "chain.json";
const PANELS_FILE: &str = "panels.json";
const BALANCES_FILE: &str = "balances.json";

/// Snapshot adapter: chain, panel registry and balances as three JSON
/// documents. Each document is written to a temp file and renamed into
/// place so a crashed save never leaves a torn file behind.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    pub fn exists(&self) -> bool {
        self.path(CHAIN_FILE).exists()
    }

    /// Persist the ledger. Pending pools are volatile and not saved.
    pub fn save(&self, ledger: &Ledger) -> Result<(), ChainError> {
        fs::create_dir_all(&self.dir)?;
        self.write_doc(CHAIN_FILE, ledger.chain())?;
        self.write_doc(PANELS_FILE, ledger.panels())?;
        self.write_doc(BALANCES_FILE, ledger.balances())?;
        info!(
            "snapshot saved to {} ({} blocks, {} panels, {} accounts)",
            self.dir.display(),
            ledger.chain().len(),
            ledger.panels().len(),
            ledger.balances().len()
        );
        Ok(())
    }

    /// Rebuild a ledger from the snapshot. Returns `Ok(None)` when no
    /// snapshot exists. The rebuilt chain must pass full validation,
    /// otherwise the load is rejected and nothing is returned.
    pub fn load(&self) -> Result<Option<Ledger>, ChainError> {
        if !self.exists() {
            return Ok(None);
        }
        let chain: Vec<Block> = self.read_doc(CHAIN_FILE)?;
        let panels: BTreeMap<String, PanelRecord> = self.read_doc(PANELS_FILE)?;
        let balances: BTreeMap<String, Decimal> = self.read_doc(BALANCES_FILE)?;

        let ledger = Ledger::from_parts(chain, panels, balances)?;
        info!(
            "snapshot loaded from {} (height {})",
            self.dir.display(),
            ledger.height()
        );
        Ok(Some(ledger))
    }

    fn write_doc<T: serde::Serialize + ?Sized>(&self, file: &str, value: &T) -> Result<(), ChainError> {
        let json = serde_json::to_string_pretty(value)
            .map_err(|e| ChainError::SnapshotCorrupt(format!("{file}: {e}")))?;
        let path = self.path(file);
        let tmp = path.with_extension("json.tmp");
        {
            let mut f = fs::File::create(&tmp)?;
            f.write_all(json.as_bytes())?;
            f.sync_all()?;
        }
        fs::rename(&tmp, &path)?;
        debug!("wrote {}", path.display());
        Ok(())
    }

    fn read_doc<T: serde::de::DeserializeOwned>(&self, file: &str) -> Result<T, ChainError> {
        let raw = fs::read_to_string(self.path(file))?;
        serde_json::from_str(&raw).map_err(|e| ChainError::SnapshotCorrupt(format!("{file}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::PanelRecord;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn panel(id: &str, owner: &str) -> PanelRecord {
        PanelRecord {
            panel_id: id.into(),
            production_date: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            nominal_efficiency_pct: 22.5,
            size_m2: 1.8,
            manufacturer: "Helios".into(),
            manufacturing_footprint_kgco2: 1200.0,
            lifetime_years: 25,
            carbon_reduction_factor: 0.4,
            owner: owner.into(),
        }
    }

    #[test]
    fn missing_snapshot_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());

        let mut ledger = Ledger::new();
        ledger.register_panel(panel("PV-001", "alice")).unwrap();
        ledger
            .create_transfer("alice", "bob", dec!(50), None, "a".repeat(128))
            .unwrap();
        ledger.mine("miner-1").unwrap();
        store.save(&ledger).unwrap();

        let loaded = store.load().unwrap().expect("snapshot present");
        assert_eq!(loaded.chain(), ledger.chain());
        assert_eq!(loaded.panels(), ledger.panels());
        assert_eq!(loaded.balances(), ledger.balances());
        assert_eq!(loaded.reference_reduction(), ledger.reference_reduction());
        loaded.validate().unwrap();
    }

    #[test]
    fn tampered_chain_is_rejected_at_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());

        let mut ledger = Ledger::new();
        ledger.register_panel(panel("PV-001", "alice")).unwrap();
        ledger.mine("miner-1").unwrap();
        store.save(&ledger).unwrap();

        // totalCarbonReduction is part of the hash preimage
        let path = dir.path().join("chain.json");
        let doctored = fs::read_to_string(&path)
            .unwrap()
            .replace("\"totalCarbonReduction\": 0.0", "\"totalCarbonReduction\": 7.0");
        fs::write(&path, doctored).unwrap();

        assert!(matches!(
            store.load(),
            Err(ChainError::ChainInvalid { .. })
        ));
    }

    #[test]
    fn garbage_is_snapshot_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());

        let mut ledger = Ledger::new();
        ledger.register_panel(panel("PV-001", "alice")).unwrap();
        store.save(&ledger).unwrap();
        fs::write(dir.path().join("balances.json"), "not json").unwrap();

        assert!(matches!(
            store.load(),
            Err(ChainError::SnapshotCorrupt(_))
        ));
    }
}
