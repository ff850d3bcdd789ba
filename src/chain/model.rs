use std::collections::BTreeMap;
use std::sync::atomic::AtomicBool;

use log::{debug, info, warn};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::carbon::{
    lifetime_profile, region_type, resolve_region, sample_reduction, GridFactorTable, RegionType,
    DEFAULT_REGION,
};
use crate::economics::{block_reward, issuance_amount};
use crate::error::ChainError;
use crate::panel::PanelRecord;
use crate::telemetry::InverterSample;
use crate::transaction::{Account, Transaction, TxKind};

use super::block::{Block, BlockPayload};
use super::pow::dynamic_difficulty;
use super::{INITIAL_REFERENCE_REDUCTION, REFERENCE_KEEP_WEIGHT, REFERENCE_SMOOTHING_INTERVAL};

/// Single-writer ledger authority: chain, pending pools, balances, panel
/// registry, grid factor table and the difficulty baseline. Producers
/// enqueue through `submit_*`; exactly one miner at a time runs the
/// prepare / seal / commit cycle.
#[derive(Debug)]
pub struct Ledger {
    chain: Vec<Block>,
    pending_samples: Vec<InverterSample>,
    pending_transactions: Vec<Transaction>,
    balances: BTreeMap<String, Decimal>,
    panels: BTreeMap<String, PanelRecord>,
    grid_factors: GridFactorTable,
    reference_reduction: f64,
}

/// Read-only summary for the CLI and REST surfaces.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainInfo {
    pub height: u64,
    pub transaction_count: usize,
    pub sample_count: usize,
    pub cumulative_reduction: f64,
    pub reference_reduction: f64,
    pub pending_transactions: usize,
    pub pending_samples: usize,
}

/// Mining workspace checked out from the ledger. Holds a fully-parameterized
/// unsealed block; the nonce search runs on this copy so the ledger lock is
/// never held while hashing.
#[derive(Debug, Clone)]
pub struct MiningJob {
    block: Block,
}

impl MiningJob {
    pub fn difficulty(&self) -> u32 {
        self.block.difficulty
    }

    pub fn index(&self) -> u64 {
        self.block.index
    }

    pub fn total_reduction(&self) -> f64 {
        self.block.total_carbon_reduction
    }

    /// Run the nonce search. Cancellable; a cancelled run leaves the
    /// ledger untouched and the job can simply be dropped.
    pub fn run(mut self, cancel: &AtomicBool) -> Result<Block, ChainError> {
        self.block.seal(cancel)?;
        Ok(self.block)
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger {
    /// Fresh ledger holding only the genesis block.
    pub fn new() -> Self {
        Self {
            chain: vec![Block::genesis()],
            pending_samples: Vec::new(),
            pending_transactions: Vec::new(),
            balances: BTreeMap::new(),
            panels: BTreeMap::new(),
            grid_factors: GridFactorTable::default(),
            reference_reduction: INITIAL_REFERENCE_REDUCTION,
        }
    }

    /// Rebuild a ledger from snapshot documents. The chain is trusted for
    /// PoW (no re-mining) but must pass full validation; the reference
    /// baseline is replayed deterministically from block reductions.
    pub fn from_parts(
        chain: Vec<Block>,
        panels: BTreeMap<String, PanelRecord>,
        balances: BTreeMap<String, Decimal>,
    ) -> Result<Self, ChainError> {
        let mut ledger = Self {
            chain,
            pending_samples: Vec::new(),
            pending_transactions: Vec::new(),
            balances,
            panels,
            grid_factors: GridFactorTable::default(),
            reference_reduction: INITIAL_REFERENCE_REDUCTION,
        };
        ledger.validate()?;
        for i in 0..ledger.chain.len() {
            if smoothing_due(ledger.chain[i].index) {
                let mean = window_mean(&ledger.chain[..=i]);
                ledger.reference_reduction =
                    smoothed_reference(ledger.reference_reduction, mean);
            }
        }
        Ok(ledger)
    }

    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    pub fn tip(&self) -> &Block {
        self.chain
            .last()
            .expect("ledger always holds at least the genesis block")
    }

    pub fn height(&self) -> u64 {
        self.tip().index
    }

    pub fn balances(&self) -> &BTreeMap<String, Decimal> {
        &self.balances
    }

    pub fn balance_of(&self, owner: &str) -> Decimal {
        self.balances.get(owner).copied().unwrap_or_default()
    }

    pub fn panels(&self) -> &BTreeMap<String, PanelRecord> {
        &self.panels
    }

    pub fn panel(&self, panel_id: &str) -> Option<&PanelRecord> {
        self.panels.get(panel_id)
    }

    pub fn pending_transactions(&self) -> &[Transaction] {
        &self.pending_transactions
    }

    pub fn pending_samples(&self) -> &[InverterSample] {
        &self.pending_samples
    }

    pub fn reference_reduction(&self) -> f64 {
        self.reference_reduction
    }

    pub fn info(&self) -> ChainInfo {
        let (mut transaction_count, mut sample_count) = (0usize, 0usize);
        for block in &self.chain {
            match &block.payload {
                BlockPayload::Transactions(txs) => transaction_count += txs.len(),
                BlockPayload::Samples(samples) => sample_count += samples.len(),
            }
        }
        ChainInfo {
            height: self.height(),
            transaction_count,
            sample_count,
            cumulative_reduction: self
                .chain
                .iter()
                .map(|b| b.total_carbon_reduction)
                .sum(),
            reference_reduction: self.reference_reduction,
            pending_transactions: self.pending_transactions.len(),
            pending_samples: self.pending_samples.len(),
        }
    }

    /// Register a panel and mint its initial issuance. Atomic: the registry
    /// entry, the pending issuance transaction and the owner's balance
    /// credit land together. The credit happens here and only here; the
    /// recorded transaction is a balance no-op when its block is applied.
    pub fn register_panel(&mut self, panel: PanelRecord) -> Result<Decimal, ChainError> {
        panel.validate()?;
        if self.panels.contains_key(&panel.panel_id) {
            return Err(ChainError::PanelAlreadyRegistered(panel.panel_id));
        }

        let profile = lifetime_profile(&panel);
        let issued = issuance_amount(&profile, &panel);
        let tx = Transaction::issuance(panel.owner.clone(), issued, panel.panel_id.clone());

        debug!(
            "register panel {}: lifetime reduction {:.1} kgCO2, issuance {}",
            panel.panel_id, profile.lifetime_reduction_kg, issued
        );

        *self.balances.entry(panel.owner.clone()).or_default() += issued;
        self.pending_transactions.push(tx);
        self.panels.insert(panel.panel_id.clone(), panel);
        Ok(issued)
    }

    /// Accept a transaction into the pending pool. Availability is checked
    /// against the current balance minus debits already queued by the same
    /// sender, so a sealed block can never overdraw an account.
    pub fn submit_transaction(&mut self, tx: Transaction) -> Result<(), ChainError> {
        if tx.receiver.trim().is_empty() {
            return Err(ChainError::InvalidTransaction(
                "receiver must not be empty".into(),
            ));
        }
        if tx.amount <= Decimal::ZERO {
            return Err(ChainError::InvalidTransaction(format!(
                "amount must be positive, got {}",
                tx.amount
            )));
        }
        if !tx.signature_ok() {
            return Err(ChainError::InvalidTransaction(
                "transaction signature must be 128 hex characters".into(),
            ));
        }
        if let Account::User(sender) = &tx.sender {
            let available = self.balance_of(sender) - self.pending_debits(sender);
            if available < tx.amount {
                return Err(ChainError::InsufficientBalance {
                    owner: sender.clone(),
                    balance: available,
                    amount: tx.amount,
                });
            }
        }
        debug!("accept tx {} into pending pool", tx.txid);
        self.pending_transactions.push(tx);
        Ok(())
    }

    /// Build, validate and enqueue a transfer; returns its txid.
    pub fn create_transfer(
        &mut self,
        sender: &str,
        receiver: &str,
        amount: Decimal,
        panel_id: Option<String>,
        signature: String,
    ) -> Result<String, ChainError> {
        if let Some(id) = &panel_id {
            if !self.panels.contains_key(id) {
                return Err(ChainError::PanelUnknown(id.clone()));
            }
        }
        let tx = Transaction::transfer(sender, receiver, amount, panel_id, signature);
        let txid = tx.txid.clone();
        self.submit_transaction(tx)?;
        Ok(txid)
    }

    /// Accept a telemetry sample into the pending pool. Unknown panels are
    /// accepted (they ride in the payload without earning credit).
    pub fn submit_sample(&mut self, sample: InverterSample) -> Result<(), ChainError> {
        sample.validate()?;
        debug!(
            "accept sample from {} for panel {} ({} kWh)",
            sample.inverter_id, sample.panel_id, sample.energy_generated_kwh
        );
        self.pending_samples.push(sample);
        Ok(())
    }

    fn pending_debits(&self, sender: &str) -> Decimal {
        self.pending_transactions
            .iter()
            .filter(|tx| {
                tx.kind == TxKind::Transfer && matches!(&tx.sender, Account::User(s) if s == sender)
            })
            .map(|tx| tx.amount)
            .sum()
    }

    /// Effective reduction credited by a set of samples. Samples whose panel
    /// is unregistered or whose region has no grid factor are skipped; the
    /// sum is order-independent.
    pub fn total_reduction(&self, samples: &[InverterSample]) -> f64 {
        samples
            .iter()
            .filter_map(|sample| {
                let panel = self.panels.get(&sample.panel_id)?;
                let region = resolve_region(&sample.location_tag);
                let factor = self.grid_factors.factor(region)?;
                Some(sample_reduction(sample, panel, factor, region_type(region)).effective_kg)
            })
            .sum()
    }

    /// Region code appearing in the most samples, ties broken by first-seen
    /// ordering. Falls back to the default region for empty input.
    fn primary_region(samples: &[InverterSample]) -> RegionType {
        let mut counts: Vec<(&'static str, usize)> = Vec::new();
        for sample in samples {
            let code = resolve_region(&sample.location_tag);
            match counts.iter_mut().find(|(c, _)| *c == code) {
                Some((_, n)) => *n += 1,
                None => counts.push((code, 1)),
            }
        }
        // strictly-greater keeps the earliest code on ties; max_by_key
        // would keep the latest
        let mut best: Option<(&'static str, usize)> = None;
        for &(code, n) in &counts {
            if best.map_or(true, |(_, m)| n > m) {
                best = Some((code, n));
            }
        }
        let code = best.map(|(c, _)| c).unwrap_or(DEFAULT_REGION);
        region_type(code)
    }

    /// Check out a mining workspace: payload snapshot, credited reduction,
    /// difficulty and linkage, all fixed before the search starts.
    /// Telemetry seals first; queued transactions wait for the next round.
    pub fn prepare_mining_job(&self, miner: &str) -> Result<MiningJob, ChainError> {
        if miner.trim().is_empty() {
            return Err(ChainError::InvalidTransaction(
                "miner address must not be empty".into(),
            ));
        }

        let (payload, total_reduction, region) = if !self.pending_samples.is_empty() {
            let samples = self.pending_samples.clone();
            let reduction = self.total_reduction(&samples);
            let region = Self::primary_region(&samples);
            (BlockPayload::Samples(samples), reduction, region)
        } else if !self.pending_transactions.is_empty() {
            (
                BlockPayload::Transactions(self.pending_transactions.clone()),
                0.0,
                region_type(DEFAULT_REGION),
            )
        } else {
            return Err(ChainError::EmptyPending);
        };

        let difficulty = dynamic_difficulty(total_reduction, self.reference_reduction, region);
        let tip = self.tip();
        let block = Block::new(
            tip.index + 1,
            tip.hash.clone(),
            miner.to_string(),
            total_reduction,
            difficulty,
            payload,
        );
        debug!(
            "mining job for block {}: {} items, reduction {:.1}, difficulty {}",
            block.index,
            block.payload.len(),
            total_reduction,
            difficulty
        );
        Ok(MiningJob { block })
    }

    /// Commit a sealed block. Constant-time: verifies the tip has not moved
    /// (`StaleTip` otherwise), re-checks the PoW, applies balance effects in
    /// payload order, clears exactly the sealed pool entries, credits the
    /// mining reward and re-smooths the reference baseline on schedule.
    pub fn commit_block(&mut self, block: Block) -> Result<&Block, ChainError> {
        let tip = self.tip();
        if block.previous_hash != tip.hash || block.index != tip.index + 1 {
            warn!(
                "discarding block {}: tip moved to {} while mining",
                block.index,
                tip.index
            );
            return Err(ChainError::StaleTip);
        }
        if !block.is_valid() {
            return Err(ChainError::ChainInvalid {
                index: block.index,
                reason: "hash mismatch or insufficient work".into(),
            });
        }
        if !block.payload.signatures_ok() {
            return Err(ChainError::ChainInvalid {
                index: block.index,
                reason: "payload signature predicate failed".into(),
            });
        }

        match &block.payload {
            BlockPayload::Transactions(txs) => {
                for tx in txs {
                    self.apply_transaction(tx);
                }
                let sealed: Vec<&str> = txs.iter().map(|tx| tx.txid.as_str()).collect();
                self.pending_transactions
                    .retain(|tx| !sealed.contains(&tx.txid.as_str()));
            }
            BlockPayload::Samples(samples) => {
                // sealed samples are the queue prefix: accepts during the
                // search append behind them, and there is one mine authority
                let sealed = samples.len().min(self.pending_samples.len());
                self.pending_samples.drain(..sealed);
            }
        }

        let reward = block_reward(block.index);
        if reward > Decimal::ZERO {
            *self.balances.entry(block.miner.clone()).or_default() += reward;
        }

        info!(
            "block {} accepted: {} items, reduction {:.1} kgCO2, difficulty {}, reward {} to {}",
            block.index,
            block.payload.len(),
            block.total_carbon_reduction,
            block.difficulty,
            reward,
            block.miner
        );

        let due = smoothing_due(block.index);
        self.chain.push(block);
        if due {
            let mean = window_mean(&self.chain);
            let old = self.reference_reduction;
            self.reference_reduction = smoothed_reference(old, mean);
            debug!(
                "reference reduction {:.1} -> {:.1} (recent mean {:.1})",
                old, self.reference_reduction, mean
            );
        }
        Ok(self.tip())
    }

    /// One-shot mining: checkout, search, commit. With exclusive access the
    /// tip cannot move, so this never returns `StaleTip`.
    pub fn mine(&mut self, miner: &str) -> Result<&Block, ChainError> {
        let job = self.prepare_mining_job(miner)?;
        let block = job.run(&AtomicBool::new(false))?;
        self.commit_block(block)
    }

    /// Balance effect of a sealed transaction. Issuance was credited at
    /// registration, so replaying it must not credit again.
    fn apply_transaction(&mut self, tx: &Transaction) {
        match tx.kind {
            TxKind::Transfer => {
                if let Account::User(sender) = &tx.sender {
                    let entry = self.balances.entry(sender.clone()).or_default();
                    *entry -= tx.amount;
                    debug_assert!(*entry >= Decimal::ZERO, "acceptance must prevent overdraw");
                }
                *self.balances.entry(tx.receiver.clone()).or_default() += tx.amount;
            }
            TxKind::Issuance => {}
        }
    }

    /// Full-replay validation: genesis shape, hash linkage, hash
    /// recomputation, the leading-zero rule and the per-item signature
    /// predicate. Stops at the first bad block.
    pub fn validate(&self) -> Result<(), ChainError> {
        let genesis = self.chain.first().ok_or(ChainError::ChainInvalid {
            index: 0,
            reason: "chain is empty".into(),
        })?;
        if genesis.index != 0 || genesis.previous_hash != "0" {
            return Err(ChainError::ChainInvalid {
                index: 0,
                reason: "malformed genesis block".into(),
            });
        }
        if genesis.hash != genesis.compute_hash() {
            return Err(ChainError::ChainInvalid {
                index: 0,
                reason: "genesis hash mismatch".into(),
            });
        }

        for i in 1..self.chain.len() {
            let current = &self.chain[i];
            let prev = &self.chain[i - 1];
            let fail = |reason: &str| ChainError::ChainInvalid {
                index: current.index,
                reason: reason.into(),
            };

            if current.index != prev.index + 1 {
                return Err(fail("index gap"));
            }
            if current.previous_hash != prev.hash {
                return Err(fail("broken hash linkage"));
            }
            if current.hash != current.compute_hash() {
                return Err(fail("hash mismatch"));
            }
            if !current.meets_difficulty() {
                return Err(fail("insufficient proof of work"));
            }
            if !current.payload.signatures_ok() {
                return Err(fail("payload signature predicate failed"));
            }
        }
        Ok(())
    }
}

fn smoothing_due(index: u64) -> bool {
    index > 0 && index % REFERENCE_SMOOTHING_INTERVAL == 0
}

/// Mean reduction over the last up-to-10 blocks of the chain.
fn window_mean(chain: &[Block]) -> f64 {
    let window = REFERENCE_SMOOTHING_INTERVAL as usize;
    let start = chain.len().saturating_sub(window);
    let recent = &chain[start..];
    if recent.is_empty() {
        return 0.0;
    }
    recent.iter().map(|b| b.total_carbon_reduction).sum::<f64>() / recent.len() as f64
}

/// Low-pass baseline update: sustained high reduction drags difficulty
/// down slowly rather than in a single step.
pub fn smoothed_reference(old: f64, recent_mean: f64) -> f64 {
    REFERENCE_KEEP_WEIGHT * old + (1.0 - REFERENCE_KEEP_WEIGHT) * recent_mean
}
