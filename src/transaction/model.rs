use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::wallet::{signature_well_formed, TX_SIG_HEX_LEN};

/// Sender/receiver of value. `"system"` is a domain sentinel, not a real
/// account: it funds issuance and mining rewards and is never debited.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Account {
    System,
    User(String),
}

pub const SYSTEM_SENTINEL: &str = "system";

impl Account {
    pub fn is_system(&self) -> bool {
        matches!(self, Account::System)
    }

    pub fn user(id: impl Into<String>) -> Self {
        Account::User(id.into())
    }
}

impl From<String> for Account {
    fn from(s: String) -> Self {
        if s == SYSTEM_SENTINEL {
            Account::System
        } else {
            Account::User(s)
        }
    }
}

impl From<Account> for String {
    fn from(a: Account) -> Self {
        a.to_string()
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Account::System => f.write_str(SYSTEM_SENTINEL),
            Account::User(id) => f.write_str(id),
        }
    }
}

/// How a transaction affects balances when its block is applied.
/// Issuance is credited once, at registration time; replaying it is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TxKind {
    Transfer,
    Issuance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// SHA-256 of a fresh UUID, fixed at creation.
    pub txid: String,
    pub sender: Account,
    pub receiver: String,
    pub amount: Decimal,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub panel_id: Option<String>,
    pub signature: String,
    pub kind: TxKind,
}

impl Transaction {
    pub fn new_txid() -> String {
        let mut hasher = Sha256::new();
        hasher.update(Uuid::new_v4().to_string().as_bytes());
        hex::encode_upper(hasher.finalize())
    }

    /// A peer-to-peer transfer, signed by the sender.
    pub fn transfer(
        sender: impl Into<String>,
        receiver: impl Into<String>,
        amount: Decimal,
        panel_id: Option<String>,
        signature: String,
    ) -> Self {
        Self {
            txid: Self::new_txid(),
            sender: Account::user(sender),
            receiver: receiver.into(),
            amount,
            timestamp: Utc::now(),
            panel_id,
            signature,
            kind: TxKind::Transfer,
        }
    }

    /// Token issuance credited to a panel owner at registration.
    pub fn issuance(owner: impl Into<String>, amount: Decimal, panel_id: String) -> Self {
        Self {
            txid: Self::new_txid(),
            sender: Account::System,
            receiver: owner.into(),
            amount,
            timestamp: Utc::now(),
            panel_id: Some(panel_id),
            signature: String::new(),
            kind: TxKind::Issuance,
        }
    }

    /// Opaque signature predicate: user transactions carry 128 hex
    /// characters; system-sent transactions are internal and unsigned.
    pub fn signature_ok(&self) -> bool {
        self.sender.is_system() || signature_well_formed(&self.signature, TX_SIG_HEX_LEN)
    }

    /// Message hash the wallet signs for this transaction.
    pub fn sighash(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.txid.as_bytes());
        hasher.update(self.sender.to_string().as_bytes());
        hasher.update(self.receiver.as_bytes());
        hasher.update(self.amount.to_string().as_bytes());
        hasher.finalize().into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn txid_is_uppercase_sha256_hex() {
        let txid = Transaction::new_txid();
        assert_eq!(txid.len(), 64);
        assert!(txid
            .chars()
            .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }

    #[test]
    fn system_sentinel_roundtrips_through_serde() {
        let tx = Transaction::issuance("alice", dec!(198.5980), "PV-001".into());
        let json = serde_json::to_string(&tx).unwrap();
        assert!(json.contains("\"sender\":\"system\""));
        let back: Transaction = serde_json::from_str(&json).unwrap();
        assert!(back.sender.is_system());
        assert_eq!(back, tx);
    }

    #[test]
    fn issuance_needs_no_signature() {
        let tx = Transaction::issuance("alice", dec!(10), "PV-001".into());
        assert!(tx.signature_ok());
    }

    #[test]
    fn transfer_requires_full_length_signature() {
        let tx = Transaction::transfer("alice", "bob", dec!(1), None, "ab".into());
        assert!(!tx.signature_ok());
        let tx = Transaction::transfer("alice", "bob", dec!(1), None, "a".repeat(128));
        assert!(tx.signature_ok());
    }
}
