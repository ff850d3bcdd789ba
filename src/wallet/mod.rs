use rand::rngs::OsRng;
use secp256k1::{ecdsa::Signature, Message, PublicKey, Secp256k1, SecretKey};
use sha2::{Digest, Sha256};

/// Transaction signatures are 64-byte compact ECDSA, hex encoded.
pub const TX_SIG_HEX_LEN: usize = 128;
/// Telemetry signatures are a 32-byte keyed digest, hex encoded.
pub const SAMPLE_SIG_HEX_LEN: usize = 64;

/// The predicate the ledger core applies to signatures: hex of the expected
/// length. Real verification happens behind `verify_signature_hex`; the core
/// only depends on this shape check so the scheme can be swapped out.
pub fn signature_well_formed(sig: &str, hex_len: usize) -> bool {
    sig.len() == hex_len && sig.chars().all(|c| c.is_ascii_hexdigit())
}

/// A signing identity for a ledger account. Addresses on this chain are the
/// hex of a compressed secp256k1 public key, so the keypair *is* the
/// account: whoever holds `private_key` can move the balance the ledger
/// keeps under `address()`.
#[derive(Debug, Clone)]
pub struct Keypair {
    pub private_key: String,
    pub public_key: String,
}

impl Keypair {
    /// Mint a fresh account identity.
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        let (sk, pk) = secp.generate_keypair(&mut OsRng);
        Self {
            private_key: hex::encode(sk.secret_bytes()),
            public_key: hex::encode(pk.serialize()), // compressed (33 bytes)
        }
    }

    /// The ledger address this keypair controls.
    pub fn address(&self) -> &str {
        &self.public_key
    }

    /// Sign a transfer's message hash with this account's key. The result
    /// is the 128-hex compact signature the ledger's predicate expects.
    pub fn sign(&self, sighash: [u8; 32]) -> Result<String, &'static str> {
        sign_digest_hex(&self.private_key, sighash)
    }
}

/// Sign a 32-byte message hash, returning the compact signature as hex
/// (128 characters, matching the transaction signature predicate).
pub fn sign_digest_hex(privkey_hex: &str, msg32: [u8; 32]) -> Result<String, &'static str> {
    let secp = Secp256k1::signing_only();
    let sk_bytes = hex::decode(privkey_hex).map_err(|_| "invalid privkey hex")?;
    let sk = SecretKey::from_slice(&sk_bytes).map_err(|_| "invalid privkey bytes")?;
    let msg = Message::from_digest_slice(&msg32).map_err(|_| "invalid message length")?;
    let sig = secp.sign_ecdsa(&msg, &sk);
    Ok(hex::encode(sig.serialize_compact()))
}

/// Verify a compact signature (hex) against the given pubkey (hex, compressed)
/// and message hash (32 bytes).
pub fn verify_signature_hex(
    pubkey_hex: &str,
    sig_hex: &str,
    msg32: [u8; 32],
) -> Result<bool, &'static str> {
    let secp = Secp256k1::verification_only();

    let sig_bytes = hex::decode(sig_hex).map_err(|_| "invalid signature hex")?;
    let sig = Signature::from_compact(&sig_bytes).map_err(|_| "invalid compact signature")?;

    let pk_bytes = hex::decode(pubkey_hex).map_err(|_| "invalid pubkey hex")?;
    let pk = PublicKey::from_slice(&pk_bytes).map_err(|_| "invalid pubkey bytes")?;

    let msg = Message::from_digest_slice(&msg32).map_err(|_| "invalid message length")?;
    Ok(secp.verify_ecdsa(&msg, &sig, &pk).is_ok())
}

/// Keyed digest an inverter uses to sign its readings (64 hex characters).
/// Stands in for a firmware-held HMAC; the ledger only checks the shape.
pub fn sign_sample_hex(device_secret: &str, preimage: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(device_secret.as_bytes());
    hasher.update(preimage.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::Transaction;
    use rust_decimal_macros::dec;

    #[test]
    fn keypair_signs_predicate_conforming_transfers() {
        let keys = Keypair::generate();
        let mut tx = Transaction::transfer(keys.address(), "bob", dec!(5), None, String::new());
        tx.signature = keys.sign(tx.sighash()).unwrap();

        assert!(tx.signature_ok());
        // the address doubles as the verification key
        assert!(verify_signature_hex(keys.address(), &tx.signature, tx.sighash()).unwrap());
    }

    #[test]
    fn verification_rejects_a_different_message() {
        let keys = Keypair::generate();
        let sig = keys.sign([7u8; 32]).unwrap();
        assert_eq!(sig.len(), TX_SIG_HEX_LEN);
        assert!(verify_signature_hex(&keys.public_key, &sig, [7u8; 32]).unwrap());
        assert!(!verify_signature_hex(&keys.public_key, &sig, [8u8; 32]).unwrap());
    }

    #[test]
    fn sample_signature_shape() {
        let sig = sign_sample_hex("secret", "INV-14.2");
        assert!(signature_well_formed(&sig, SAMPLE_SIG_HEX_LEN));
    }

    #[test]
    fn predicate_rejects_wrong_length_and_non_hex() {
        assert!(!signature_well_formed("abc", TX_SIG_HEX_LEN));
        let bad = "g".repeat(TX_SIG_HEX_LEN);
        assert!(!signature_well_formed(&bad, TX_SIG_HEX_LEN));
    }
}
