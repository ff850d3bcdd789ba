pub mod model;

pub use model::{Account, Transaction, TxKind, SYSTEM_SENTINEL};
