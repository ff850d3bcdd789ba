use std::io::{self, Write};

use chrono::NaiveDate;
use log::error;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::chain::Ledger;
use crate::contract::ContractEngine;
use crate::error::ChainError;
use crate::panel::PanelRecord;
use crate::storage::SnapshotStore;
use crate::transaction::Transaction;
use crate::wallet::{sign_digest_hex, sign_sample_hex};

const MENU: &str = "\
commands:
  1) register panel     2) balance            3) create transaction
  4) execute contract   5) chain info         6) exit
  7) mine               8) submit telemetry   9) save snapshot";

/// Interactive console over a locally-owned ledger. Returns the process
/// exit code: 0 for a clean run, 1 when the last command failed on user
/// input, 2 on internal failure.
pub fn run(ledger: &mut Ledger, contracts: &ContractEngine, store: &SnapshotStore) -> i32 {
    println!("carbonchain console — type a command number");
    println!("{MENU}");
    let mut exit_code = 0;

    loop {
        let line = match prompt("> ") {
            Ok(Some(line)) => line,
            Ok(None) => return exit_code, // EOF
            Err(e) => {
                error!("console input failed: {e}");
                return 2;
            }
        };

        let outcome = match line.trim() {
            "" => Ok(()),
            "1" | "register" => register_panel(ledger),
            "2" | "balance" => show_balance(ledger),
            "3" | "transaction" | "tx" => create_transaction(ledger),
            "4" | "contract" => execute_contract(contracts),
            "5" | "info" => show_chain_info(ledger),
            "6" | "exit" | "quit" => return exit_code,
            "7" | "mine" => mine(ledger),
            "8" | "telemetry" => submit_telemetry(ledger),
            "9" | "save" => save_snapshot(ledger, store),
            other => {
                println!("unknown command: {other}");
                println!("{MENU}");
                Ok(())
            }
        };

        exit_code = match outcome {
            Ok(()) => 0,
            Err(e) => {
                println!("error: {e}");
                if e.is_user_error() {
                    1
                } else {
                    2
                }
            }
        };
    }
}

fn prompt(label: &str) -> io::Result<Option<String>> {
    print!("{label}");
    io::stdout().flush()?;
    let mut line = String::new();
    if io::stdin().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end().to_string()))
}

fn ask(label: &str) -> Result<String, ChainError> {
    match prompt(&format!("{label}: "))? {
        Some(value) => Ok(value.trim().to_string()),
        None => Err(ChainError::InvalidTransaction("input closed".into())),
    }
}

fn ask_parsed<T: std::str::FromStr>(label: &str) -> Result<T, ChainError> {
    let raw = ask(label)?;
    raw.parse()
        .map_err(|_| ChainError::InvalidTransaction(format!("cannot parse {label}: {raw}")))
}

fn register_panel(ledger: &mut Ledger) -> Result<(), ChainError> {
    let record = PanelRecord {
        panel_id: ask("panel id")?,
        production_date: ask_parsed::<NaiveDate>("production date (yyyy-MM-dd)")?,
        nominal_efficiency_pct: ask_parsed("efficiency %")?,
        size_m2: ask_parsed("size m2")?,
        manufacturer: ask("manufacturer")?,
        manufacturing_footprint_kgco2: ask_parsed("manufacturing footprint kgCO2")?,
        lifetime_years: ask_parsed("lifetime years")?,
        carbon_reduction_factor: ask_parsed("carbon reduction kgCO2/kWh")?,
        owner: ask("owner")?,
    };
    let panel_id = record.panel_id.clone();
    let issued = ledger.register_panel(record)?;
    println!("registered {panel_id}; issued {issued:.4} tokens to its owner");
    Ok(())
}

fn show_balance(ledger: &Ledger) -> Result<(), ChainError> {
    let address = ask("address")?;
    println!("{:.4}", ledger.balance_of(&address));
    Ok(())
}

fn create_transaction(ledger: &mut Ledger) -> Result<(), ChainError> {
    let sender = ask("sender")?;
    let receiver = ask("receiver")?;
    let amount: Decimal = ask_parsed("amount")?;
    let panel_id = match ask("panel id (optional)")? {
        id if id.is_empty() => None,
        id => Some(id),
    };

    let mut tx = Transaction::transfer(&sender, &receiver, amount, panel_id, String::new());
    let key = ask("sender private key (hex, blank to paste a signature)")?;
    tx.signature = if key.is_empty() {
        ask("signature (128 hex chars)")?
    } else {
        sign_digest_hex(&key, tx.sighash())
            .map_err(|e| ChainError::InvalidTransaction(e.to_string()))?
    };

    let txid = tx.txid.clone();
    ledger.submit_transaction(tx)?;
    println!("{txid}");
    Ok(())
}

fn execute_contract(contracts: &ContractEngine) -> Result<(), ChainError> {
    let name = ask("contract name")?;
    let raw = ask("args (comma separated)")?;
    let args = parse_contract_args(&raw);
    let result = contracts.execute(&name, &args)?;
    match result {
        Value::String(s) => println!("{s}"),
        other => println!("{other}"),
    }
    Ok(())
}

fn show_chain_info(ledger: &Ledger) -> Result<(), ChainError> {
    let info = ledger.info();
    println!("height:                {}", info.height);
    println!("transactions sealed:   {}", info.transaction_count);
    println!("samples sealed:        {}", info.sample_count);
    println!("cumulative reduction:  {:.2} kgCO2", info.cumulative_reduction);
    println!("reference reduction:   {:.2} kgCO2", info.reference_reduction);
    println!(
        "pending:               {} tx / {} samples",
        info.pending_transactions, info.pending_samples
    );
    Ok(())
}

fn mine(ledger: &mut Ledger) -> Result<(), ChainError> {
    let miner = ask("miner address")?;
    let block = ledger.mine(&miner)?;
    println!(
        "mined block {} (difficulty {}, nonce {}, reduction {:.2} kgCO2)",
        block.index, block.difficulty, block.nonce, block.total_carbon_reduction
    );
    Ok(())
}

fn submit_telemetry(ledger: &mut Ledger) -> Result<(), ChainError> {
    let mut sample = crate::telemetry::InverterSample {
        inverter_id: ask("inverter id")?,
        panel_id: ask("panel id")?,
        timestamp: chrono::Utc::now(),
        power_output_kw: ask_parsed("power output kW")?,
        irradiance_w_per_m2: ask_parsed("irradiance W/m2")?,
        module_temperature_c: ask_parsed("module temperature C")?,
        energy_generated_kwh: ask_parsed("energy generated kWh")?,
        location_tag: ask("location")?,
        signature: String::new(),
    };
    let secret = ask("device secret")?;
    sample.signature = sign_sample_hex(&secret, &sample.digest_fragment());
    ledger.submit_sample(sample)?;
    println!("sample accepted into pending pool");
    Ok(())
}

fn save_snapshot(ledger: &Ledger, store: &SnapshotStore) -> Result<(), ChainError> {
    store.save(ledger)?;
    println!("snapshot written to {}", store.dir().display());
    Ok(())
}

/// Split a comma-separated argument line into JSON values: numbers where
/// they parse, strings otherwise.
fn parse_contract_args(raw: &str) -> Vec<Value> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| match s.parse::<f64>() {
            Ok(n) => serde_json::json!(n),
            Err(_) => Value::String(s.to_string()),
        })
        .collect()
}
