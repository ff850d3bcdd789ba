use std::collections::BTreeMap;

use log::debug;
use serde_json::Value;

use crate::error::ChainError;

/// Tokens required to offset one kilogram of CO2 is 1/100: a hundred
/// kilograms per token.
const OFFSET_KG_PER_TOKEN: f64 = 100.0;

/// A named callable unit. Contracts are synchronous, deterministic, and
/// independent of chain state unless they explicitly read from the ledger.
pub type ContractFn = Box<dyn Fn(&[Value]) -> Result<Value, String> + Send + Sync>;

/// Name-to-callable registry with the built-ins pre-installed.
pub struct ContractEngine {
    contracts: BTreeMap<String, ContractFn>,
}

impl Default for ContractEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ContractEngine {
    pub fn new() -> Self {
        let mut engine = Self {
            contracts: BTreeMap::new(),
        };
        engine.register("CarbonOffset", Box::new(carbon_offset));
        engine.register("CreateMarketListing", Box::new(create_market_listing));
        engine
    }

    pub fn register(&mut self, name: impl Into<String>, contract: ContractFn) {
        self.contracts.insert(name.into(), contract);
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.contracts.keys().map(String::as_str)
    }

    /// Dispatch by name. Unknown names and argument errors are surfaced to
    /// the caller; contracts never mutate ledger state here.
    pub fn execute(&self, name: &str, args: &[Value]) -> Result<Value, ChainError> {
        let contract = self
            .contracts
            .get(name)
            .ok_or_else(|| ChainError::UnknownContract(name.to_string()))?;
        debug!("execute contract {} with {} args", name, args.len());
        contract(args).map_err(ChainError::ContractFailed)
    }
}

fn arg_str(args: &[Value], i: usize, name: &str) -> Result<String, String> {
    args.get(i)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| format!("argument {i} ({name}) must be a string"))
}

fn arg_num(args: &[Value], i: usize, name: &str) -> Result<f64, String> {
    let value = args
        .get(i)
        .ok_or_else(|| format!("argument {i} ({name}) is missing"))?;
    // numbers may arrive as JSON numbers or decimal strings
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| format!("argument {i} ({name}) is not a finite number")),
        Value::String(s) => s
            .parse::<f64>()
            .map_err(|_| format!("argument {i} ({name}) is not a number: {s}")),
        _ => Err(format!("argument {i} ({name}) must be a number")),
    }
}

/// CarbonOffset(user, token_amount, carbon_kg): enough tokens to cover the
/// requested offset? Pure check; burning tokens is a business extension.
fn carbon_offset(args: &[Value]) -> Result<Value, String> {
    let user = arg_str(args, 0, "user")?;
    let token_amount = arg_num(args, 1, "token_amount")?;
    let carbon_kg = arg_num(args, 2, "carbon_kg")?;

    let required = carbon_kg / OFFSET_KG_PER_TOKEN;
    let message = if token_amount >= required {
        format!("offset successful: {user} offset {carbon_kg} kgCO2")
    } else {
        format!("insufficient tokens: {user} needs {required} for {carbon_kg} kgCO2")
    };
    Ok(Value::String(message))
}

/// CreateMarketListing(seller, token_amount, carbon_kg): confirmation only;
/// there is no persisted order book in the core.
fn create_market_listing(args: &[Value]) -> Result<Value, String> {
    let seller = arg_str(args, 0, "seller")?;
    let token_amount = arg_num(args, 1, "token_amount")?;
    let carbon_kg = arg_num(args, 2, "carbon_kg")?;
    Ok(Value::String(format!(
        "listing created: {seller} offers {token_amount} tokens backed by {carbon_kg} kgCO2"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn offset_succeeds_with_enough_tokens() {
        let engine = ContractEngine::new();
        let result = engine
            .execute("CarbonOffset", &[json!("alice"), json!(5), json!(400)])
            .unwrap();
        assert!(result.as_str().unwrap().starts_with("offset successful"));
    }

    #[test]
    fn offset_fails_when_short() {
        let engine = ContractEngine::new();
        let result = engine
            .execute("CarbonOffset", &[json!("alice"), json!(3), json!(400)])
            .unwrap();
        assert!(result.as_str().unwrap().starts_with("insufficient tokens"));
    }

    #[test]
    fn offset_accepts_decimal_strings() {
        let engine = ContractEngine::new();
        let result = engine
            .execute(
                "CarbonOffset",
                &[json!("alice"), json!("4.0000"), json!("400")],
            )
            .unwrap();
        assert!(result.as_str().unwrap().starts_with("offset successful"));
    }

    #[test]
    fn listing_returns_confirmation() {
        let engine = ContractEngine::new();
        let result = engine
            .execute(
                "CreateMarketListing",
                &[json!("bob"), json!(12.5), json!(900)],
            )
            .unwrap();
        assert!(result.as_str().unwrap().contains("bob"));
        assert!(result.as_str().unwrap().contains("12.5"));
    }

    #[test]
    fn unknown_contract_is_an_error() {
        let engine = ContractEngine::new();
        assert!(matches!(
            engine.execute("SelfDestruct", &[]),
            Err(ChainError::UnknownContract(_))
        ));
    }

    #[test]
    fn bad_arguments_are_reported() {
        let engine = ContractEngine::new();
        assert!(matches!(
            engine.execute("CarbonOffset", &[json!(1), json!(2)]),
            Err(ChainError::ContractFailed(_))
        ));
    }

    #[test]
    fn custom_contracts_can_be_registered() {
        let mut engine = ContractEngine::new();
        engine.register("Echo", Box::new(|args| Ok(json!(args))));
        let result = engine.execute("Echo", &[json!("x")]).unwrap();
        assert_eq!(result, json!([json!("x")]));
    }
}
