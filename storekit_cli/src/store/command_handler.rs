use std::time::Duration;

use anyhow::{Context, Result};
use log::*;
use storekit_tools::{claims::JwsTransaction, StoreApi, StoreConfig, TransactionHistoryQuery};

use crate::{decode::to_pretty_json, HistoryParams};

fn new_store_api() -> Result<StoreApi> {
    let config = StoreConfig::new_from_env_or_default();
    StoreApi::new(config).context("Error creating App Store Server API client")
}

pub async fn print_order_lookup(order_id: &str) -> Result<()> {
    let api = new_store_api()?;
    let result = api.lookup_order_id(order_id).await?;
    if !result.is_valid() {
        println!("Order {order_id} is not valid (status {})", result.status);
        return Ok(());
    }
    let transactions: Vec<JwsTransaction> = api.verifier().decode_all(&result.signed_transactions);
    println!("Order {order_id}: {} verified transaction(s)", transactions.len());
    println!("{}", to_pretty_json(&serde_json::to_value(&transactions)?));
    Ok(())
}

pub async fn print_transaction_history(params: HistoryParams) -> Result<()> {
    let api = new_store_api()?;
    let query = TransactionHistoryQuery {
        product_ids: params.products,
        sort: Some(if params.descending { "DESCENDING" } else { "ASCENDING" }.to_string()),
        ..Default::default()
    };
    let pages = api.get_transaction_history(&params.original_transaction_id, &query).await?;
    let signed = pages.into_iter().flat_map(|p| p.signed_transactions).collect::<Vec<_>>();
    if params.raw {
        signed.iter().for_each(|s| println!("{s}"));
        return Ok(());
    }
    let mut failures = 0;
    for result in api.verifier().decode_each::<JwsTransaction, _>(&signed) {
        match result {
            Ok(tx) => println!("{}", to_pretty_json(&serde_json::to_value(&tx)?)),
            Err(e) => {
                failures += 1;
                eprintln!("Rejected transaction: {e}");
            },
        }
    }
    info!("{} transaction(s) in history, {failures} rejected", signed.len());
    Ok(())
}

pub async fn run_test_notification(wait: u64) -> Result<()> {
    let api = new_store_api()?;
    let token = api.request_test_notification().await?.test_notification_token;
    println!("Test notification requested: {token}");
    tokio::time::sleep(Duration::from_secs(wait)).await;
    let status = api.get_test_notification_status(&token).await?;
    for attempt in &status.send_attempts {
        println!("Attempt at {}: {}", attempt.attempt_date, attempt.send_attempt_result);
    }
    let notification = api.verifier().decode_notification(&status.signed_payload)?;
    println!("{}", to_pretty_json(&serde_json::to_value(&notification)?));
    Ok(())
}
