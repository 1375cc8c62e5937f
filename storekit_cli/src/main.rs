use clap::{Args, Parser, Subcommand, ValueEnum};
use log::*;

mod decode;
mod store;
mod token;

use crate::{
    decode::print_decoded_payload,
    store::{print_order_lookup, print_transaction_history, run_test_notification},
    token::print_bearer_token,
};

#[derive(Parser, Debug)]
#[command(version, about = "Tools for the App Store Server API")]
pub struct Arguments {
    /// Use the sandbox environment, regardless of STOREKIT_SANDBOX
    #[arg(long, global = true)]
    sandbox: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate a bearer token from the configured credentials and print it along with its header and claims
    #[clap(name = "token")]
    Token,
    /// Verify a signed payload against the configured root certificates and print its claims as JSON
    #[clap(name = "decode")]
    Decode(DecodeParams),
    /// Look up an order ID from a customer's receipt
    #[clap(name = "lookup")]
    Lookup {
        #[arg(required = true, index = 1)]
        order_id: String,
    },
    /// Fetch and verify the complete transaction history of a customer
    #[clap(name = "history")]
    History(HistoryParams),
    /// Ask the App Store to send a test notification to the configured server URL and report the outcome
    #[clap(name = "test-notification")]
    TestNotification {
        /// Seconds to wait before checking the delivery status
        #[arg(short = 'w', long = "wait", default_value = "5")]
        wait: u64,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PayloadKind {
    Transaction,
    Renewal,
    Notification,
}

#[derive(Debug, Args)]
pub struct DecodeParams {
    /// What the payload contains
    #[arg(short = 'k', long = "kind", value_enum, default_value = "transaction")]
    kind: PayloadKind,
    /// The compact JWS, as received from the App Store
    #[arg(required = true, index = 1)]
    payload: String,
    /// Check certificate validity at this RFC 3339 time instead of now
    #[arg(long = "at")]
    at: Option<String>,
}

#[derive(Debug, Args)]
pub struct HistoryParams {
    #[arg(required = true, index = 1)]
    original_transaction_id: String,
    /// Only include these product ids
    #[arg(short = 'p', long = "product")]
    products: Vec<String>,
    /// Newest transactions first
    #[arg(long = "desc")]
    descending: bool,
    /// Print the signed transactions without verifying them
    #[arg(long = "raw")]
    raw: bool,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::init();
    let cli = Arguments::parse();
    if cli.sandbox {
        std::env::set_var("STOREKIT_SANDBOX", "1");
    }
    trace!("🚀️ Running {:?}", cli.command);
    let result = match cli.command {
        Command::Token => print_bearer_token(),
        Command::Decode(params) => print_decoded_payload(params),
        Command::Lookup { order_id } => print_order_lookup(&order_id).await,
        Command::History(params) => print_transaction_history(params).await,
        Command::TestNotification { wait } => run_test_notification(wait).await,
    };
    if let Err(e) = result {
        eprintln!("{e:#}");
        std::process::exit(1);
    }
}
