mod command_handler;

pub use command_handler::{print_order_lookup, print_transaction_history, run_test_notification};
