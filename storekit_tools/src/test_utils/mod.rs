//! Fixtures shared by the unit and integration tests. Enabled with the `test_utils` feature.
use log::*;

pub mod pki;

pub use pki::{api_key_pem, TestPki, TestPkiBuilder};

pub fn prepare_test_env() {
    let _ = env_logger::try_init();
    debug!("🚀️ Logging initialised");
}
