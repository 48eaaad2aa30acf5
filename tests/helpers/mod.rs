#![allow(dead_code)]

pub mod mock_ledger;

pub use mock_ledger::{MockAccount, MockLedger, FEE_PER_SIGNATURE};

use echo_client::rpc_manager::ConfirmationPolicy;
use echo_client::ProtocolSettings;
use std::time::Duration;

/// Settings matching the defaults, with a short confirmation deadline
pub fn test_settings() -> ProtocolSettings {
    ProtocolSettings {
        policy: ConfirmationPolicy {
            timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(100),
        },
        ..ProtocolSettings::default()
    }
}
