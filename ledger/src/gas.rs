//! Gas limit selection.

use crate::adapter::{LedgerAdapter, LedgerCall};

/// Gas limit used when the provider cannot estimate one.
pub const FALLBACK_GAS_LIMIT: u64 = 300_000;

/// Ask the adapter for an estimate, falling back to [`FALLBACK_GAS_LIMIT`].
///
/// A failed or zero estimate never blocks submission.
pub async fn gas_limit_for(adapter: &dyn LedgerAdapter, call: &LedgerCall) -> u64 {
    match adapter.estimate_gas(call).await {
        Ok(gas) if gas > 0 => gas,
        Ok(_) => {
            tracing::warn!(
                adapter = adapter.name(),
                fallback = FALLBACK_GAS_LIMIT,
                "gas estimate was zero, using fallback"
            );
            FALLBACK_GAS_LIMIT
        }
        Err(e) => {
            tracing::warn!(
                adapter = adapter.name(),
                fallback = FALLBACK_GAS_LIMIT,
                "gas estimation failed: {e}, using fallback"
            );
            FALLBACK_GAS_LIMIT
        }
    }
}
