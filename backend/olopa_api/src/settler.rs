//! Long-running background task that releases escrow for funded deals whose
//! deadline has passed.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::api::ApiState;

/// Run the settlement loop until `shutdown` is cancelled.
pub async fn run(state: Arc<ApiState>, interval: Duration, shutdown: CancellationToken) {
    info!("Settlement loop starting — interval: {}s", interval.as_secs());

    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Settlement loop stopping");
                break;
            }
            _ = ticker.tick() => {
                settle_once(&state);
            }
        }
    }
}

/// Complete every deal that is due now. Returns how many were settled.
pub fn settle_once(state: &ApiState) -> usize {
    let settled = match state.book.complete_due(state.now()) {
        Ok(settled) => settled,
        Err(e) => {
            error!("Settlement pass failed: {e}");
            return 0;
        }
    };
    for (deal, _) in &settled {
        info!(
            deal_id = %deal.id,
            amount = %deal.amount,
            currency = %deal.currency,
            "Escrow released to freelancer"
        );
    }
    settled.len()
}
