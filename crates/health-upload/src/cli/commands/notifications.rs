//! Notification receipt command for health-upload

use crate::cli::Context;
use crate::error::{HealthError, Result};
use crate::notifications;

/// Record that a push notification arrived at `timestamp`
pub async fn received(ctx: &Context, timestamp: &str) -> Result<()> {
    let stored = notifications::add_notification_received_timestamp(
        ctx.store.as_ref(),
        ctx.paths.as_ref(),
        timestamp,
    )
    .await;

    if !stored {
        return Err(HealthError::Other(
            "Notification receipt was not stored, see log for details".to_string(),
        ));
    }

    println!("Recorded notification received at {}", timestamp);
    Ok(())
}
