//! Sample visibility commands for health-upload

use serde_json::Value;

use crate::cli::{parse_timestamp, Context};
use crate::error::Result;
use crate::visibility::{self, HIDE_FLAG, ISSUED_FIELD};

/// Toggle, or force with `always`, the hide flag of one sample
pub async fn hide(ctx: &Context, category: &str, id: &str, always: bool) -> Result<()> {
    let hidden =
        visibility::toggle_hide_flag(ctx.store.as_ref(), ctx.paths.as_ref(), category, id, always)
            .await?;

    let state = if hidden { "hidden" } else { "visible" };
    println!("{} is now {}", id, state);
    Ok(())
}

/// Hide every sample issued between two timestamps
pub async fn hide_range(ctx: &Context, category: &str, from: &str, to: &str) -> Result<()> {
    let from = parse_timestamp(from)?;
    let to = parse_timestamp(to)?;

    let count =
        visibility::hide_samples(ctx.store.as_ref(), ctx.paths.as_ref(), category, &from, &to)
            .await?;

    println!("Hid {} samples of {}", count, category);
    Ok(())
}

/// Show the newest samples of a category
pub async fn recent(ctx: &Context, category: &str, limit: usize) -> Result<()> {
    let samples =
        visibility::fetch_recent_samples(ctx.store.as_ref(), ctx.paths.as_ref(), category, limit)
            .await;

    if samples.is_empty() {
        println!("No samples found.");
        return Ok(());
    }

    println!("{:<40} {:<24} {:<8}", "ID", "Issued", "Hidden");
    println!("{}", "-".repeat(74));

    for sample in &samples {
        let issued = sample
            .data
            .get(ISSUED_FIELD)
            .and_then(Value::as_str)
            .unwrap_or("-");
        let hidden = sample
            .data
            .get(HIDE_FLAG)
            .and_then(Value::as_bool)
            .unwrap_or(false);

        println!(
            "{:<40} {:<24} {:<8}",
            truncate(&sample.id, 39),
            issued,
            if hidden { "yes" } else { "no" }
        );
    }

    println!("\nShowing {} samples", samples.len());
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
