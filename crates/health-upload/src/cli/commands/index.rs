//! Time index preview for health-upload

use crate::cli::parse_timestamp;
use crate::error::Result;
use crate::time_index::TimeIndex;

/// Print the calendar index a sample with this interval would carry
pub fn show(start: &str, end: &str) -> Result<()> {
    let start = parse_timestamp(start)?;
    let end = parse_timestamp(end)?;

    let index = TimeIndex::new(&start, &end);
    println!("{}", serde_json::to_string_pretty(&index.to_document())?);
    Ok(())
}
