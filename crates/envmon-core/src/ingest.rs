//! Bulk ingestion of newline-delimited JSON readings.
//!
//! Each non-blank line holds one [`Reading`]. Lines that fail to parse or
//! validate are logged and counted, never fatal: one malformed record must
//! not block the rest of the batch.

use std::io::BufRead;

use serde::{Deserialize, Serialize};

use crate::domain::{MonitorError, Reading, Result};

/// Counts from one ingest pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestSummary {
    pub accepted: usize,
    /// Accepted readings that replaced an existing key.
    pub overwritten: usize,
    pub rejected: usize,
}

/// Parse one line into a validated reading.
pub fn parse_line(line: &str) -> Result<Reading> {
    let reading: Reading = serde_json::from_str(line)?;
    reading.validate()?;
    Ok(reading)
}

/// Parse every line of `reader`.
///
/// I/O failures are returned as errors; bad records are skipped and counted
/// in [`IngestSummary::rejected`].
pub fn parse_jsonl<R: BufRead>(reader: R) -> Result<(Vec<Reading>, IngestSummary)> {
    let mut readings = Vec::new();
    let mut summary = IngestSummary::default();

    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(MonitorError::Io)?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match parse_line(trimmed) {
            Ok(reading) => {
                summary.accepted += 1;
                readings.push(reading);
            }
            Err(e) => {
                summary.rejected += 1;
                crate::obs::emit_reading_rejected(idx + 1, &e);
            }
        }
    }

    Ok((readings, summary))
}
