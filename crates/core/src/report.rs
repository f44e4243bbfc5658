//! Text format of the downloadable bulk action report.
//!
//! A report is a header, one line per processed key, and a footer with
//! the final counters. These functions only build text; the engine's
//! report streamer decides when each part is written.

use crate::overview::BulkActionOverview;
use crate::status::BulkActionType;

/// Written to a stream that attaches when no report can be produced.
pub const REPORT_UNAVAILABLE_MESSAGE: &str = "Unable to generate report. \
     Report download should be started right after the bulk action starts. \
     Please try again.\n";

/// Report header: banner, the command executed per key, and a separator.
pub fn header(action_type: BulkActionType) -> String {
    format!(
        "Bulk Delete Report\n\
         Command Executed for each key: {} key_name\n\
         A summary is provided at the end of this file.\n\
         ==================\n\n",
        action_type.as_str().to_uppercase()
    )
}

/// One line per key: `<key> - OK` or `<key> - Error: <message>`.
pub fn key_line(key: &str, error: Option<&str>) -> String {
    match error {
        None => format!("{key} - OK\n"),
        Some(message) => format!("{key} - Error: {message}\n"),
    }
}

/// Footer with the final status and counters.
pub fn footer(overview: &BulkActionOverview) -> String {
    format!(
        "\n=============\n\
         Summary:\n\
         =============\n\
         Status: {}\n\
         Processed: {} keys\n\
         Succeeded: {} keys\n\
         Failed: {} keys\n",
        overview.status,
        overview.summary.processed,
        overview.summary.succeed,
        overview.summary.failed,
    )
}
