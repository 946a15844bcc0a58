use chrono::{DateTime, Utc};

/// Compact timestamp for artifact file names, e.g. `20250101_093000`.
pub fn file_stamp(at: &DateTime<Utc>) -> String {
    at.format("%Y%m%d_%H%M%S").to_string()
}
