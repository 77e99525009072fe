use chrono::{DateTime, Local};

pub fn now() -> DateTime<Local> {
    Local::now()
}

/// "January 05, 2025", as printed on tests.
pub fn display_date(dt: &DateTime<Local>) -> String {
    dt.format("%B %d, %Y").to_string()
}

/// Sortable stamp used in backup and download file names.
pub fn file_stamp(dt: &DateTime<Local>) -> String {
    dt.format("%Y%m%d_%H%M%S").to_string()
}
