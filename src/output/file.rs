use crate::output::TableFormat;
use crate::adb::sync::DirectoryEntry;

const UNITS: &[&str] = &["B", "K", "M", "G", "T"];

/// Format a byte count the way `ls -h` does.
pub fn human_size(size: u64) -> String {
    if size < 1024 {
        return format!("{}B", size);
    }

    let mut size = size as f64;
    let mut unit_index = 0;
    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }
    format!("{:.1}{}", size, UNITS[unit_index])
}

impl TableFormat for DirectoryEntry {
    fn headers() -> Vec<&'static str> {
        vec!["MODE", "SIZE", "MODIFIED", "NAME"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.mode.to_string(),
            human_size(u64::from(self.size)),
            self.last_modified.format("%Y-%m-%d %H:%M").to_string(),
            self.name.clone(),
        ]
    }
}
