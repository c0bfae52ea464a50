use crate::cli::OutputType;
use crate::error::Result;
use colored::*;
use comfy_table::Table;
use serde::Serialize;

/// Renders command results as a table or as JSON.
pub struct OutputFormatter {
    format: OutputType,
    color_enabled: bool,
}

impl OutputFormatter {
    pub fn new(format: OutputType) -> Self {
        Self {
            format,
            color_enabled: true,
        }
    }

    pub fn with_color(mut self, enabled: bool) -> Self {
        self.color_enabled = enabled;
        self
    }

    pub fn format(&self) -> OutputType {
        self.format
    }

    /// Print `items` in the selected format.
    pub fn list<T: TableFormat + Serialize>(&self, items: &[T]) -> Result<()> {
        match self.format {
            OutputType::Table => {
                println!("{}", render_table(items));
                Ok(())
            }
            OutputType::Json => self.json(&items),
        }
    }

    pub fn json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    /// Print a success message. Suppressed in JSON mode.
    pub fn success(&self, msg: &str) {
        if self.format == OutputType::Json {
            return;
        }
        if self.color_enabled {
            println!("{}", msg.bright_green());
        } else {
            println!("{}", msg);
        }
    }

    pub fn error(&self, msg: &str) {
        if self.color_enabled {
            eprintln!("{} {}", "Error:".bright_red(), msg);
        } else {
            eprintln!("Error: {}", msg);
        }
    }
}

/// Types that can be shown as rows of a table.
pub trait TableFormat {
    fn headers() -> Vec<&'static str>;
    fn row(&self) -> Vec<String>;
}

pub fn render_table<T: TableFormat>(items: &[T]) -> String {
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::NOTHING);
    table.set_header(T::headers());
    for item in items {
        table.add_row(item.row());
    }
    table.to_string()
}

pub mod device;
pub mod file;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adb::sync::DirectoryEntry;
    use crate::types::{FileMode, ForwardEntry};
    use chrono::DateTime;

    #[test]
    fn test_forward_table_has_header_and_rows() {
        let entries = vec![ForwardEntry::parse("abc123 tcp:8080 tcp:80").unwrap()];
        let table = render_table(&entries);
        assert!(table.contains("SERIAL"));
        assert!(table.contains("tcp:8080"));
    }

    #[test]
    fn test_directory_entry_row() {
        let entry = DirectoryEntry {
            mode: FileMode::from_bits(0o100644),
            size: 1536,
            last_modified: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            name: "a.txt".to_string(),
        };
        assert_eq!(
            entry.row(),
            vec!["-rw-r--r--", "1.5K", "2023-11-14 22:13", "a.txt"]
        );
    }

    #[test]
    fn test_human_size() {
        assert_eq!(file::human_size(0), "0B");
        assert_eq!(file::human_size(1023), "1023B");
        assert_eq!(file::human_size(1024), "1.0K");
        assert_eq!(file::human_size(5 * 1024 * 1024), "5.0M");
    }
}
