use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{Attribute, Cell, Color as TableColor, Table};
use serde::Serialize;
use std::io::Write;

use crate::theme::Tone;

/// Output format options for CLI commands
#[derive(Clone, Debug, ValueEnum, Default, PartialEq)]
pub enum OutputFormat {
    /// Formatted table output (default)
    #[default]
    Table,
    /// JSON output for scripting
    Json,
    /// Compact single-line output
    Compact,
}

/// Global CLI options that affect output and behavior
#[derive(Clone, Debug, Default)]
pub struct GlobalOptions {
    pub output_format: OutputFormat,
    pub quiet: bool,
    pub verbose: bool,
    pub no_color: bool,
}

/// Data that can be rendered as a table or a single line
pub trait TableDisplay {
    fn to_table(&self, options: &GlobalOptions) -> Table;
    fn to_compact(&self) -> String;
}

/// Output manager handles formatting and display
pub struct OutputManager {
    pub options: GlobalOptions,
}

impl OutputManager {
    pub fn new(options: GlobalOptions) -> Self {
        Self { options }
    }

    /// Display data according to the configured output format
    pub fn display<T>(&self, data: &T) -> Result<()>
    where
        T: Serialize + TableDisplay,
    {
        if self.options.quiet {
            return Ok(());
        }

        match self.options.output_format {
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(data)?;
                println!("{json}");
            }
            OutputFormat::Table => {
                let table = data.to_table(&self.options);
                println!("{table}");
            }
            OutputFormat::Compact => {
                println!("{}", data.to_compact());
            }
        }
        Ok(())
    }

    fn chatty(&self) -> bool {
        !self.options.quiet && !matches!(self.options.output_format, OutputFormat::Json)
    }

    fn line(&self, tone: Tone, message: &str) -> String {
        if self.options.no_color {
            format!("{} {message}", tone.icon())
        } else {
            format!("{} {}", tone.icon().color(tone.color()).bold(), message.color(tone.color()))
        }
    }

    pub fn success(&self, message: &str) {
        if self.chatty() {
            println!("{}", self.line(Tone::Success, message));
        }
    }

    pub fn info(&self, message: &str) {
        if self.chatty() {
            println!("{}", self.line(Tone::Info, message));
        }
    }

    /// Errors are always shown, even in quiet mode
    pub fn error(&self, message: &str) {
        eprintln!("{}", self.line(Tone::Error, message));
    }

    pub fn warning(&self, message: &str) {
        if !self.options.quiet {
            eprintln!("{}", self.line(Tone::Warning, message));
        }
    }

    /// Only shown with `--verbose`
    pub fn verbose(&self, message: &str) {
        if self.options.verbose && !self.options.quiet {
            eprintln!("{}", self.line(Tone::Detail, message));
        }
    }

    /// Transient status on the current line; pair with [`Self::clear_line`].
    pub fn progress(&self, message: &str) {
        if self.chatty() {
            print!("\r{}...", self.line(Tone::Progress, message));
            std::io::stdout().flush().ok();
        }
    }

    pub fn clear_line(&self) {
        if self.chatty() {
            print!("\r{}\r", " ".repeat(80));
            std::io::stdout().flush().ok();
        }
    }
}

/// Table with the themed preset.
pub fn themed_table(options: &GlobalOptions) -> Table {
    let mut table = Table::new();
    if options.no_color {
        table.load_preset(comfy_table::presets::ASCII_FULL);
    } else {
        table.load_preset(comfy_table::presets::UTF8_FULL_CONDENSED);
    }
    table
}

pub fn set_header(table: &mut Table, options: &GlobalOptions, headers: &[&str]) {
    let cells: Vec<Cell> = headers
        .iter()
        .map(|header| {
            let cell = Cell::new(header).add_attribute(Attribute::Bold);
            if options.no_color { cell } else { cell.fg(TableColor::Cyan) }
        })
        .collect();
    table.set_header(cells);
}

/// Two-column key/value table.
pub fn key_value_table(options: &GlobalOptions, rows: &[(&str, String)]) -> Table {
    let mut table = themed_table(options);
    for (key, value) in rows {
        let key_cell = Cell::new(key).add_attribute(Attribute::Bold);
        let key_cell = if options.no_color { key_cell } else { key_cell.fg(TableColor::Cyan) };
        table.add_row(vec![key_cell, Cell::new(value)]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct TestData {
        name: String,
        value: i32,
    }

    impl TableDisplay for TestData {
        fn to_table(&self, options: &GlobalOptions) -> Table {
            key_value_table(options, &[("Name", self.name.clone()), ("Value", self.value.to_string())])
        }

        fn to_compact(&self) -> String {
            format!("{}={}", self.name, self.value)
        }
    }

    #[test]
    fn test_output_manager_json() {
        let options = GlobalOptions {
            output_format: OutputFormat::Json,
            ..Default::default()
        };
        let manager = OutputManager::new(options);
        let data = TestData {
            name: "test".to_string(),
            value: 42,
        };

        assert!(manager.display(&data).is_ok());
    }

    #[test]
    fn test_plain_line_keeps_icon() {
        let manager = OutputManager::new(GlobalOptions {
            no_color: true,
            ..Default::default()
        });
        assert_eq!(manager.line(Tone::Warning, "careful"), "⚠ careful");
    }

    #[test]
    fn test_key_value_table_renders_rows() {
        let options = GlobalOptions {
            no_color: true,
            ..Default::default()
        };
        let rendered = key_value_table(&options, &[("Followers", "3".to_string())]).to_string();
        assert!(rendered.contains("Followers"));
        assert!(rendered.contains('3'));
    }
}
