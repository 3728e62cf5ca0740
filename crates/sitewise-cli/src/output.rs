use console::style;
use serde::Serialize;
use serde_json::json;
use std::fmt::Display;
use tabled::{settings::Style, Table, Tabled};

/// Output format mode
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    Human,
    Json,
}

pub struct OutputWriter {
    format: OutputFormat,
}

fn pretty(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

impl OutputWriter {
    pub fn new(json: bool) -> Self {
        Self { format: if json { OutputFormat::Json } else { OutputFormat::Human } }
    }

    pub fn success(&self, message: impl Display) {
        match self.format {
            OutputFormat::Human => {
                println!("{} {}", style("✓").green().bold(), message);
            }
            OutputFormat::Json => {
                println!("{}", pretty(&json!({ "status": "success", "message": message.to_string() })));
            }
        }
    }

    pub fn info(&self, message: impl Display) {
        match self.format {
            OutputFormat::Human => {
                println!("{} {}", style("ℹ").blue().bold(), message);
            }
            OutputFormat::Json => {
                println!("{}", pretty(&json!({ "status": "info", "message": message.to_string() })));
            }
        }
    }

    pub fn warning(&self, message: impl Display) {
        match self.format {
            OutputFormat::Human => {
                eprintln!("{} {}", style("⚠").yellow().bold(), message);
            }
            OutputFormat::Json => {
                eprintln!("{}", pretty(&json!({ "status": "warning", "message": message.to_string() })));
            }
        }
    }

    pub fn error(&self, message: impl Display) {
        match self.format {
            OutputFormat::Human => {
                eprintln!("{} {}", style("✗").red().bold(), message);
            }
            OutputFormat::Json => {
                eprintln!("{}", pretty(&json!({ "status": "error", "message": message.to_string() })));
            }
        }
    }

    /// Rounded table for humans, the rows themselves for JSON
    pub fn table<T: Tabled + Serialize>(&self, rows: Vec<T>) -> anyhow::Result<()> {
        match self.format {
            OutputFormat::Human => {
                if rows.is_empty() {
                    println!("{}", style("(no data)").dim());
                } else {
                    let mut table = Table::new(rows);
                    table.with(Style::rounded());
                    println!("{}", table);
                }
            }
            OutputFormat::Json => self.result(rows)?,
        }
        Ok(())
    }

    pub fn data<T: Serialize>(&self, data: &T) -> anyhow::Result<()> {
        println!("{}", serde_json::to_string_pretty(data)?);
        Ok(())
    }

    pub fn result<T: Serialize>(&self, data: T) -> anyhow::Result<()> {
        match self.format {
            OutputFormat::Human => {
                self.data(&data)?;
            }
            OutputFormat::Json => {
                let output = json!({ "status": "success", "data": data });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
        }
        Ok(())
    }

    pub fn kv(&self, key: impl Display, value: impl Display) {
        match self.format {
            OutputFormat::Human => {
                println!("{}: {}", style(key).bold(), value);
            }
            OutputFormat::Json => {
                println!("{}", pretty(&json!({ key.to_string(): value.to_string() })));
            }
        }
    }

    pub fn section(&self, title: impl Display) {
        match self.format {
            OutputFormat::Human => {
                println!("\n{}", style(title).bold().underlined());
            }
            OutputFormat::Json => {}
        }
    }

    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }
}
