//! Модуль для форматирования и вывода результатов

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::str::FromStr;

/// Формат вывода результатов
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(anyhow::anyhow!("Unknown output format: {}", s)),
        }
    }
}

impl OutputFormat {
    /// Совместимая обёртка
    pub fn parse_output_format(s: &str) -> Result<Self> {
        <Self as FromStr>::from_str(s)
    }
}

/// Writer для вывода результатов
pub struct OutputWriter {
    writer: Box<dyn Write>,
    format: OutputFormat,
    pretty: bool,
}

impl OutputWriter {
    /// Создает writer для stdout
    pub fn stdout(format: OutputFormat) -> Self {
        Self::from_writer(Box::new(io::stdout()), format)
    }

    /// Создает writer для файла
    pub fn file(path: &Path, format: OutputFormat) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self::from_writer(Box::new(file), format))
    }

    pub fn from_writer(writer: Box<dyn Write>, format: OutputFormat) -> Self {
        Self { writer, format, pretty: false }
    }

    /// Включает pretty-печать для JSON
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Записывает сериализуемый объект
    pub fn write_object<T: Serialize>(&mut self, obj: &T) -> Result<()> {
        let json = if self.pretty || self.format == OutputFormat::Text {
            serde_json::to_string_pretty(obj)?
        } else {
            serde_json::to_string(obj)?
        };
        writeln!(self.writer, "{}", json)?;
        Ok(())
    }

    /// Записывает заголовок
    pub fn write_header(&mut self, header: &str) -> Result<()> {
        match self.format {
            OutputFormat::Text => {
                writeln!(self.writer, "\n{}", header.bold().blue())?;
                writeln!(self.writer, "{}", "=".repeat(header.chars().count()).blue())?;
            }
            OutputFormat::Json => {
                writeln!(self.writer, "{}", header)?;
            }
        }
        Ok(())
    }

    /// Записывает пары «ключ: значение» с выравниванием
    pub fn write_fields(&mut self, fields: &[(&str, String)]) -> Result<()> {
        let width = fields.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
        for (key, value) in fields {
            writeln!(self.writer, "  {:width$}  {}", key.dimmed(), value, width = width)?;
        }
        Ok(())
    }

    /// Записывает элемент списка
    pub fn write_list_item(&mut self, item: &str) -> Result<()> {
        writeln!(self.writer, "  • {}", item)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
