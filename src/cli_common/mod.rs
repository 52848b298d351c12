//! Общий модуль для CLI
//!
//! Содержит общую функциональность бинарника:
//! - Инициализация логирования
//! - Цветной вывод сообщений
//! - Форматирование размеров

use anyhow::Result;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

pub mod output;

pub use output::{OutputFormat, OutputWriter};

/// Инициализирует систему логирования с настройками по умолчанию
pub fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

/// Инициализирует минимальное логирование (только WARN и ERROR)
pub fn init_minimal_logging() -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

/// Выводит заголовок CLI утилиты
pub fn print_header(name: &str, version: &str, description: &str) {
    println!("{} {} - {}", "🔧".blue(), name.bold().blue(), version.dimmed());
    println!("{}\n", description.dimmed());
}

/// Выводит успешное завершение операции
pub fn print_success(message: &str) {
    println!("{} {}", "✅".green(), message.green());
}

/// Выводит предупреждение
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠️".yellow(), message.yellow());
}

/// Выводит ошибку
pub fn print_error(message: &str) {
    eprintln!("{} {}", "❌".red(), message.red());
}

/// Форматирует размер в человекочитаемый вид
pub fn format_file_size(size: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut size = size as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", size as u64, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(1023), "1023 B");
        assert_eq!(format_file_size(1024), "1.00 KB");
        assert_eq!(format_file_size(1024 * 1024), "1.00 MB");
        assert_eq!(format_file_size(1024 * 1024 * 1024), "1.00 GB");
    }
}
