/*!
# Ingestion

Прогон потока токенов через [`UniqueStrings`]. Используется бинарником
`unique-strings` и интеграционными тестами; библиотечному коду достаточно
самого хранилища.

Строки читаются как сырые байты: кодировка входа не проверяется, в хранилище
попадает любой байт, кроме NUL. Перевод строки `\n` или `\r\n` отрезается.

Два режима входа:
- по одному значению на строку;
- записи `key: value` (например `family: 'Firefox'`), из которых берутся
  только ключи из [`IngestConfig::fields`].
*/

pub mod config;

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::core::StoreError;
use crate::store::{Handle, StoreStats, UniqueStrings};
pub use config::IngestConfig;

/// Итог загрузки одного источника
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub source: String,
    pub lines: usize,
    /// Values passed to the store
    pub values: usize,
    pub skipped: usize,
    pub stats: StoreStats,
}

/// Store plus everything produced while filling it.
#[derive(Debug)]
pub struct Ingested {
    pub store: UniqueStrings,
    /// Handle of every accepted value, in input order
    pub handles: Vec<Handle>,
    pub report: IngestReport,
}

pub struct Ingestor<'c> {
    config: &'c IngestConfig,
    source: String,
    store: UniqueStrings,
    handles: Vec<Handle>,
    lines: usize,
    skipped: usize,
}

impl<'c> Ingestor<'c> {
    pub fn new(config: &'c IngestConfig, source: impl Into<String>) -> Result<Self> {
        let store = UniqueStrings::with_capacity(config.initial_capacity)
            .context("Failed to reserve initial arena")?;
        Ok(Self {
            config,
            source: source.into(),
            store,
            handles: Vec::new(),
            lines: 0,
            skipped: 0,
        })
    }

    /// Feeds one input line (without its line terminator). Returns the handle
    /// if a value was stored.
    pub fn ingest_line<L: AsRef<[u8]>>(&mut self, line: L) -> Result<Option<Handle>> {
        self.lines += 1;

        let Some(value) = self.extract(line.as_ref()) else {
            self.skipped += 1;
            return Ok(None);
        };

        match self.store.add(value) {
            Ok(handle) => {
                self.handles.push(handle);
                Ok(Some(handle))
            }
            Err(StoreError::InteriorNul { position }) => {
                tracing::warn!("{}:{}: NUL byte at {}, value skipped", self.source, self.lines, position);
                self.skipped += 1;
                Ok(None)
            }
            Err(e) => Err(e).with_context(|| format!("{}:{}: failed to store value", self.source, self.lines)),
        }
    }

    /// Пробелы обрезаются только ASCII: байты за пределами ASCII не трогаем.
    fn extract<'l>(&self, line: &'l [u8]) -> Option<&'l [u8]> {
        if self.config.is_comment(line) {
            return None;
        }

        let raw = if self.config.is_keyed() {
            let colon = line.iter().position(|&b| b == b':')?;
            let (key, value) = (&line[..colon], &line[colon + 1..]);
            let key = key.trim_ascii();
            let key = key.strip_prefix(b"- ").unwrap_or(key).trim_ascii();
            if !self.config.fields.iter().any(|f| f.as_bytes() == key) {
                return None;
            }
            unquote(value.trim_ascii())
        } else {
            line
        };

        let value = if self.config.trim { raw.trim_ascii() } else { raw };
        if self.config.skip_empty && value.is_empty() {
            return None;
        }
        Some(value)
    }

    pub fn ingest_reader<R: BufRead>(&mut self, mut reader: R) -> Result<()> {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            let read = reader
                .read_until(b'\n', &mut buf)
                .with_context(|| format!("Failed to read {} after line {}", self.source, self.lines))?;
            if read == 0 {
                return Ok(());
            }
            self.ingest_line(strip_line_end(&buf))?;
        }
    }

    /// Freezes the store if configured and produces the report.
    pub fn finish(mut self) -> Ingested {
        if self.config.freeze {
            self.store.freeze();
        }
        let report = IngestReport {
            source: self.source,
            lines: self.lines,
            values: self.handles.len(),
            skipped: self.skipped,
            stats: self.store.stats(),
        };
        tracing::info!(
            "{}: {} values, {} distinct, {} skipped",
            report.source,
            report.values,
            report.stats.strings,
            report.skipped
        );
        Ingested { store: self.store, handles: self.handles, report }
    }
}

/// Strips one pair of matching YAML-style quotes.
fn unquote(value: &[u8]) -> &[u8] {
    for quote in [b'\'', b'"'] {
        if let Some(inner) = value.strip_prefix(&[quote]).and_then(|v| v.strip_suffix(&[quote])) {
            return inner;
        }
    }
    value
}

fn strip_line_end(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Reads `path` line by line into a fresh store.
pub fn ingest_path<P: AsRef<Path>>(path: P, config: &IngestConfig) -> Result<Ingested> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut ingestor = Ingestor::new(config, path.display().to_string())?;
    ingestor.ingest_reader(BufReader::new(file))?;
    Ok(ingestor.finish())
}
