/*!
# Error System for Unique Strings

Ошибки хранилища уникальных строк. Все операции библиотеки возвращают
[`StoreResult`]; бинарник поверх этого использует `anyhow`.
*/

use std::collections::TryReserveError;
use thiserror::Error;

use crate::store::handle::StoreId;

/// Результат операций хранилища
pub type StoreResult<T> = Result<T, StoreError>;

/// Ошибки хранилища уникальных строк
#[derive(Error, Debug)]
pub enum StoreError {
    /// `add` after `freeze`: the dedup index no longer exists.
    #[error("store {store} is frozen; no strings can be added")]
    Frozen { store: StoreId },

    /// The text contains the terminator byte and cannot be stored null-terminated.
    #[error("text contains a NUL byte at position {position}")]
    InteriorNul { position: usize },

    #[error("arena growth to {requested} bytes failed: {source}")]
    OutOfMemory {
        requested: usize,
        #[source]
        source: TryReserveError,
    },

    #[error("arena offset space exhausted: {used} bytes used, {requested} more requested")]
    CapacityOverflow { used: usize, requested: usize },

    #[error("handle belongs to store {handle_owner}, not store {store}")]
    ForeignHandle { store: StoreId, handle_owner: StoreId },

    #[error("handle offset {offset} is outside the committed range (used: {used})")]
    InvalidHandle { offset: u32, used: usize },

    #[error("stored bytes are not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

impl StoreError {
    /// Ошибка нарушения протокола (ошибка программиста), а не исчерпание ресурсов.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            StoreError::Frozen { .. }
                | StoreError::ForeignHandle { .. }
                | StoreError::InvalidHandle { .. }
        )
    }

    /// Исчерпание памяти арены.
    pub fn is_resource_exhaustion(&self) -> bool {
        matches!(
            self,
            StoreError::OutOfMemory { .. } | StoreError::CapacityOverflow { .. }
        )
    }
}
