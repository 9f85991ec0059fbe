//! Типы ошибок для rift-engine
//!
//! Любая ошибка системного вызова фатальна для текущего вызова `desync`:
//! в канал уже могла уйти часть манипулированной последовательности, и
//! продолжать соединение нельзя. Ошибка несёт имя отказавшего вызова и
//! код ОС.

use thiserror::Error;

use rift_core::error::MutateError;
use rift_core::profile::SplitMethod;

/// Ошибки движка десинхронизации
#[derive(Error, Debug)]
pub enum EngineError {
    /// Отказ системного вызова
    #[error("Системный вызов {op}: {source}")]
    Syscall {
        /// Имя отказавшего вызова
        op: &'static str,
        /// Код ошибки ОС
        #[source]
        source: std::io::Error,
    },

    /// Системный вызов отправил меньше, чем требовалось
    #[error("Неполная отправка {op}: {sent} из {expected} байт")]
    ShortSend {
        /// Имя вызова
        op: &'static str,
        /// Отправлено байт
        sent: usize,
        /// Требовалось байт
        expected: usize,
    },

    /// Отказ резервного хранилища decoy-примитива
    #[error("Резервное хранилище, {op}: {source}")]
    BackingStore {
        /// Имя отказавшего вызова
        op: &'static str,
        /// Код ошибки ОС
        #[source]
        source: std::io::Error,
    },

    /// Метод недоступен на текущей платформе
    #[error("Метод {0} не поддерживается на этой платформе")]
    UnsupportedMethod(SplitMethod),

    /// Мутация HTTP запроса не удалась
    #[error("Мутация HTTP: {0}")]
    Mutation(#[from] MutateError),
}

impl EngineError {
    /// Ошибка системного вызова с текущим errno
    pub(crate) fn syscall(op: &'static str) -> Self {
        EngineError::Syscall {
            op,
            source: std::io::Error::last_os_error(),
        }
    }

    /// Ошибка резервного хранилища с текущим errno
    #[cfg(any(target_os = "linux", target_os = "android"))]
    pub(crate) fn backing(op: &'static str) -> Self {
        EngineError::BackingStore {
            op,
            source: std::io::Error::last_os_error(),
        }
    }
}

/// Псевдоним для Result с ошибкой движка
pub type Result<T> = std::result::Result<T, EngineError>;
