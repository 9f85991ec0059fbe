//! Типы ошибок для rift-core
//!
//! Этот модуль содержит ошибки байтового уровня: валидация профиля,
//! мутация HTTP и вставка границ TLS record.

use thiserror::Error;

use crate::profile::SplitMethod;

/// Основной тип ошибок ядра
#[derive(Error, Debug)]
pub enum CoreError {
    /// Ошибка профиля десинхронизации
    #[error("Ошибка профиля: {0}")]
    Profile(#[from] ProfileError),

    /// Ошибка мутации HTTP запроса
    #[error("Ошибка мутации HTTP: {0}")]
    Mutate(#[from] MutateError),

    /// Ошибка вставки границы TLS record
    #[error("Ошибка TLS record: {0}")]
    Record(#[from] RecordError),

    /// Ошибка разбора TOML конфигурации
    #[error("Ошибка разбора конфигурации: {0}")]
    Toml(#[from] toml::de::Error),

    /// Ошибка ввода-вывода
    #[error("Ошибка I/O: {0}")]
    Io(#[from] std::io::Error),
}

/// Ошибки валидации профиля десинхронизации
#[derive(Error, Debug)]
pub enum ProfileError {
    /// Метод недоступен на текущей платформе
    #[error("Метод {0} не поддерживается на этой платформе")]
    UnsupportedMethod(SplitMethod),

    /// TTL decoy-пакета должен быть ненулевым
    #[error("fake_ttl не может быть равен 0")]
    ZeroFakeTtl,

    /// TTL по умолчанию должен быть ненулевым
    #[error("default_ttl не может быть равен 0")]
    ZeroDefaultTtl,
}

/// Ошибки мутации HTTP запроса
#[derive(Error, Debug)]
pub enum MutateError {
    /// В запросе не найден заголовок Host
    #[error("Заголовок Host не найден")]
    HostNotFound,

    /// Заголовок Host расположен некорректно
    #[error("Некорректная структура заголовка Host")]
    MalformedHostHeader,
}

/// Ошибки вставки границы TLS record
#[derive(Error, Debug)]
pub enum RecordError {
    /// Буфер слишком короткий для TLS record
    #[error("Буфер слишком короткий для TLS record: {len} байт")]
    TooShort {
        /// Размер доступной области
        len: usize,
    },

    /// Точка разреза выходит за пределы области
    #[error("Точка разреза вне области: split={split}, длина области {len}")]
    SplitOutOfRange {
        /// Запрошенная точка разреза
        split: usize,
        /// Размер доступной области
        len: usize,
    },

    /// Точка разреза выходит за пределы текущего record
    #[error("Точка разреза за пределами record: split={split}, длина record {record_len}")]
    SplitBeyondRecord {
        /// Запрошенная точка разреза
        split: usize,
        /// Длина payload текущего record
        record_len: usize,
    },
}

/// Псевдоним для Result с ошибкой ядра
pub type Result<T> = std::result::Result<T, CoreError>;
