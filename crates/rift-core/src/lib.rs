//! # Rift Core (rift-core)
//!
//! Байтовое ядро движка десинхронизации: всё, что можно сделать с
//! исходящим буфером без сокета.
//!
//! ## Возможности
//!
//! - **Распознавание протокола**: поиск SNI в TLS ClientHello и
//!   значения Host в HTTP запросе
//! - **Планирование разрезов**: разрешение точек профиля в упорядоченные
//!   сегменты с обрывом на первой некорректной позиции
//! - **Фрагментация TLS record**: вставка дополнительных границ record
//!   внутрь ClientHello
//! - **Мутация HTTP**: искажение заголовка Host на месте
//! - **Профили**: TOML-конфигурация с валидацией на загрузке и
//!   неизменяемой таблицей per-host профилей
//!
//! ## Структура
//!
//! - [`profile`]: профиль десинхронизации и его валидация
//! - [`store`]: неизменяемая таблица профилей
//! - [`parse`]: парсеры TLS/HTTP
//! - [`plan`]: планировщик разрезов
//! - [`tlsrec`]: фрагментация TLS record
//! - [`mutate`]: мутация HTTP запроса
//! - [`template`]: байтовые шаблоны decoy/OOB
//! - [`error`]: типы ошибок

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod mutate;
pub mod parse;
pub mod plan;
pub mod profile;
pub mod store;
pub mod template;
pub mod tlsrec;

// Re-экспорт основных типов для удобства
pub use error::{CoreError, Result};
pub use parse::Protocol;
pub use plan::Segment;
pub use profile::{DesyncProfile, SplitMethod};
pub use store::ProfileStore;

/// Версия библиотеки
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
