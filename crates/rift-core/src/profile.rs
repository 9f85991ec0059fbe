//! Профиль десинхронизации
//!
//! Профиль описывает, как именно отправляется первый payload соединения:
//! упорядоченный список точек разреза с методом отправки для каждой,
//! список точек фрагментации TLS record и директива мутации HTTP.
//! Профиль выбирается для назначения один раз и не изменяется в течение
//! вызова `desync`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;

use crate::error::ProfileError;

/// TTL decoy-пакета по умолчанию
pub const DEFAULT_FAKE_TTL: u8 = 8;

/// Метод отправки сегмента
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitMethod {
    /// Обычный разрез потока: сегмент уходит отдельным send
    Split,
    /// Отправка с TTL=1: сегмент истекает в пути и доставляется
    /// ретрансмиссией позже остальных
    Disorder,
    /// Decoy-пакет: инспектор видит подменённые байты, назначение -
    /// настоящие (через ретрансмиссию из перезаписанного mapping)
    Fake,
    /// Отправка с urgent-байтом (MSG_OOB)
    OutOfBand,
}

impl fmt::Display for SplitMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SplitMethod::Split => write!(f, "split"),
            SplitMethod::Disorder => write!(f, "disorder"),
            SplitMethod::Fake => write!(f, "fake"),
            SplitMethod::OutOfBand => write!(f, "oob"),
        }
    }
}

/// Привязка позиции разреза
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OffsetAnchor {
    /// Абсолютное смещение от начала буфера
    Absolute,
    /// Отрицательные значения отсчитываются от конца буфера
    FromEnd,
    /// Смещение от начала SNI (только для TLS; иначе точка пропускается)
    SniStart,
    /// Смещение от начала значения Host (только для HTTP; иначе точка
    /// пропускается)
    HostStart,
}

impl Default for OffsetAnchor {
    fn default() -> Self {
        OffsetAnchor::Absolute
    }
}

/// Точка разреза исходящего буфера
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitPart {
    /// Смещение (знаковое, трактуется согласно `anchor`)
    pub position: i64,
    /// Привязка смещения
    #[serde(default)]
    pub anchor: OffsetAnchor,
    /// Метод отправки сегмента до этой точки
    pub method: SplitMethod,
}

/// Привязка позиции фрагментации TLS record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordAnchor {
    /// Абсолютное смещение; отрицательные значения отсчитываются от конца
    Absolute,
    /// Смещение от начала SNI
    SniStart,
}

impl Default for RecordAnchor {
    fn default() -> Self {
        RecordAnchor::Absolute
    }
}

/// Точка вставки дополнительной границы TLS record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSplitPart {
    /// Смещение в координатах буфера до вставок
    pub position: i64,
    /// Привязка смещения
    #[serde(default)]
    pub anchor: RecordAnchor,
}

/// Директива мутации HTTP запроса
///
/// Все мутации выполняются на месте и не меняют длину буфера.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpMutation {
    /// Смешать регистр имени заголовка: `Host` -> `hOsT`
    #[serde(default)]
    pub header_case: bool,
    /// Поднять регистр каждого второго байта домена
    #[serde(default)]
    pub domain_case: bool,
    /// Сдвинуть значение Host вплотную к двоеточию, заполнив хвост
    /// табуляциями
    #[serde(default)]
    pub space_shift: bool,
}

impl HttpMutation {
    /// Директива не содержит ни одной мутации
    pub fn is_empty(&self) -> bool {
        !(self.header_case || self.domain_case || self.space_shift)
    }
}

/// Профиль десинхронизации для одного назначения
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesyncProfile {
    /// Подменный адрес: используется вместо реального назначения только
    /// для определения семейства адресов и TTL
    #[serde(default)]
    pub redirect: Option<SocketAddr>,

    /// TTL decoy-пакетов
    #[serde(default = "default_fake_ttl")]
    pub fake_ttl: u8,

    /// TTL, восстанавливаемый после TTL-манипуляций
    #[serde(default = "default_ttl")]
    pub default_ttl: u8,

    /// Выставить TTL по умолчанию перед началом отправки сегментов
    #[serde(default)]
    pub custom_ttl: bool,

    /// Не разрезать нераспознанные протоколы: буфер уходит одним send
    #[serde(default)]
    pub desync_known_only: bool,

    /// Задержка между под-отправками decoy/OOB (мс)
    #[serde(default)]
    pub split_delay_ms: u64,

    /// Упорядоченные точки разреза
    #[serde(default)]
    pub parts: Vec<SplitPart>,

    /// Упорядоченные точки фрагментации TLS record
    #[serde(default)]
    pub tlsrec: Vec<RecordSplitPart>,

    /// Директива мутации HTTP запроса
    #[serde(default)]
    pub http_mutation: Option<HttpMutation>,
}

fn default_fake_ttl() -> u8 {
    DEFAULT_FAKE_TTL
}

fn default_ttl() -> u8 {
    64
}

impl Default for DesyncProfile {
    fn default() -> Self {
        Self {
            redirect: None,
            fake_ttl: default_fake_ttl(),
            default_ttl: default_ttl(),
            custom_ttl: false,
            desync_known_only: false,
            split_delay_ms: 0,
            parts: Vec::new(),
            tlsrec: Vec::new(),
            http_mutation: None,
        }
    }
}

impl DesyncProfile {
    /// Проверить профиль при загрузке
    ///
    /// `fake_supported` - флаг возможностей платформы: доступен ли
    /// decoy-примитив (memfd + sendfile). Профиль с `fake` точками на
    /// платформе без такой возможности отклоняется здесь, а не молча
    /// деградирует до обычного split.
    pub fn validate(&self, fake_supported: bool) -> Result<(), ProfileError> {
        if self.default_ttl == 0 {
            return Err(ProfileError::ZeroDefaultTtl);
        }
        let has_fake = self
            .parts
            .iter()
            .any(|p| p.method == SplitMethod::Fake);
        if has_fake {
            if !fake_supported {
                return Err(ProfileError::UnsupportedMethod(SplitMethod::Fake));
            }
            if self.fake_ttl == 0 {
                return Err(ProfileError::ZeroFakeTtl);
            }
        }
        Ok(())
    }
}
