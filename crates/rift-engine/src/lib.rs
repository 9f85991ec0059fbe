//! rift-engine - исполнение desync над подключённым сокетом
//!
//! Ядро (`rift-core`) решает, ГДЕ резать буфер и КАК его мутировать;
//! этот крейт отвечает за КАК отправить: системные вызовы, TTL-опции
//! сокета, urgent-байты, decoy-подмена через memfd. Вход - подключённый
//! TCP сокет, адрес назначения и профиль; выход - назначение получило
//! исходный запрос, инспектор увидел бессвязные куски.
//!
//! # Пример
//!
//! ```no_run
//! use std::net::TcpStream;
//! use bytes::BytesMut;
//! use rift_core::profile::DesyncProfile;
//!
//! let stream = TcpStream::connect("93.184.216.34:80")?;
//! let dst = stream.peer_addr()?;
//! let profile = DesyncProfile::default();
//! let mut buf = BytesMut::from(&b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n"[..]);
//! rift_engine::desync::desync(&stream, dst, &profile, &mut buf)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod desync;
pub mod error;
pub mod fake;
pub mod send;
pub mod ttl;

#[cfg(test)]
mod testutil;

pub use desync::{desync, Desync};
pub use error::{EngineError, Result};
pub use fake::fake_supported;

/// Версия крейта
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
