//! Оркестратор desync: от буфера первого запроса к серии примитивов
//!
//! Последовательность одного вызова: распознать протокол, применить
//! мутации содержимого (HTTP заголовок, TLS record-фрагментация),
//! спланировать разрез и отправить сегменты выбранными примитивами.
//! Планирование не меняет содержимое: назначение в итоге получает
//! исходные байты (после мутаций), в каком бы порядке они ни уходили.

use std::net::SocketAddr;
use std::os::unix::io::{AsRawFd, RawFd};
use std::time::Duration;

use bytes::BytesMut;
use tracing::{debug, info};

use rift_core::mutate::mutate_http;
use rift_core::parse::{detect, Protocol};
use rift_core::plan::plan;
use rift_core::profile::{DesyncProfile, SplitMethod};
use rift_core::tlsrec::fragment_records;

use crate::error::Result;
use crate::fake::send_fake;
use crate::send::{delay, send_disorder, send_oob, send_plain};
use crate::ttl::{resolve_family, TtlState};

/// Состояние desync для одного соединения
///
/// Привязано к сокету и профилю; семейство адресов берётся из адреса
/// назначения (с учётом redirect), чтобы TTL-опция попадала на нужный
/// уровень протокола.
pub struct Desync<'a> {
    fd: RawFd,
    profile: &'a DesyncProfile,
    ttl: TtlState,
}

impl<'a> Desync<'a> {
    /// Подготовить desync для сокета, подключённого к `dst`
    pub fn new(fd: RawFd, dst: SocketAddr, profile: &'a DesyncProfile) -> Self {
        let target = profile.redirect.unwrap_or(dst);
        let ttl = TtlState::new(fd, resolve_family(&target), profile.default_ttl);
        Desync { fd, profile, ttl }
    }

    /// Отправить первый запрос соединения с десинхронизацией
    ///
    /// `buf` может быть изменён мутациями, но к возврату содержит ровно
    /// те байты, которые увидит назначение.
    pub fn send(&self, buf: &mut BytesMut) -> Result<()> {
        let proto = detect(buf);
        if let Some(field) = proto.field() {
            let value = &buf[field.offset..field.offset + field.len];
            info!(
                "{}: host {} @{}",
                proto.name(),
                String::from_utf8_lossy(value),
                field.offset
            );
        }

        match proto {
            Protocol::Http(_) => {
                if let Some(directive) = &self.profile.http_mutation {
                    if !directive.is_empty() {
                        mutate_http(&mut buf[..], directive)?;
                    }
                }
            }
            Protocol::Tls(field) => {
                if !self.profile.tlsrec.is_empty() {
                    fragment_records(buf, field.offset, &self.profile.tlsrec);
                }
            }
            Protocol::Unknown => {}
        }

        if self.profile.custom_ttl {
            self.ttl.restore()?;
        }

        let n = buf.len();
        if matches!(proto, Protocol::Unknown) && self.profile.desync_known_only {
            debug!("протокол не распознан, отправка без разреза");
            return send_plain(self.fd, buf);
        }

        let pause = Duration::from_millis(self.profile.split_delay_ms);
        let segments = plan(&self.profile.parts, n, &proto);
        let mut last = 0usize;
        for seg in &segments {
            debug!("сегмент {}..{} ({})", seg.start, seg.end, seg.method);
            match seg.method {
                SplitMethod::Split => {
                    send_plain(self.fd, &buf[seg.start..seg.end])?;
                    delay(pause);
                }
                SplitMethod::Disorder => {
                    send_disorder(self.fd, &buf[seg.start..seg.end], &self.ttl)?;
                    delay(pause);
                }
                SplitMethod::Fake => {
                    send_fake(
                        self.fd,
                        &buf[seg.start..seg.end],
                        &proto,
                        &self.ttl,
                        self.profile.fake_ttl,
                        pause,
                    )?;
                }
                SplitMethod::OutOfBand => {
                    // Позиции разреза строго меньше n: байт за сегментом
                    // всегда существует
                    send_oob(self.fd, &mut buf[seg.start..], seg.end - seg.start, pause)?;
                    delay(pause);
                }
            }
            last = seg.end;
        }

        if last < n {
            send_plain(self.fd, &buf[last..n])?;
        }
        Ok(())
    }
}

/// Десинхронизированная отправка одним вызовом
pub fn desync<S: AsRawFd>(
    sock: &S,
    dst: SocketAddr,
    profile: &DesyncProfile,
    buf: &mut BytesMut,
) -> Result<()> {
    Desync::new(sock.as_raw_fd(), dst, profile).send(buf)
}
