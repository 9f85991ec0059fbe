//! Примитивы отправки: plain, disorder, out-of-band
//!
//! Каждый примитив отправляет один непрерывный диапазон байт. TTL-
//! манипулирующие примитивы обязаны вернуть TTL по умолчанию до выхода;
//! на отказ системного вызова весь вызов `desync` завершается ошибкой.

use std::os::unix::io::RawFd;
use std::time::Duration;
use tracing::error;

use rift_core::template::OOB_DATA;

use crate::error::{EngineError, Result};
use crate::ttl::TtlState;

/// Пауза между под-отправками
pub(crate) fn delay(d: Duration) {
    if !d.is_zero() {
        std::thread::sleep(d);
    }
}

fn send_raw(fd: RawFd, data: &[u8], flags: libc::c_int, op: &'static str) -> Result<()> {
    let ret = unsafe { libc::send(fd, data.as_ptr() as *const libc::c_void, data.len(), flags) };
    if ret < 0 {
        let err = EngineError::syscall(op);
        error!("{}", err);
        return Err(err);
    }
    let sent = ret as usize;
    if sent != data.len() {
        return Err(EngineError::ShortSend {
            op,
            sent,
            expected: data.len(),
        });
    }
    Ok(())
}

/// Обычная отправка сегмента одним send
pub fn send_plain(fd: RawFd, data: &[u8]) -> Result<()> {
    send_raw(fd, data, 0, "send")
}

/// Отправка сегмента с TTL=1
///
/// Пакет истекает после первого hop и не доходит ни до инспектора, ни до
/// назначения; диапазон sequence-номеров занят, и стек отправителя сам
/// перешлёт эти байты позже с нормальным TTL. Для назначения данные
/// приходят не в порядке отправки.
pub fn send_disorder(fd: RawFd, data: &[u8], ttl: &TtlState) -> Result<()> {
    ttl.set(1)?;
    send_plain(fd, data)?;
    ttl.restore()
}

/// Отправка сегмента с urgent-байтом
///
/// `tail` - байты буфера от начала сегмента до конца, `split` - длина
/// сегмента. Байт `tail[split]` (он принадлежит следующему сегменту)
/// временно подменяется первым байтом OOB-шаблона и уходит последним,
/// помеченным как urgent: принимающий стек исключит его из потока, а
/// байт по этой позиции заново уйдёт in-band со следующим сегментом.
/// Буфер гарантированно восстановлен при любом исходе первой отправки.
pub fn send_oob(fd: RawFd, tail: &mut [u8], split: usize, pause: Duration) -> Result<()> {
    debug_assert!(split < tail.len());

    let saved = tail[split];
    tail[split] = OOB_DATA[0];
    let sent = send_raw(fd, &tail[..split + 1], libc::MSG_OOB, "send MSG_OOB");
    tail[split] = saved;
    sent?;

    let rest = &OOB_DATA[1..];
    if !rest.is_empty() {
        delay(pause);
    }
    for byte in rest {
        send_raw(fd, std::slice::from_ref(byte), libc::MSG_OOB, "send MSG_OOB")?;
        if rest.len() != 1 {
            delay(pause);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{read_all, tcp_pair};
    use std::os::unix::io::AsRawFd;

    #[test]
    fn test_send_plain() {
        let (client, server) = tcp_pair();
        let reader = read_all(server);

        send_plain(client.as_raw_fd(), b"hello").unwrap();
        drop(client);

        assert_eq!(reader.join().unwrap(), b"hello");
    }

    #[test]
    fn test_send_plain_on_closed_peer_eventually_fails() {
        let (client, server) = tcp_pair();
        drop(server);

        // Первый send может успеть в буфер, но повторные попадают в EPIPE
        let big = vec![0u8; 256 * 1024];
        let mut failed = false;
        for _ in 0..16 {
            if send_plain(client.as_raw_fd(), &big).is_err() {
                failed = true;
                break;
            }
        }
        assert!(failed);
    }

    #[test]
    fn test_send_disorder_restores_ttl() {
        let (client, server) = tcp_pair();
        let reader = read_all(server);
        let ttl = TtlState::new(client.as_raw_fd(), crate::ttl::Family::V4, 64);

        send_disorder(client.as_raw_fd(), b"abc", &ttl).unwrap();
        assert_eq!(ttl.current().unwrap(), 64);

        drop(client);
        // Через loopback TTL=1 не истекает: байты доходят
        assert_eq!(reader.join().unwrap(), b"abc");
    }

    #[test]
    fn test_send_oob_keeps_buffer_intact() {
        let (client, server) = tcp_pair();
        let reader = read_all(server);

        let mut buf = b"GET / HTTP/1.1\r\n\r\n".to_vec();
        let original = buf.clone();
        send_oob(client.as_raw_fd(), &mut buf[..], 4, Duration::ZERO).unwrap();
        assert_eq!(buf, original);

        // Досылаем остаток, начиная с позиции urgent-байта
        send_plain(client.as_raw_fd(), &buf[4..]).unwrap();
        drop(client);

        // Принимающий стек исключил urgent-байт: поток совпадает с
        // оригиналом
        assert_eq!(reader.join().unwrap(), original);
    }

    #[test]
    fn test_send_oob_restores_buffer_on_failure() {
        let file = std::fs::File::open("/dev/null").unwrap();

        let mut buf = b"abcdef".to_vec();
        let result = send_oob(file.as_raw_fd(), &mut buf[..], 2, Duration::ZERO);
        assert!(result.is_err());
        assert_eq!(buf, b"abcdef");
    }
}
