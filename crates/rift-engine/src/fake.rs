//! Decoy-примитив: подменные байты для инспектора
//!
//! Сегмент уходит дважды. Первый раз - из анонимного memfd-mapping с
//! decoy-содержимым и заниженным TTL: пакет умирает в пути, назначение
//! его не подтверждает, а инспектор успевает прочитать. Затем mapping
//! перезаписывается настоящими байтами, TTL возвращается, и
//! ретрансмиссия стека отправителя (она читает те же страницы через
//! sendfile) доносит до назначения подлинный сегмент.
//!
//! Примитив требует memfd + sendfile и доступен только на Linux/Android;
//! на остальных платформах профили с `fake` отклоняются при загрузке.

use std::os::unix::io::RawFd;
use std::time::Duration;

use rift_core::parse::Protocol;

use crate::error::Result;
use crate::ttl::TtlState;

/// Доступен ли decoy-примитив на этой платформе
pub fn fake_supported() -> bool {
    cfg!(any(target_os = "linux", target_os = "android"))
}

#[cfg(any(target_os = "linux", target_os = "android"))]
mod imp {
    use super::*;
    use tracing::error;

    use rift_core::template::{fill_repeating, FAKE_HTTP, FAKE_TLS};

    use crate::error::EngineError;
    use crate::send::delay;

    /// Резервное хранилище decoy-сегмента: memfd с mapping на запись
    ///
    /// Освобождение mapping и дескриптора - в Drop, на любом пути выхода.
    struct FakeStore {
        fd: RawFd,
        ptr: *mut libc::c_void,
        len: usize,
    }

    impl FakeStore {
        fn new(len: usize) -> Result<Self> {
            debug_assert!(len > 0);
            let fd = unsafe {
                libc::memfd_create(b"rift\0".as_ptr() as *const libc::c_char, libc::MFD_CLOEXEC)
            };
            if fd < 0 {
                let err = EngineError::backing("memfd_create");
                error!("{}", err);
                return Err(err);
            }
            let mut store = FakeStore {
                fd,
                ptr: std::ptr::null_mut(),
                len,
            };
            if unsafe { libc::ftruncate(fd, len as libc::off_t) } < 0 {
                let err = EngineError::backing("ftruncate");
                error!("{}", err);
                return Err(err);
            }
            let ptr = unsafe {
                libc::mmap(
                    std::ptr::null_mut(),
                    len,
                    libc::PROT_WRITE,
                    libc::MAP_SHARED,
                    fd,
                    0,
                )
            };
            if ptr == libc::MAP_FAILED {
                let err = EngineError::backing("mmap");
                error!("{}", err);
                return Err(err);
            }
            store.ptr = ptr;
            Ok(store)
        }

        fn as_mut_slice(&mut self) -> &mut [u8] {
            unsafe { std::slice::from_raw_parts_mut(self.ptr as *mut u8, self.len) }
        }

        /// Передать mapping в сокет zero-copy путём
        ///
        /// Отправленные байты обслуживаются прямо из страниц mapping:
        /// последующая перезапись видна ретрансмиссии ядра.
        fn transfer(&self, sock: RawFd) -> Result<()> {
            let mut offset: libc::off_t = 0;
            let ret = unsafe { libc::sendfile(sock, self.fd, &mut offset, self.len) };
            if ret < 0 {
                let err = EngineError::syscall("sendfile");
                error!("{}", err);
                return Err(err);
            }
            let sent = ret as usize;
            if sent != self.len {
                return Err(EngineError::ShortSend {
                    op: "sendfile",
                    sent,
                    expected: self.len,
                });
            }
            Ok(())
        }
    }

    impl Drop for FakeStore {
        fn drop(&mut self) {
            unsafe {
                if !self.ptr.is_null() {
                    libc::munmap(self.ptr, self.len);
                }
                libc::close(self.fd);
            }
        }
    }

    /// Отправить decoy вместо сегмента, оставив назначению настоящие байты
    pub fn send_fake(
        sock: RawFd,
        data: &[u8],
        proto: &Protocol,
        ttl: &TtlState,
        fake_ttl: u8,
        pause: Duration,
    ) -> Result<()> {
        let template: &[u8] = match proto {
            Protocol::Http(_) => &FAKE_HTTP,
            _ => &FAKE_TLS,
        };

        let mut store = FakeStore::new(data.len())?;
        fill_repeating(store.as_mut_slice(), template);

        ttl.set(fake_ttl)?;
        store.transfer(sock)?;
        delay(pause);

        // Ретрансмиссия с этого момента читает настоящие байты
        store.as_mut_slice().copy_from_slice(data);
        ttl.restore()
    }

}

#[cfg(any(target_os = "linux", target_os = "android"))]
pub use imp::send_fake;

/// Заглушка для платформ без memfd + sendfile
#[cfg(not(any(target_os = "linux", target_os = "android")))]
pub fn send_fake(
    _sock: RawFd,
    _data: &[u8],
    _proto: &Protocol,
    _ttl: &TtlState,
    _fake_ttl: u8,
    _pause: Duration,
) -> Result<()> {
    Err(crate::error::EngineError::UnsupportedMethod(
        rift_core::profile::SplitMethod::Fake,
    ))
}
