//! Семейство адресов и управление TTL сокета
//!
//! Hop-limit выставляется разными опциями для IPv4 и IPv6, а dual-stack
//! сокет с IPv4-mapped адресом обязан использовать IPv4 семантику -
//! поэтому семейство определяется по адресу назначения, а не по типу
//! сокета.

use std::net::SocketAddr;
use std::os::unix::io::RawFd;
use tracing::error;

use crate::error::{EngineError, Result};

/// Эффективное семейство адресов назначения
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    /// IPv4 (`IP_TTL`)
    V4,
    /// IPv6 (`IPV6_UNICAST_HOPS`)
    V6,
}

/// Определить эффективное семейство адреса назначения
///
/// IPv6 адрес вида `::ffff:a.b.c.d` (первые 80 бит нулевые, следующие
/// 16 - единицы) трактуется как IPv4.
pub fn resolve_family(addr: &SocketAddr) -> Family {
    match addr {
        SocketAddr::V4(_) => Family::V4,
        SocketAddr::V6(v6) => {
            let o = v6.ip().octets();
            if o[..10] == [0u8; 10] && o[10] == 0xff && o[11] == 0xff {
                Family::V4
            } else {
                Family::V6
            }
        }
    }
}

/// TTL сокета как маленький автомат состояний
///
/// Владеет опцией TTL сокета на время вызова `desync`: примитивы
/// опускают TTL через [`TtlState::set`] и обязаны вернуть его через
/// [`TtlState::restore`] до следующего примитива. Параллельные вызовы на
/// одном сокете недопустимы.
#[derive(Debug)]
pub struct TtlState {
    fd: RawFd,
    family: Family,
    default_ttl: u8,
}

impl TtlState {
    /// Создать автомат для сокета и семейства назначения
    pub fn new(fd: RawFd, family: Family, default_ttl: u8) -> Self {
        Self {
            fd,
            family,
            default_ttl,
        }
    }

    /// Семейство назначения
    pub fn family(&self) -> Family {
        self.family
    }

    /// Выставить hop-limit
    ///
    /// Отказ setsockopt фатален: откатить TTL в середине вызова уже
    /// нельзя.
    pub fn set(&self, ttl: u8) -> Result<()> {
        let value = ttl as libc::c_int;
        let (level, opt, op) = match self.family {
            Family::V4 => (libc::IPPROTO_IP, libc::IP_TTL, "setsockopt IP_TTL"),
            Family::V6 => (
                libc::IPPROTO_IPV6,
                libc::IPV6_UNICAST_HOPS,
                "setsockopt IPV6_UNICAST_HOPS",
            ),
        };
        let ret = unsafe {
            libc::setsockopt(
                self.fd,
                level,
                opt,
                &value as *const _ as *const libc::c_void,
                std::mem::size_of_val(&value) as libc::socklen_t,
            )
        };
        if ret < 0 {
            let err = EngineError::syscall(op);
            error!("{}", err);
            return Err(err);
        }
        Ok(())
    }

    /// Вернуть hop-limit к значению по умолчанию
    pub fn restore(&self) -> Result<()> {
        self.set(self.default_ttl)
    }

    /// Прочитать текущий hop-limit сокета
    pub fn current(&self) -> Result<u8> {
        let mut value: libc::c_int = 0;
        let mut len = std::mem::size_of_val(&value) as libc::socklen_t;
        let (level, opt, op) = match self.family {
            Family::V4 => (libc::IPPROTO_IP, libc::IP_TTL, "getsockopt IP_TTL"),
            Family::V6 => (
                libc::IPPROTO_IPV6,
                libc::IPV6_UNICAST_HOPS,
                "getsockopt IPV6_UNICAST_HOPS",
            ),
        };
        let ret = unsafe {
            libc::getsockopt(
                self.fd,
                level,
                opt,
                &mut value as *mut _ as *mut libc::c_void,
                &mut len,
            )
        };
        if ret < 0 {
            return Err(EngineError::syscall(op));
        }
        Ok(value as u8)
    }
}
