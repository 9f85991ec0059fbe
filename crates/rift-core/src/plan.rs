//! Планировщик разрезов
//!
//! Превращает список точек профиля в упорядоченные сегменты буфера.
//! Позиции обязаны строго расти и лежать в `(0, n)`; первая некорректная
//! точка обрывает планирование, но не вызов в целом - остаток буфера
//! уйдёт одним обычным send.

use tracing::warn;

use crate::parse::Protocol;
use crate::profile::{OffsetAnchor, SplitMethod, SplitPart};

/// Сегмент буфера с выбранным методом отправки
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    /// Начало сегмента (включительно)
    pub start: usize,
    /// Конец сегмента (исключительно)
    pub end: usize,
    /// Метод отправки
    pub method: SplitMethod,
}

impl Segment {
    /// Длина сегмента в байтах
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Сегмент пуст
    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }
}

/// Разрешить позицию точки относительно буфера и найденного поля
///
/// `None` означает, что точка неприменима к протоколу и пропускается.
fn resolve(part: &SplitPart, n: usize, proto: &Protocol) -> Option<i64> {
    let mut pos = part.position;
    match part.anchor {
        OffsetAnchor::Absolute => {}
        OffsetAnchor::FromEnd => {
            if pos < 0 {
                pos += n as i64;
            }
        }
        OffsetAnchor::SniStart => match proto {
            Protocol::Tls(sni) => pos += sni.offset as i64,
            _ => return None,
        },
        OffsetAnchor::HostStart => match proto {
            Protocol::Http(host) => pos += host.offset as i64,
            _ => return None,
        },
    }
    Some(pos)
}

/// Построить план разрезов для буфера длины `n`
///
/// Хвост `[последняя точка, n)` в план не входит: его отправляет
/// оркестратор обычным send.
pub fn plan(parts: &[SplitPart], n: usize, proto: &Protocol) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut last: i64 = 0;

    for part in parts {
        let pos = match resolve(part, n, proto) {
            Some(pos) => pos,
            None => continue,
        };
        if pos <= 0 || pos >= n as i64 || pos <= last {
            warn!(
                "отмена split: pos={}-{}, n={}",
                last, pos, n
            );
            break;
        }
        segments.push(Segment {
            start: last as usize,
            end: pos as usize,
            method: part.method,
        });
        last = pos;
    }
    segments
}
