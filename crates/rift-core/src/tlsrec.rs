//! Фрагментация TLS record
//!
//! Вставка дополнительных границ record в ClientHello: один логический
//! record разрезается на несколько wire-level record поменьше. Инспектор,
//! наивно разбирающий TLS, теряет SNI, особенно когда граница попадает
//! внутрь самого расширения. Настоящий стек TLS склеивает record обратно
//! без потерь.

use bytes::BytesMut;
use tracing::{debug, warn};

use crate::error::RecordError;
use crate::profile::{RecordAnchor, RecordSplitPart};

/// Длина заголовка TLS record: тип, версия, длина payload
pub const RECORD_HEADER_LEN: usize = 5;

#[inline]
fn be16(data: &[u8], i: usize) -> u16 {
    ((data[i] as u16) << 8) | (data[i + 1] as u16)
}

#[inline]
fn put_be16(data: &mut [u8], i: usize, x: u16) {
    data[i] = (x >> 8) as u8;
    data[i + 1] = (x & 0xff) as u8;
}

/// Вставить границу record внутри record, начинающегося в `record_start`
///
/// Первые `split` байт payload остаются в старом record, его поле длины
/// переписывается. Новый пятибайтовый заголовок (тот же тип и версия,
/// длина - остаток) вставляется в `record_start + 5 + split`, хвост
/// буфера сдвигается вправо, длина буфера растёт на 5.
pub fn insert_record_boundary(
    buf: &mut BytesMut,
    record_start: usize,
    split: usize,
) -> Result<(), RecordError> {
    let region = buf.len() - record_start;
    if region < RECORD_HEADER_LEN {
        return Err(RecordError::TooShort { len: region });
    }
    if split + RECORD_HEADER_LEN > region {
        return Err(RecordError::SplitOutOfRange { split, len: region });
    }
    let record_len = be16(buf, record_start + 3) as usize;
    if record_len < split {
        return Err(RecordError::SplitBeyondRecord {
            split,
            record_len,
        });
    }

    let insert_at = record_start + RECORD_HEADER_LEN + split;
    let old_len = buf.len();
    buf.resize(old_len + RECORD_HEADER_LEN, 0);
    buf.copy_within(insert_at..old_len, insert_at + RECORD_HEADER_LEN);

    // Новый заголовок наследует тип и версию старого
    let (kind, ver_hi, ver_lo) = (buf[record_start], buf[record_start + 1], buf[record_start + 2]);
    buf[insert_at] = kind;
    buf[insert_at + 1] = ver_hi;
    buf[insert_at + 2] = ver_lo;
    put_be16(buf, insert_at + 3, (record_len - split) as u16);
    put_be16(buf, record_start + 3, split as u16);

    Ok(())
}

/// Пройти по точкам фрагментации и вставить границы record
///
/// Позиции заданы в координатах буфера до вставок; каждая предыдущая
/// вставка сдвигает последующие на 5 байт, что учитывается слагаемым
/// `5*i`. Попытка шага назад или отказ примитива прекращают фрагментацию,
/// уже вставленные границы остаются. Для вызова в целом это не ошибка.
pub fn fragment_records(buf: &mut BytesMut, sni_offset: usize, parts: &[RecordSplitPart]) {
    let mut last: i64 = 0;
    for (i, part) in parts.iter().enumerate() {
        let mut pos = part.position + (i as i64) * RECORD_HEADER_LEN as i64;
        match part.anchor {
            RecordAnchor::SniStart => {
                // Граница ложится внутрь record перед расширением
                pos += sni_offset as i64 - RECORD_HEADER_LEN as i64;
            }
            RecordAnchor::Absolute => {
                if pos < 0 {
                    pos += buf.len() as i64;
                }
            }
        }
        if pos < last {
            warn!("отмена tlsrec: {} < {}", pos, last);
            break;
        }
        match insert_record_boundary(buf, last as usize, (pos - last) as usize) {
            Ok(()) => {
                debug!("tlsrec: pos={}, n={}", pos, buf.len());
            }
            Err(e) => {
                warn!("ошибка tlsrec: pos={}, n={}: {}", pos, buf.len(), e);
                break;
            }
        }
        last = pos + RECORD_HEADER_LEN as i64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;
    use crate::template::FAKE_TLS;

    /// Синтетический ClientHello длиной `n` с SNI по смещению 90
    fn hello(n: usize) -> BytesMut {
        let mut buf = BytesMut::from(&FAKE_TLS[..]);
        buf.truncate(n);
        put_be16(&mut buf, 3, (n - RECORD_HEADER_LEN) as u16);
        buf
    }

    #[test]
    fn test_insert_boundary_at_sni() {
        // Сценарий: n=200, SNI на 90, tlsrec = [{sni_start, -5}]
        let mut buf = hello(200);
        let original = buf.clone();
        fragment_records(
            &mut buf,
            90,
            &[RecordSplitPart {
                position: -5,
                anchor: RecordAnchor::SniStart,
            }],
        );

        assert_eq!(buf.len(), 205);
        // Новый заголовок на позиции 85
        assert_eq!(buf[85], 0x16);
        assert_eq!(&buf[86..88], &original[1..3]);
        // Длины: 80 у первого record, остаток у второго
        assert_eq!(be16(&buf, 3), 80);
        assert_eq!(be16(&buf, 88), 195 - 80);
        // Байты payload не потеряны и не переставлены
        assert_eq!(&buf[5..85], &original[5..85]);
        assert_eq!(&buf[90..], &original[85..]);
    }

    #[test]
    fn test_fragment_absolute_and_from_end() {
        let mut buf = hello(200);
        fragment_records(
            &mut buf,
            90,
            &[
                RecordSplitPart {
                    position: 20,
                    anchor: RecordAnchor::Absolute,
                },
                RecordSplitPart {
                    position: -60,
                    anchor: RecordAnchor::Absolute,
                },
            ],
        );
        // Вторая точка: -60 + 5 + 205 = 150, заголовок после payload в 155
        assert_eq!(buf.len(), 210);
        assert_eq!(buf[25], 0x16);
        assert_eq!(buf[155], 0x16);
    }

    #[test]
    fn test_backward_position_stops_loop() {
        let mut buf = hello(200);
        fragment_records(
            &mut buf,
            90,
            &[
                RecordSplitPart {
                    position: 100,
                    anchor: RecordAnchor::Absolute,
                },
                RecordSplitPart {
                    position: 10,
                    anchor: RecordAnchor::Absolute,
                },
                RecordSplitPart {
                    position: 150,
                    anchor: RecordAnchor::Absolute,
                },
            ],
        );
        // Первая вставка прошла, вторая шагает назад и обрывает цикл,
        // третья не рассматривается
        assert_eq!(buf.len(), 205);
    }

    #[test]
    fn test_insert_beyond_record_is_error() {
        let mut buf = hello(60);
        // record payload 55 байт, разрез за его пределами
        assert!(matches!(
            insert_record_boundary(&mut buf, 0, 56),
            Err(RecordError::SplitOutOfRange { .. })
        ));

        let mut buf = hello(200);
        put_be16(&mut buf, 3, 40);
        assert!(matches!(
            insert_record_boundary(&mut buf, 0, 41),
            Err(RecordError::SplitBeyondRecord { .. })
        ));
        // Отказ примитива не трогает буфер
        assert_eq!(buf.len(), 200);
    }

    #[test]
    fn test_short_region_is_error() {
        let mut buf = BytesMut::from(&b"\x16\x03\x01"[..]);
        assert!(matches!(
            insert_record_boundary(&mut buf, 0, 0),
            Err(RecordError::TooShort { .. })
        ));
    }

    #[test]
    fn test_sni_still_parseable_after_fragmentation() {
        // Настоящий стек склеивает record: проверяем только сохранность
        // байтов, но сам буфер после вставки должен остаться валидным
        // потоком record
        let mut buf = BytesMut::from(&FAKE_TLS[..]);
        let sni = parse::parse_tls_client_hello(&buf).unwrap();
        fragment_records(
            &mut buf,
            sni.offset,
            &[RecordSplitPart {
                position: 0,
                anchor: RecordAnchor::SniStart,
            }],
        );
        assert_eq!(buf.len(), FAKE_TLS.len() + 5);
        // Первый record заканчивается ровно перед новым заголовком
        let first_len = be16(&buf, 3) as usize;
        assert_eq!(buf[5 + first_len], 0x16);
    }
}
