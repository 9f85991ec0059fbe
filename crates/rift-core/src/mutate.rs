//! Мутация HTTP запроса на месте
//!
//! Мутации искажают заголовок Host так, чтобы наивный инспектор не
//! сопоставил запрос с фильтруемым доменом, а настоящий сервер всё ещё
//! принял запрос. Длина буфера никогда не меняется.

use crate::error::MutateError;
use crate::parse;
use crate::profile::HttpMutation;

/// Применить директиву мутации к HTTP запросу
///
/// Возвращает ошибку, если заголовок Host не найден или расположен так,
/// что мутация невозможна. Ошибка фатальна для вызова `desync`.
pub fn mutate_http(buf: &mut [u8], directive: &HttpMutation) -> Result<(), MutateError> {
    let host = parse::parse_http_request(buf)
        .ok_or(MutateError::HostNotFound)?
        .field;

    // Отмотаться от значения к имени заголовка: "Host:" перед ним
    let mut colon = host.offset.saturating_sub(1);
    while colon > 0 && buf[colon] != b':' {
        colon -= 1;
    }
    if colon < 4 || buf[colon] != b':' {
        return Err(MutateError::MalformedHostHeader);
    }
    let name = colon - 4;

    if directive.header_case {
        buf[name] = buf[name].to_ascii_lowercase();
        buf[name + 1] = buf[name + 1].to_ascii_uppercase();
        buf[name + 3] = buf[name + 3].to_ascii_uppercase();
    }

    if directive.domain_case {
        for i in (0..host.len).step_by(2) {
            buf[host.offset + i] = buf[host.offset + i].to_ascii_uppercase();
        }
    }

    if directive.space_shift {
        // Значение вместе с возможным :port - до первого пробельного байта
        let mut end = host.offset;
        while end < buf.len() && !buf[end].is_ascii_whitespace() {
            end += 1;
        }
        let gap = host.offset - (colon + 1);
        let value_len = end - host.offset;
        buf.copy_within(host.offset..end, colon + 1);
        buf[colon + 1 + value_len..colon + 1 + value_len + gap].fill(b'\t');
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> Vec<u8> {
        b"GET / HTTP/1.1\r\nHost: example.com\r\nAccept: */*\r\n\r\n".to_vec()
    }

    #[test]
    fn test_header_case_mix() {
        let mut buf = request();
        let directive = HttpMutation {
            header_case: true,
            ..Default::default()
        };
        mutate_http(&mut buf, &directive).unwrap();
        assert!(buf.windows(5).any(|w| w == b"hOsT:"));
        assert_eq!(buf.len(), request().len());
    }

    #[test]
    fn test_domain_case_mix() {
        let mut buf = request();
        let directive = HttpMutation {
            domain_case: true,
            ..Default::default()
        };
        mutate_http(&mut buf, &directive).unwrap();
        assert!(buf.windows(11).any(|w| w == b"ExAmPlE.cOm"));
    }

    #[test]
    fn test_space_shift() {
        let mut buf = request();
        let directive = HttpMutation {
            space_shift: true,
            ..Default::default()
        };
        let before = buf.len();
        mutate_http(&mut buf, &directive).unwrap();
        // Значение придвинуто вплотную к двоеточию, хвост добит табуляцией
        assert!(buf.windows(17).any(|w| w == b"Host:example.com\t"));
        assert_eq!(buf.len(), before);
    }

    #[test]
    fn test_space_shift_keeps_port() {
        let mut buf = b"GET / HTTP/1.1\r\nHost: example.com:8080\r\n\r\n".to_vec();
        let directive = HttpMutation {
            space_shift: true,
            ..Default::default()
        };
        mutate_http(&mut buf, &directive).unwrap();
        assert!(buf.windows(22).any(|w| w == b"Host:example.com:8080\t"));
    }

    #[test]
    fn test_missing_host_is_error() {
        let mut buf = b"GET / HTTP/1.1\r\nAccept: */*\r\n\r\n".to_vec();
        let directive = HttpMutation {
            header_case: true,
            ..Default::default()
        };
        assert!(matches!(
            mutate_http(&mut buf, &directive),
            Err(MutateError::HostNotFound)
        ));
    }
}
