//! Распознавание протокола исходящего буфера
//!
//! Здесь лежат парсеры первых байт соединения: поиск SNI в TLS
//! ClientHello и значения заголовка Host в HTTP запросе. Парсеры ничего
//! не пишут в буфер и возвращают смещения полей в его координатах -
//! дальше эти смещения используются планировщиком разрезов.

/// Ссылка на поле внутри исходящего буфера
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRef {
    /// Смещение первого байта поля
    pub offset: usize,
    /// Длина поля в байтах
    pub len: usize,
}

/// Значение Host вместе с портом назначения
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostRef {
    /// Положение hostname в буфере
    pub field: FieldRef,
    /// Порт из суффикса `:port`, либо 80
    pub port: u16,
}

/// Результат распознавания протокола
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    /// TLS ClientHello; поле указывает на hostname внутри SNI расширения
    Tls(FieldRef),
    /// HTTP запрос; поле указывает на значение заголовка Host
    Http(FieldRef),
    /// Протокол не распознан
    Unknown,
}

impl Protocol {
    /// Имя протокола для логов
    pub fn name(&self) -> &'static str {
        match self {
            Protocol::Tls(_) => "tls",
            Protocol::Http(_) => "http",
            Protocol::Unknown => "unknown",
        }
    }

    /// Ссылка на найденное поле (SNI или Host), если протокол распознан
    pub fn field(&self) -> Option<FieldRef> {
        match self {
            Protocol::Tls(f) | Protocol::Http(f) => Some(*f),
            Protocol::Unknown => None,
        }
    }
}

#[inline]
fn be16(data: &[u8], i: usize) -> u16 {
    ((data[i] as u16) << 8) | (data[i + 1] as u16)
}

/// Буфер начинается с TLS ClientHello record
pub fn is_tls_client_hello(buf: &[u8]) -> bool {
    buf.len() > 5 && be16(buf, 0) == 0x1603 && buf[5] == 0x01
}

/// Пропустить фиксированную часть ClientHello до блока расширений
///
/// Возвращает смещение поля длины расширений, либо `None` если буфер
/// обрывается раньше.
fn find_ext_block(buf: &[u8]) -> Option<usize> {
    if buf.len() < 44 {
        return None;
    }
    let sid_len = buf[43] as usize;
    if buf.len() < 44 + sid_len + 2 {
        return None;
    }
    let cipher_len = be16(buf, 44 + sid_len) as usize;
    // +2 за поле длины cipher suites, ещё +2 за compression methods
    let skip = 44 + sid_len + 2 + cipher_len + 2;
    if skip > buf.len() {
        None
    } else {
        Some(skip)
    }
}

/// Найти расширение с заданным типом в блоке расширений
fn find_tls_ext(ext_type: u16, buf: &[u8], mut skip: usize) -> Option<usize> {
    if buf.len() <= skip + 2 {
        return None;
    }
    let ext_len = be16(buf, skip) as usize;
    skip += 2;

    // Блок может быть обрезан границей буфера
    let end = if ext_len < buf.len() - skip {
        ext_len + skip
    } else {
        buf.len()
    };

    let mut cur = skip;
    while cur + 4 < end {
        if be16(buf, cur) == ext_type {
            return Some(cur);
        }
        let len = be16(buf, cur + 2) as usize;
        cur = cur.saturating_add(len + 4);
    }
    None
}

/// Найти hostname внутри SNI расширения TLS ClientHello
///
/// Возвращает смещение и длину hostname в координатах буфера, либо
/// `None` если буфер не является ClientHello или SNI отсутствует.
pub fn parse_tls_client_hello(buf: &[u8]) -> Option<FieldRef> {
    if !is_tls_client_hello(buf) {
        return None;
    }
    let skip = find_ext_block(buf)?;
    let sni = find_tls_ext(0x0000, buf, skip)?;
    // Заголовок расширения (4) + длина списка имён (2) + тип имени (1)
    // + длина имени (2) = 9 байт до hostname
    if sni + 12 >= buf.len() {
        return None;
    }
    let len = be16(buf, sni + 7) as usize;
    if len == 0 || sni + 9 + len > buf.len() {
        return None;
    }
    Some(FieldRef {
        offset: sni + 9,
        len,
    })
}

const HTTP_METHODS: &[&[u8]] = &[
    b"HEAD", b"GET", b"POST", b"PUT", b"DELETE", b"OPTIONS", b"CONNECT", b"TRACE", b"PATCH",
];

/// Буфер начинается с известного HTTP метода
pub fn is_http_request(buf: &[u8]) -> bool {
    if buf.len() < 16 {
        return false;
    }
    HTTP_METHODS
        .iter()
        .any(|m| buf.len() >= m.len() && &buf[..m.len()] == *m)
}

/// Поиск подстроки без учёта регистра
fn find_case_insensitive(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|w| w.eq_ignore_ascii_case(needle))
}

/// Грубое значение Host: смещение и конец строки без хвостовых пробелов
fn locate_host_value(buf: &[u8]) -> Option<(usize, usize)> {
    // Полный запрос разбираем httparse, обрезанный - ручным сканом
    let mut headers = [httparse::EMPTY_HEADER; 32];
    let mut req = httparse::Request::new(&mut headers);
    if let Ok(httparse::Status::Complete(_)) = req.parse(buf) {
        for h in req.headers.iter() {
            if h.name.eq_ignore_ascii_case("host") {
                let offset = h.value.as_ptr() as usize - buf.as_ptr() as usize;
                return Some((offset, offset + h.value.len()));
            }
        }
        return None;
    }

    let tag = b"\nHost:";
    let mut p = find_case_insensitive(buf, tag)? + tag.len();
    while p < buf.len() && buf[p] == b' ' {
        p += 1;
    }
    let mut end = p + buf[p..].iter().position(|&c| c == b'\n')?;
    while end > p && buf[end - 1].is_ascii_whitespace() {
        end -= 1;
    }
    if end == p {
        return None;
    }
    Some((p, end))
}

/// Найти значение заголовка Host в HTTP запросе
///
/// Суффикс `:port` отделяется от hostname, скобки вокруг IPv6 адреса
/// снимаются.
pub fn parse_http_request(buf: &[u8]) -> Option<HostRef> {
    if !is_http_request(buf) {
        return None;
    }
    let (mut host, end) = locate_host_value(buf)?;

    // Отмотать возможный суффикс :port
    let mut port: u16 = 80;
    let mut h_end = end - 1;
    while h_end > host && buf[h_end].is_ascii_digit() {
        h_end -= 1;
    }
    if buf[h_end] == b':' {
        let digits = &buf[h_end + 1..end];
        if digits.is_empty() {
            return None;
        }
        let mut acc: u32 = 0;
        for &d in digits {
            acc = acc * 10 + (d - b'0') as u32;
            if acc > 0xffff {
                return None;
            }
        }
        if acc == 0 {
            return None;
        }
        port = acc as u16;
    } else {
        h_end = end;
    }

    // IPv6 в квадратных скобках
    if buf.get(host) == Some(&b'[') {
        if h_end == 0 || buf.get(h_end - 1) != Some(&b']') {
            return None;
        }
        host += 1;
        h_end -= 1;
    }
    if h_end <= host {
        return None;
    }

    Some(HostRef {
        field: FieldRef {
            offset: host,
            len: h_end - host,
        },
        port,
    })
}

/// Распознать протокол буфера: сначала TLS, затем HTTP
pub fn detect(buf: &[u8]) -> Protocol {
    if let Some(sni) = parse_tls_client_hello(buf) {
        return Protocol::Tls(sni);
    }
    if let Some(host) = parse_http_request(buf) {
        return Protocol::Http(host.field);
    }
    Protocol::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::FAKE_TLS;

    #[test]
    fn test_parse_tls_template_sni() {
        let sni = parse_tls_client_hello(&FAKE_TLS).unwrap();
        assert_eq!(
            &FAKE_TLS[sni.offset..sni.offset + sni.len],
            b"www.wikipedia.org"
        );
    }

    #[test]
    fn test_not_client_hello() {
        assert_eq!(parse_tls_client_hello(b"GET / HTTP/1.1\r\n\r\n"), None);
        // ServerHello (handshake type 0x02)
        let mut hello = FAKE_TLS.to_vec();
        hello[5] = 0x02;
        assert_eq!(parse_tls_client_hello(&hello), None);
    }

    #[test]
    fn test_truncated_client_hello() {
        assert_eq!(parse_tls_client_hello(&FAKE_TLS[..40]), None);
        assert_eq!(parse_tls_client_hello(&FAKE_TLS[..100]), None);
    }

    #[test]
    fn test_parse_http_host() {
        let req = b"GET / HTTP/1.1\r\nHost: example.com\r\nAccept: */*\r\n\r\n";
        let host = parse_http_request(req).unwrap();
        assert_eq!(&req[host.field.offset..host.field.offset + host.field.len], b"example.com");
        assert_eq!(host.port, 80);
    }

    #[test]
    fn test_parse_http_host_with_port() {
        let req = b"POST /api HTTP/1.1\r\nhost: example.com:8080\r\n\r\n";
        let host = parse_http_request(req).unwrap();
        assert_eq!(&req[host.field.offset..host.field.offset + host.field.len], b"example.com");
        assert_eq!(host.port, 8080);
    }

    #[test]
    fn test_parse_http_ipv6_host() {
        let req = b"GET / HTTP/1.1\r\nHost: [2001:db8::1]:8443\r\n\r\n";
        let host = parse_http_request(req).unwrap();
        assert_eq!(&req[host.field.offset..host.field.offset + host.field.len], b"2001:db8::1");
        assert_eq!(host.port, 8443);
    }

    #[test]
    fn test_parse_http_partial_request() {
        // Заголовки ещё не дочитаны до конца: работает ручной скан
        let req = b"GET / HTTP/1.1\r\nHost: example.com\r\nAccept";
        let host = parse_http_request(req).unwrap();
        assert_eq!(&req[host.field.offset..host.field.offset + host.field.len], b"example.com");
    }

    #[test]
    fn test_parse_http_no_host() {
        assert_eq!(parse_http_request(b"GET / HTTP/1.1\r\nAccept: */*\r\n\r\n"), None);
        assert_eq!(parse_http_request(b"\x16\x03\x01\x00\x10 not http at all"), None);
    }

    #[test]
    fn test_detect() {
        assert!(matches!(detect(&FAKE_TLS), Protocol::Tls(_)));
        assert!(matches!(
            detect(b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n"),
            Protocol::Http(_)
        ));
        assert!(matches!(detect(b"\x00\x01\x02\x03 something else here"), Protocol::Unknown));
        assert_eq!(detect(b"\x05\x01\x00").name(), "unknown");
    }
}
