//! Байтовые шаблоны decoy-пакетов и OOB данных
//!
//! Шаблоны - неизменяемые константы процесса. Decoy-шаблон выбирается по
//! распознанному протоколу: инспектор должен увидеть правдоподобный
//! ClientHello или HTTP запрос, а не мусор.

/// Канонический TLS ClientHello для decoy-отправки: запрос к
/// `www.wikipedia.org` с padding-расширением до полного размера record
pub static FAKE_TLS: [u8; 517] = {
    let mut a = [0u8; 517];
    let b = b"\x16\x03\x01\x02\x00\x01\x00\x01\xfc\x03\x03\x03\x5f\
\x6f\x2c\xed\x13\x22\xf8\xdc\xb2\xf2\x60\x48\x2d\x72\
\x66\x6f\x57\xdd\x13\x9d\x1b\x37\xdc\xfa\x36\x2e\xba\
\xf9\x92\x99\x3a\x20\xf9\xdf\x0c\x2e\x8a\x55\x89\x82\
\x31\x63\x1a\xef\xa8\xbe\x08\x58\xa7\xa3\x5a\x18\xd3\
\x96\x5f\x04\x5c\xb4\x62\xaf\x89\xd7\x0f\x8b\x00\x3e\
\x13\x02\x13\x03\x13\x01\xc0\x2c\xc0\x30\x00\x9f\xcc\
\xa9\xcc\xa8\xcc\xaa\xc0\x2b\xc0\x2f\x00\x9e\xc0\x24\
\xc0\x28\x00\x6b\xc0\x23\xc0\x27\x00\x67\xc0\x0a\xc0\
\x14\x00\x39\xc0\x09\xc0\x13\x00\x33\x00\x9d\x00\x9c\
\x00\x3d\x00\x3c\x00\x35\x00\x2f\x00\xff\x01\x00\x01\
\x75\x00\x00\x00\x16\x00\x14\x00\x00\x11\x77\x77\x77\
\x2e\x77\x69\x6b\x69\x70\x65\x64\x69\x61\x2e\x6f\x72\
\x67\x00\x0b\x00\x04\x03\x00\x01\x02\x00\x0a\x00\x16\
\x00\x14\x00\x1d\x00\x17\x00\x1e\x00\x19\x00\x18\x01\
\x00\x01\x01\x01\x02\x01\x03\x01\x04\x00\x10\x00\x0e\
\x00\x0c\x02\x68\x32\x08\x68\x74\x74\x70\x2f\x31\x2e\
\x31\x00\x16\x00\x00\x00\x17\x00\x00\x00\x31\x00\x00\
\x00\x0d\x00\x2a\x00\x28\x04\x03\x05\x03\x06\x03\x08\
\x07\x08\x08\x08\x09\x08\x0a\x08\x0b\x08\x04\x08\x05\
\x08\x06\x04\x01\x05\x01\x06\x01\x03\x03\x03\x01\x03\
\x02\x04\x02\x05\x02\x06\x02\x00\x2b\x00\x09\x08\x03\
\x04\x03\x03\x03\x02\x03\x01\x00\x2d\x00\x02\x01\x01\
\x00\x33\x00\x26\x00\x24\x00\x1d\x00\x20\x11\x8c\xb8\
\x8c\xe8\x8a\x08\x90\x1e\xee\x19\xd9\xdd\xe8\xd4\x06\
\xb1\xd1\xe2\xab\xe0\x16\x63\xd6\xdc\xda\x84\xa4\xb8\
\x4b\xfb\x0e\x00\x15\x00\xac\x00\x00\x00\x00\x00\x00";
    let mut i = 0usize;
    while i < b.len() {
        a[i] = b[i];
        i += 1;
    }
    a
};

/// HTTP запрос для decoy-отправки
pub static FAKE_HTTP: [u8; 43] = *b"GET / HTTP/1.1\r\nHost: www.wikipedia.org\r\n\r\n";

/// Данные для urgent-байтов: первый байт подменяет байт на точке разреза,
/// остальные уходят отдельными OOB отправками
pub static OOB_DATA: [u8; 1] = *b"a";

/// Заполнить область шаблоном, повторяя его циклически
///
/// Decoy-область никогда не дополняется нулями: сегмент длиннее шаблона
/// получает шаблон с начала ещё раз.
pub fn fill_repeating(dst: &mut [u8], src: &[u8]) {
    if src.is_empty() {
        return;
    }
    for (i, b) in dst.iter_mut().enumerate() {
        *b = src[i % src.len()];
    }
}
