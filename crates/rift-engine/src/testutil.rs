//! Вспомогательные функции для тестов движка

use std::io::Read;
use std::net::{TcpListener, TcpStream};
use std::thread;

/// Включить вывод логов движка в тестах (RUST_LOG)
pub(crate) fn init_logs() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Пара соединённых TCP сокетов через loopback
pub(crate) fn tcp_pair() -> (TcpStream, TcpStream) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let client = TcpStream::connect(addr).unwrap();
    let (server, _) = listener.accept().unwrap();
    (client, server)
}

/// Прочитать всё до EOF в фоновом потоке
pub(crate) fn read_all(server: TcpStream) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut server = server;
        let mut received = Vec::new();
        server.read_to_end(&mut received).unwrap();
        received
    })
}
