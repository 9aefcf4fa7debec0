//! Blocking TCP data server.
//!
//! Serves [`Request`]s from any [`BarPort`], one connection at a time.

use super::wire::{self, Request, Response};
use crate::domain::error::BarflowError;
use crate::ports::bar_port::BarPort;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub listen: SocketAddr,
    pub data_dir: PathBuf,
    /// Per-connection read/write timeout; zero disables it.
    pub timeout: Duration,
}

/// `None` for a zero duration, which the socket API rejects.
pub fn socket_timeout(timeout: Duration) -> Option<Duration> {
    (!timeout.is_zero()).then_some(timeout)
}

/// Answer a single request. Port failures become `Response::Error`.
pub fn handle_request(port: &dyn BarPort, request: Request) -> Response {
    let result = match request {
        Request::ListSymbols => port.list_symbols().map(Response::Symbols),
        Request::FetchBars { symbol, start, end } => {
            port.fetch_bars(&symbol, start, end).map(Response::Bars)
        }
    };
    result.unwrap_or_else(|e| Response::Error {
        message: e.to_string(),
    })
}

/// Serves one [`BarPort`] over TCP, one connection at a time.
///
/// The port is `Send` so a bound server can be moved onto its own thread,
/// which is how embedders and the loopback tests run it beside a client.
pub struct DataServer {
    listener: TcpListener,
    port: Box<dyn BarPort + Send>,
    timeout: Duration,
}

impl DataServer {
    pub fn bind(
        addr: SocketAddr,
        port: Box<dyn BarPort + Send>,
        timeout: Duration,
    ) -> Result<Self, BarflowError> {
        let listener = TcpListener::bind(addr)?;
        info!(addr = %listener.local_addr()?, "data server listening");
        Ok(Self {
            listener,
            port,
            timeout,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, BarflowError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until the process stops. A failed connection is
    /// logged and dropped.
    pub fn run(&self) -> Result<(), BarflowError> {
        for stream in self.listener.incoming() {
            let stream = match stream {
                Ok(s) => s,
                Err(e) => {
                    warn!(error = %e, "accept failed");
                    continue;
                }
            };
            let peer = stream
                .peer_addr()
                .map(|a| a.to_string())
                .unwrap_or_else(|_| "unknown".into());
            if let Err(e) = self.handle_connection(stream) {
                warn!(peer = %peer, error = %e, "connection ended with error");
            }
        }
        Ok(())
    }

    /// Serve request/reply round trips until the client disconnects.
    pub fn handle_connection(&self, mut stream: TcpStream) -> Result<(), BarflowError> {
        stream.set_read_timeout(socket_timeout(self.timeout))?;
        stream.set_write_timeout(socket_timeout(self.timeout))?;
        debug!("client connected");

        while let Some(request) = wire::recv::<_, Request>(&mut stream)? {
            debug!(?request, "request");
            let response = handle_request(self.port.as_ref(), request);
            wire::send(&mut stream, &response)?;
        }

        debug!("client disconnected");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::bar::Bar;
    use chrono::NaiveDate;

    struct OneBarPort;

    impl BarPort for OneBarPort {
        fn fetch_bars(
            &self,
            symbol: &str,
            _start: Option<NaiveDate>,
            _end: Option<NaiveDate>,
        ) -> Result<Vec<Bar>, BarflowError> {
            if symbol != "AAPL" {
                return Err(BarflowError::DataLoad {
                    source_name: symbol.into(),
                    reason: "no such file".into(),
                });
            }
            Ok(vec![Bar {
                symbol: "AAPL".into(),
                timestamp: NaiveDate::from_ymd_opt(2024, 1, 2)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap(),
                open: 1.0,
                low: 1.0,
                high: 1.0,
                close: 1.0,
                volume: 10,
                open_interest: 0,
            }])
        }

        fn list_symbols(&self) -> Result<Vec<String>, BarflowError> {
            Ok(vec!["AAPL".into()])
        }
    }

    #[test]
    fn list_symbols_request() {
        assert_eq!(
            handle_request(&OneBarPort, Request::ListSymbols),
            Response::Symbols(vec!["AAPL".into()])
        );
    }

    #[test]
    fn fetch_bars_request() {
        let response = handle_request(
            &OneBarPort,
            Request::FetchBars {
                symbol: "AAPL".into(),
                start: None,
                end: None,
            },
        );
        assert!(matches!(response, Response::Bars(ref bars) if bars.len() == 1));
    }

    #[test]
    fn port_error_becomes_error_reply() {
        let response = handle_request(
            &OneBarPort,
            Request::FetchBars {
                symbol: "XYZ".into(),
                start: None,
                end: None,
            },
        );
        match response {
            Response::Error { message } => assert!(message.contains("no such file")),
            other => panic!("expected error reply, got {:?}", other),
        }
    }

    #[test]
    fn zero_timeout_disables() {
        assert_eq!(socket_timeout(Duration::ZERO), None);
        assert_eq!(
            socket_timeout(Duration::from_secs(5)),
            Some(Duration::from_secs(5))
        );
    }

    #[test]
    fn bound_server_moves_to_a_thread() {
        let server = DataServer::bind(
            "127.0.0.1:0".parse().unwrap(),
            Box::new(OneBarPort),
            Duration::from_secs(1),
        )
        .unwrap();
        let addr = server.local_addr().unwrap();
        let handle = std::thread::spawn(move || server.local_addr().unwrap());
        assert_eq!(handle.join().unwrap(), addr);
    }
}
