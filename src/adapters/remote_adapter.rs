//! Bar source backed by a running data server.

use super::data_server::socket_timeout;
use super::wire::{self, Request, Response};
use crate::domain::bar::Bar;
use crate::domain::error::BarflowError;
use crate::ports::bar_port::BarPort;
use chrono::NaiveDate;
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;
use tracing::debug;

/// Opens a fresh connection per request; each call is a single round trip.
pub struct RemoteBarAdapter {
    address: SocketAddr,
    timeout: Duration,
}

impl RemoteBarAdapter {
    pub fn new(address: SocketAddr, timeout: Duration) -> Self {
        Self { address, timeout }
    }

    fn round_trip(&self, request: &Request) -> Result<Response, BarflowError> {
        let mut stream = match socket_timeout(self.timeout) {
            Some(t) => TcpStream::connect_timeout(&self.address, t)?,
            None => TcpStream::connect(self.address)?,
        };
        stream.set_read_timeout(socket_timeout(self.timeout))?;
        stream.set_write_timeout(socket_timeout(self.timeout))?;

        debug!(addr = %self.address, ?request, "sending request");
        wire::send(&mut stream, request)?;
        let response: Response = wire::recv(&mut stream)?.ok_or_else(|| BarflowError::Protocol {
            reason: "server closed connection without a reply".into(),
        })?;

        match response {
            Response::Error { message } => Err(BarflowError::Remote { message }),
            other => Ok(other),
        }
    }
}

fn unexpected(response: &Response) -> BarflowError {
    BarflowError::Protocol {
        reason: format!("unexpected reply {:?}", response),
    }
}

impl BarPort for RemoteBarAdapter {
    fn fetch_bars(
        &self,
        symbol: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<Bar>, BarflowError> {
        let request = Request::FetchBars {
            symbol: symbol.to_string(),
            start,
            end,
        };
        match self.round_trip(&request)? {
            Response::Bars(bars) => Ok(bars),
            other => Err(unexpected(&other)),
        }
    }

    fn list_symbols(&self) -> Result<Vec<String>, BarflowError> {
        match self.round_trip(&Request::ListSymbols)? {
            Response::Symbols(symbols) => Ok(symbols),
            other => Err(unexpected(&other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread;

    /// Accepts one connection, drains the request and answers with `reply`.
    fn one_shot_server(reply: Response) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let _request: Option<Request> = wire::recv(&mut stream).unwrap();
            wire::send(&mut stream, &reply).unwrap();
        });
        addr
    }

    #[test]
    fn remote_error_is_typed() {
        let addr = one_shot_server(Response::Error {
            message: "boom".into(),
        });
        let adapter = RemoteBarAdapter::new(addr, Duration::from_secs(5));
        let err = adapter.list_symbols().unwrap_err();
        assert!(matches!(err, BarflowError::Remote { ref message } if message == "boom"));
    }

    #[test]
    fn mismatched_reply_is_protocol_error() {
        let addr = one_shot_server(Response::Symbols(vec![]));
        let adapter = RemoteBarAdapter::new(addr, Duration::from_secs(5));
        let err = adapter.fetch_bars("AAPL", None, None).unwrap_err();
        assert!(matches!(err, BarflowError::Protocol { .. }));
    }

    #[test]
    fn connection_refused_is_io_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let adapter = RemoteBarAdapter::new(addr, Duration::from_secs(1));
        assert!(matches!(adapter.list_symbols(), Err(BarflowError::Io(_))));
    }
}
