//! JSON-lines control client for a tether debug agent.

use std::io::{self, BufRead, BufReader, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::debugger::{ConnectOptions, Endpoint};
use crate::error::{DebuggerError, DebuggerResult};

#[derive(Debug, Deserialize)]
struct ControlResponse {
    id: u64,
    ok: bool,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    kind: Option<String>,
}

/// One request/response connection. Requests are strictly sequential; a
/// response that arrives after its request timed out is skipped by id.
#[derive(Debug)]
pub(crate) struct ControlClient {
    seq: u64,
    reader: BufReader<TcpStream>,
    pending: Vec<u8>,
    request_timeout: Duration,
}

impl ControlClient {
    pub(crate) fn connect(endpoint: &Endpoint, options: &ConnectOptions) -> DebuggerResult<Self> {
        let failed = |reason: String| DebuggerError::ConnectFailed {
            endpoint: endpoint.to_string(),
            reason,
        };
        let addrs = (endpoint.host.as_str(), endpoint.port)
            .to_socket_addrs()
            .map_err(|err| failed(err.to_string()))?;
        let mut last_error = String::from("no address resolved");
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, options.connect_timeout) {
                Ok(stream) => {
                    stream
                        .set_write_timeout(Some(options.request_timeout))
                        .map_err(|err| failed(err.to_string()))?;
                    let _ = stream.set_nodelay(true);
                    debug!("connected to debug agent at {addr}");
                    return Ok(Self {
                        seq: 1,
                        reader: BufReader::new(stream),
                        pending: Vec::new(),
                        request_timeout: options.request_timeout,
                    });
                }
                Err(err) if is_timeout(&err) => {
                    return Err(DebuggerError::Timeout {
                        operation: format!("connect to {endpoint}"),
                        timeout_ms: millis(options.connect_timeout),
                    });
                }
                Err(err) => last_error = err.to_string(),
            }
        }
        Err(failed(last_error))
    }

    fn next_id(&mut self) -> u64 {
        let id = self.seq;
        self.seq = self.seq.saturating_add(1);
        id
    }

    pub(crate) fn request(&mut self, kind: &str, params: Option<Value>) -> DebuggerResult<Value> {
        let id = self.next_id();
        let payload = json!({
            "id": id,
            "type": kind,
            "params": params.unwrap_or_else(|| json!({})),
        });
        let line = serde_json::to_string(&payload)
            .map_err(|err| DebuggerError::Internal(err.to_string()))?;
        let limit = self.request_timeout;
        {
            let stream = self.reader.get_mut();
            stream
                .write_all(line.as_bytes())
                .map_err(|err| io_error(kind, &err, limit))?;
            stream
                .write_all(b"\n")
                .map_err(|err| io_error(kind, &err, limit))?;
            stream.flush().map_err(|err| io_error(kind, &err, limit))?;
        }

        let deadline = Instant::now() + self.request_timeout;
        loop {
            let line = self.read_line(kind, deadline)?;
            let response: ControlResponse = match serde_json::from_str(&line) {
                Ok(response) => response,
                Err(err) => {
                    return Err(DebuggerError::Internal(format!(
                        "malformed {kind} response: {err}"
                    )))
                }
            };
            if response.id != id {
                debug!("skipping stale response {} while waiting for {id}", response.id);
                continue;
            }
            if response.ok {
                return Ok(response.result.unwrap_or(Value::Null));
            }
            let message = response
                .error
                .unwrap_or_else(|| format!("{kind} failed"));
            return Err(DebuggerError::from_remote(response.kind.as_deref(), message));
        }
    }

    /// Send `kind` and decode its result.
    pub(crate) fn call<T: DeserializeOwned>(
        &mut self,
        kind: &str,
        params: Option<Value>,
    ) -> DebuggerResult<T> {
        let result = self.request(kind, params)?;
        serde_json::from_value(result)
            .map_err(|err| DebuggerError::Internal(format!("unexpected {kind} result: {err}")))
    }

    /// Read one full line. Bytes of a line cut short by a timeout stay
    /// buffered for the next call.
    fn read_line(&mut self, kind: &str, deadline: Instant) -> DebuggerResult<String> {
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(timeout(kind, self.request_timeout));
            }
            self.reader
                .get_ref()
                .set_read_timeout(Some(remaining))
                .map_err(|err| io_error(kind, &err, self.request_timeout))?;
            match self.reader.read_until(b'\n', &mut self.pending) {
                Ok(0) => {
                    return Err(DebuggerError::ConnectionLost(
                        "debug agent closed the connection".into(),
                    ))
                }
                Ok(_) if self.pending.ends_with(b"\n") => {
                    let bytes = std::mem::take(&mut self.pending);
                    let line = String::from_utf8_lossy(&bytes).trim().to_string();
                    if line.is_empty() {
                        continue;
                    }
                    return Ok(line);
                }
                Ok(_) => {
                    return Err(DebuggerError::ConnectionLost(
                        "debug agent closed the connection mid-line".into(),
                    ))
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => return Err(io_error(kind, &err, self.request_timeout)),
            }
        }
    }
}

fn is_timeout(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
    )
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn timeout(kind: &str, limit: Duration) -> DebuggerError {
    DebuggerError::Timeout {
        operation: kind.to_string(),
        timeout_ms: millis(limit),
    }
}

fn io_error(kind: &str, err: &io::Error, limit: Duration) -> DebuggerError {
    if is_timeout(err) {
        return timeout(kind, limit);
    }
    DebuggerError::ConnectionLost(format!("{kind}: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread;

    fn options(request_timeout: Duration) -> ConnectOptions {
        ConnectOptions {
            request_timeout,
            ..ConnectOptions::default()
        }
    }

    fn endpoint(listener: &TcpListener) -> Endpoint {
        let addr = listener.local_addr().unwrap();
        Endpoint::new(addr.ip().to_string(), addr.port())
    }

    /// Answer each request line with the scripted reply, substituting `{id}`.
    fn agent(
        listener: TcpListener,
        replies: Vec<(Duration, &'static str)>,
    ) -> thread::JoinHandle<()> {
        thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut writer = stream;
            for (delay, reply) in replies {
                let mut line = String::new();
                if reader.read_line(&mut line).unwrap_or(0) == 0 {
                    return;
                }
                let request: Value = serde_json::from_str(&line).unwrap();
                thread::sleep(delay);
                let reply = reply.replace("{id}", &request["id"].to_string());
                let _ = writeln!(writer, "{reply}");
            }
        })
    }

    #[test]
    fn remote_errors_keep_their_kind() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let endpoint = endpoint(&listener);
        let server = agent(
            listener,
            vec![(
                Duration::ZERO,
                r#"{"id":{id},"ok":false,"error":"debuggee is not suspended","kind":"state_conflict"}"#,
            )],
        );
        let mut client =
            ControlClient::connect(&endpoint, &options(Duration::from_secs(2))).unwrap();
        let err = client.request("debug.resume", None).unwrap_err();
        assert_eq!(
            err,
            DebuggerError::StateConflict("debuggee is not suspended".into())
        );
        server.join().unwrap();
    }

    #[test]
    fn late_responses_are_skipped_after_a_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let endpoint = endpoint(&listener);
        let server = agent(
            listener,
            vec![
                (Duration::from_millis(300), r#"{"id":{id},"ok":true,"result":{"n":1}}"#),
                (Duration::ZERO, r#"{"id":{id},"ok":true,"result":{"n":2}}"#),
            ],
        );
        let mut client =
            ControlClient::connect(&endpoint, &options(Duration::from_millis(100))).unwrap();
        let err = client.request("debug.threads", None).unwrap_err();
        assert!(matches!(err, DebuggerError::Timeout { .. }));

        thread::sleep(Duration::from_millis(300));
        let value = client.request("debug.threads", None).unwrap();
        assert_eq!(value, json!({"n": 2}));
        server.join().unwrap();
    }

    #[test]
    fn closed_agent_is_a_lost_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let endpoint = endpoint(&listener);
        let server = agent(listener, Vec::new());
        let mut client =
            ControlClient::connect(&endpoint, &options(Duration::from_secs(2))).unwrap();
        server.join().unwrap();
        let err = client.request("debug.info", None).unwrap_err();
        assert!(err.is_connection_lost(), "{err:?}");
    }
}
