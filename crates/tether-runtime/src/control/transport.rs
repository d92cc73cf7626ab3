//! Control server transport (TCP).

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

use tracing::{debug, warn};

use crate::error::RuntimeError;

use super::{handle_request_line, ClientSession, ControlState};

pub(crate) fn spawn_control_server(
    listener: TcpListener,
    state: Arc<ControlState>,
) -> Result<(), RuntimeError> {
    thread::Builder::new()
        .name("tether-control".into())
        .spawn(move || {
            for stream in listener.incoming().map_while(Result::ok) {
                if state.is_shut_down() {
                    break;
                }
                let client = stream
                    .peer_addr()
                    .map_or_else(|_| "unknown".to_string(), |addr| addr.to_string());
                let id = match stream.try_clone() {
                    Ok(clone) => state.register_client(clone),
                    Err(err) => {
                        warn!("control client {client}: {err}");
                        continue;
                    }
                };
                let state = state.clone();
                thread::spawn(move || {
                    handle_client(stream, &state, &client);
                    state.unregister_client(id);
                });
            }
        })
        .map(|_| ())
        .map_err(|err| RuntimeError::ControlError(format!("spawn: {err}").into()))
}

fn handle_client(stream: TcpStream, state: &ControlState, client: &str) {
    debug!("control client {client} connected");
    let reader = match stream.try_clone() {
        Ok(clone) => BufReader::new(clone),
        Err(_) => return,
    };
    let mut session = ClientSession::default();
    let mut writer = stream;
    for line in reader.lines().map_while(Result::ok) {
        if line.trim().is_empty() {
            continue;
        }
        if let Some(response) = handle_request_line(&line, state, &mut session) {
            if writeln!(writer, "{response}").is_err() {
                break;
            }
        }
    }
    debug!("control client {client} disconnected");
}
