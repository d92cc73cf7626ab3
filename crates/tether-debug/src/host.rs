//! JSON-lines host: commands in, responses and events out.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tether_model::dto::DebuggerEventDto;
use tether_model::SessionId;
use tracing::debug;

use crate::command::handle_line;
use crate::dispatcher::DebuggerEventListener;
use crate::session::SessionManager;

#[derive(Serialize)]
struct EventLine<'a> {
    session: &'a SessionId,
    event: &'a DebuggerEventDto,
}

/// Writes each event as `{"session": "...", "event": {...}}` on its own line.
pub struct LineEventWriter<W> {
    output: Arc<Mutex<W>>,
}

impl<W> LineEventWriter<W> {
    pub fn new(output: Arc<Mutex<W>>) -> Self {
        Self { output }
    }
}

impl<W: Write + Send> DebuggerEventListener for LineEventWriter<W> {
    fn on_event(&self, session: &SessionId, event: &DebuggerEventDto) -> anyhow::Result<()> {
        let line = serde_json::to_string(&EventLine { session, event })?;
        let mut output = self.output.lock();
        writeln!(output, "{line}")?;
        output.flush()?;
        Ok(())
    }
}

/// Answer command lines from `input` until it ends.
pub fn serve<R, W>(manager: &SessionManager, input: R, output: &Mutex<W>) -> io::Result<()>
where
    R: BufRead,
    W: Write,
{
    for line in input.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some(response) = handle_line(manager, line) else {
            continue;
        };
        let mut output = output.lock();
        writeln!(output, "{response}")?;
        output.flush()?;
    }
    debug!("command input closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debugger::{ConnectOptions, DebuggerRegistry};
    use crate::dispatcher::EventDispatcher;
    use std::io::Cursor;

    #[test]
    fn serve_answers_each_non_empty_line() {
        let manager = SessionManager::new(
            DebuggerRegistry::new(),
            EventDispatcher::new().unwrap(),
            ConnectOptions::default(),
        );
        let input = Cursor::new("{\"id\":1,\"command\":\"sessions\"}\n\n{\"id\":2,\"command\":\"disconnect\",\"session\":\"4\"}\n");
        let output = Mutex::new(Vec::new());
        serve(&manager, input, &output).unwrap();

        let text = String::from_utf8(output.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], r#"{"id":1,"ok":true,"result":[]}"#);
        assert!(lines[1].contains(r#""kind":"not_connected""#));
    }

    #[test]
    fn events_are_written_as_lines() {
        let output = Arc::new(Mutex::new(Vec::new()));
        let writer = LineEventWriter::new(Arc::clone(&output));
        writer
            .on_event(&SessionId::new("1"), &DebuggerEventDto::Disconnect)
            .unwrap();
        let text = String::from_utf8(output.lock().clone()).unwrap();
        assert_eq!(text, "{\"session\":\"1\",\"event\":{\"type\":\"DISCONNECT\"}}\n");
    }
}
