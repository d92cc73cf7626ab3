//! Event polling for remote sessions.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde::Deserialize;
use tether_model::dto::DebuggerEventDto;
use tether_model::DebuggerEvent;
use tracing::{debug, warn};

use crate::debugger::DebuggerCallback;
use crate::error::{DebuggerError, DebuggerResult};
use crate::locator::ResourceLocator;

use super::client::ControlClient;
use super::enrich_event;

#[derive(Debug, Deserialize)]
struct EventsResult {
    events: Vec<DebuggerEventDto>,
}

/// Drains the agent's event queue on a dedicated connection and hands each
/// event to the callback in the order the agent raised them.
#[derive(Debug)]
pub(crate) struct EventPoller {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl EventPoller {
    pub(crate) fn spawn(
        mut client: ControlClient,
        interval: Duration,
        locator: Arc<dyn ResourceLocator>,
        callback: DebuggerCallback,
    ) -> DebuggerResult<Self> {
        // Subscribe before returning so no event raised after connect is missed.
        client.request("debug.subscribe", None)?;
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name("tether-event-poller".into())
            .spawn(move || {
                while !stop_flag.load(Ordering::Relaxed) {
                    match client.call::<EventsResult>("debug.events", None) {
                        Ok(result) => {
                            for event in result.events {
                                let event = enrich_event(locator.as_ref(), event.into());
                                let last = event == DebuggerEvent::Disconnect;
                                callback(event);
                                if last {
                                    return;
                                }
                            }
                        }
                        Err(err) if err.is_connection_lost() => {
                            if !stop_flag.load(Ordering::Relaxed) {
                                debug!("event connection lost: {err}");
                                callback(DebuggerEvent::Disconnect);
                            }
                            return;
                        }
                        Err(DebuggerError::Timeout { .. }) => {
                            debug!("event poll timed out; debuggee is slow");
                        }
                        Err(err) => warn!("event poll failed: {err}"),
                    }
                    thread::sleep(interval);
                }
            })
            .map_err(|err| DebuggerError::Internal(format!("spawn event poller: {err}")))?;
        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    /// Stop polling. Waits for the poll thread unless called from it.
    pub(crate) fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}

impl Drop for EventPoller {
    fn drop(&mut self) {
        self.stop();
    }
}
