//! Fan-out of session events to listeners.
//!
//! Events go through one queue and one worker thread, so listeners see them
//! in publish order. Delivery is fire-and-forget: a failing or panicking
//! listener is logged and skipped.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use parking_lot::RwLock;
use tether_model::dto::DebuggerEventDto;
use tether_model::{DebuggerEvent, SessionId};
use tracing::{debug, warn};

/// Receiver of serialized session events, typically the client transport.
pub trait DebuggerEventListener: Send + Sync {
    fn on_event(&self, session: &SessionId, event: &DebuggerEventDto) -> anyhow::Result<()>;
}

impl<F> DebuggerEventListener for F
where
    F: Fn(&SessionId, &DebuggerEventDto) -> anyhow::Result<()> + Send + Sync,
{
    fn on_event(&self, session: &SessionId, event: &DebuggerEventDto) -> anyhow::Result<()> {
        self(session, event)
    }
}

struct Envelope {
    session: SessionId,
    event: DebuggerEventDto,
}

enum Message {
    Event(Envelope),
    /// Acknowledged once everything queued before it has been delivered.
    Flush(Sender<()>),
}

type Listeners = Arc<RwLock<Vec<Arc<dyn DebuggerEventListener>>>>;

#[derive(Clone)]
pub struct EventDispatcher {
    sender: Sender<Message>,
    listeners: Listeners,
}

impl EventDispatcher {
    /// Start the delivery worker. It exits once every clone is dropped.
    pub fn new() -> std::io::Result<Self> {
        let (sender, receiver) = unbounded();
        let listeners: Listeners = Arc::new(RwLock::new(Vec::new()));
        let worker_listeners = Arc::clone(&listeners);
        thread::Builder::new()
            .name("tether-events".into())
            .spawn(move || deliver_loop(&receiver, &worker_listeners))?;
        Ok(Self { sender, listeners })
    }

    pub fn add_listener(&self, listener: Arc<dyn DebuggerEventListener>) {
        self.listeners.write().push(listener);
    }

    pub fn publish(&self, session: &SessionId, event: &DebuggerEvent) {
        let envelope = Envelope {
            session: session.clone(),
            event: DebuggerEventDto::from(event),
        };
        if self.sender.send(Message::Event(envelope)).is_err() {
            warn!("event dispatcher stopped; dropping {:?}", event.event_type());
        }
    }

    /// Wait until every event published so far has reached the listeners.
    /// Returns `false` if the worker is gone or did not catch up in time.
    pub fn flush(&self, timeout: Duration) -> bool {
        let (ack, done) = bounded(1);
        if self.sender.send(Message::Flush(ack)).is_err() {
            return false;
        }
        done.recv_timeout(timeout).is_ok()
    }
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("listeners", &self.listeners.read().len())
            .field("queued", &self.sender.len())
            .finish()
    }
}

fn deliver_loop(receiver: &Receiver<Message>, listeners: &Listeners) {
    for message in receiver {
        let envelope = match message {
            Message::Event(envelope) => envelope,
            Message::Flush(ack) => {
                // The flusher may have given up waiting.
                let _ = ack.send(());
                continue;
            }
        };
        let current: Vec<Arc<dyn DebuggerEventListener>> = listeners.read().clone();
        for listener in current {
            let delivered = panic::catch_unwind(AssertUnwindSafe(|| {
                listener.on_event(&envelope.session, &envelope.event)
            }));
            match delivered {
                Ok(Ok(())) => {}
                Ok(Err(err)) => warn!(
                    "listener failed on {:?} for session {}: {err:#}",
                    envelope.event.event_type(),
                    envelope.session
                ),
                Err(_) => warn!(
                    "listener panicked on {:?} for session {}",
                    envelope.event.event_type(),
                    envelope.session
                ),
            }
        }
    }
    debug!("event dispatcher worker exiting");
}
