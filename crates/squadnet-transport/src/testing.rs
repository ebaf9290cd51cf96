//! In-process transport driver for tests.
//!
//! `StubTransport` stands in for the real link: it records every command it
//! receives (with reply channels stripped), acks start requests — succeeding
//! by default, failing on demand — and lets a test inject `TransportEvent`s
//! as if the radio delivered them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;

use crate::{EndpointId, TransportCommand, TransportError, TransportEvent, TransportHandle};

/// A transport command as observed by the stub, reply channels stripped so
/// tests can compare with `==`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeenCommand {
    StartAdvertising {
        display_name: String,
        service_id: String,
    },
    StopAdvertising,
    StartDiscovery {
        service_id: String,
    },
    StopDiscovery,
    RequestConnection {
        local_display_name: String,
        endpoint: EndpointId,
    },
    AcceptConnection {
        endpoint: EndpointId,
    },
    RejectConnection {
        endpoint: EndpointId,
    },
    Disconnect {
        endpoint: EndpointId,
    },
    SendPayload {
        endpoints: Vec<EndpointId>,
        bytes: Vec<u8>,
    },
}

/// Scripted transport driver. Construct with [`StubTransport::spawn`], feed
/// the returned event receiver to the mesh service under test.
pub struct StubTransport {
    handle: TransportHandle,
    event_tx: mpsc::Sender<TransportEvent>,
    seen: Arc<Mutex<Vec<SeenCommand>>>,
    fail_next_start: Arc<AtomicBool>,
}

impl StubTransport {
    /// Spawn the driver task. Returns the stub plus the event receiver the
    /// mesh service consumes.
    pub fn spawn() -> (Self, mpsc::Receiver<TransportEvent>) {
        let (handle, mut cmd_rx) = TransportHandle::channel();
        let (event_tx, event_rx) = mpsc::channel(64);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let fail_next_start = Arc::new(AtomicBool::new(false));

        let seen_task = Arc::clone(&seen);
        let fail_task = Arc::clone(&fail_next_start);
        tokio::spawn(async move {
            while let Some(command) = cmd_rx.recv().await {
                tracing::debug!(?command, "stub transport command");
                let recorded = match command {
                    TransportCommand::StartAdvertising {
                        display_name,
                        service_id,
                        reply,
                    } => {
                        let _ = reply.send(Self::start_result(&fail_task));
                        SeenCommand::StartAdvertising {
                            display_name,
                            service_id,
                        }
                    }
                    TransportCommand::StopAdvertising => SeenCommand::StopAdvertising,
                    TransportCommand::StartDiscovery { service_id, reply } => {
                        let _ = reply.send(Self::start_result(&fail_task));
                        SeenCommand::StartDiscovery { service_id }
                    }
                    TransportCommand::StopDiscovery => SeenCommand::StopDiscovery,
                    TransportCommand::RequestConnection {
                        local_display_name,
                        endpoint,
                    } => SeenCommand::RequestConnection {
                        local_display_name,
                        endpoint,
                    },
                    TransportCommand::AcceptConnection { endpoint } => {
                        SeenCommand::AcceptConnection { endpoint }
                    }
                    TransportCommand::RejectConnection { endpoint } => {
                        SeenCommand::RejectConnection { endpoint }
                    }
                    TransportCommand::Disconnect { endpoint } => {
                        SeenCommand::Disconnect { endpoint }
                    }
                    TransportCommand::SendPayload { endpoints, bytes } => {
                        SeenCommand::SendPayload { endpoints, bytes }
                    }
                };
                if let Ok(mut seen) = seen_task.lock() {
                    seen.push(recorded);
                }
            }
        });

        (
            Self {
                handle,
                event_tx,
                seen,
                fail_next_start,
            },
            event_rx,
        )
    }

    fn start_result(fail: &AtomicBool) -> Result<(), TransportError> {
        if fail.swap(false, Ordering::SeqCst) {
            Err(TransportError::StartFailed("scripted failure".into()))
        } else {
            Ok(())
        }
    }

    /// Handle the mesh service uses to issue commands.
    pub fn handle(&self) -> TransportHandle {
        self.handle.clone()
    }

    /// Make the next start-advertising/start-discovery request fail.
    pub fn fail_next_start(&self) {
        self.fail_next_start.store(true, Ordering::SeqCst);
    }

    /// Inject an event as if the link delivered it.
    pub async fn inject(&self, event: TransportEvent) {
        self.event_tx
            .send(event)
            .await
            .unwrap_or_else(|_| panic!("mesh under test dropped its event receiver"));
    }

    /// Snapshot of every command observed so far.
    pub fn seen(&self) -> Vec<SeenCommand> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Poll until `pred` holds over the observed commands, or panic after
    /// two seconds. Keeps tests free of bare sleeps.
    pub async fn wait_for(&self, pred: impl Fn(&[SeenCommand]) -> bool) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        loop {
            if pred(&self.seen()) {
                return;
            }
            if tokio::time::Instant::now() >= deadline {
                panic!("timed out waiting for command; seen: {:?}", self.seen());
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}
