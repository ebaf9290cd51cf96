//! Squadnet transport surface — the capability interface of the external
//! point-to-point transport.
//!
//! The real link (a local wireless channel) lives outside this workspace.
//! This crate models it as a command/event pair over tokio channels:
//! - `TransportHandle` sends `TransportCommand`s to the transport driver;
//!   start requests carry a oneshot for the driver's success/failure ack.
//! - The driver delivers `TransportEvent`s into an mpsc owned by the mesh
//!   event loop, which consumes them strictly in order.
//!
//! `testing::StubTransport` is an in-process driver for tests: it records
//! every command, acknowledges start requests, and lets a test inject
//! events as if they came from the radio.

pub mod endpoint;
pub mod error;
pub mod events;
pub mod handle;
pub mod testing;

pub use endpoint::EndpointId;
pub use error::TransportError;
pub use events::{TransportCommand, TransportEvent};
pub use handle::TransportHandle;
