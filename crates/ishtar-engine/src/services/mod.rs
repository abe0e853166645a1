//! Boundaries to external subsystems acted on by immediate events.
//!
//! Each boundary is a trait the host implements (or a default that answers
//! every request with an explicit notice). Requests arrive through the
//! [`EventRouter`]; results come back as queued notice events.
//!
//! [`EventRouter`]: crate::event::EventRouter

mod audio;
mod network;
mod storage;

pub use audio::{AudioNotice, AudioRequest, AudioSink, NullAudio};
pub use network::{
    HttpMethod,
    HttpRequest,
    NetworkNotice,
    NetworkRequest,
    NetworkTransport,
    NullTransport,
    SocketRequest,
};
pub(crate) use storage::apply as apply_storage;
pub use storage::{MemoryStorage, StorageBackend, StorageError, StorageNotice, StorageRequest};
