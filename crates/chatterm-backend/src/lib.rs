// Messaging backend seam: the capability trait, its event vocabulary and a
// self-contained loopback implementation.

pub mod backend;
pub mod credentials;
pub mod error;
pub mod events;
pub mod loopback;

pub use backend::Backend;
pub use credentials::Credentials;
pub use error::BackendError;
pub use events::{AttachmentAction, BackendEvent};
pub use loopback::{LoopbackBackend, LoopbackConfig};
