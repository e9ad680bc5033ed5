//! Cross-context message contract.
//!
//! Three isolated contexts (popup, background, content agent) exchange
//! one-shot request/reply messages. The wire shapes live in [`types`], the
//! channel routing in [`channel`], and the browser surfaces each context
//! needs in [`surface`].

pub mod channel;
pub mod surface;
pub mod types;

pub use channel::{Endpoint, Reply, Request, TabId};
pub use surface::*;
pub use types::*;
