//! In-process bus connecting the popup, the background dispatcher and the
//! per-tab content agents.

pub mod background;
pub mod local;
pub mod recorders;
pub mod tabs;

pub use background::BackgroundLink;
pub use local::{AgentHandle, LocalBus};
pub use recorders::{MenuRegistry, NotificationLog};
pub use tabs::TabRegistry;
