pub mod actor;
pub mod event;
pub mod inspector;
pub mod observer;
pub mod policy;
pub mod sink;

pub use actor::{spawn_observer, ObserverHandle};
pub use event::{HostMessage, UiEvent, UiEventKind};
pub use inspector::{SnapshotInspector, UiNode, WindowInspector};
pub use observer::{Observer, SessionState};
pub use sink::UsageSink;
