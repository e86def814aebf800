pub mod broadcaster;
pub mod events;
pub mod handler;

pub use broadcaster::RoomBroadcaster;
pub use events::{ClientEvent, ServerEvent, TriageAction};
pub use handler::ws_handler;
