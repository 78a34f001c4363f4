// Protocol module: wire message types and identifier helpers

pub mod messages;
pub mod types;

pub use messages::{ClientMessage, MatchFoundPayload, ServerMessage};
pub use types::{common_interests, room_id_for, RoomId, SessionId, UserId};
