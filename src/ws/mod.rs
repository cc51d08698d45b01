//! WebSocket layer: the live quiz session protocol.
//!
//! Each socket at `/ws/quiz/{quiz_id}/` joins the quiz's channel-layer
//! group, receives the group's broadcasts, and may send host commands or
//! participant actions.

pub mod connection;
pub mod handler;
pub mod messages;
