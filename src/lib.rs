//! Signaling and collaboration relay for peer-to-peer audio/video sessions.
//!
//! The relay brokers control-plane traffic only: session descriptions, ICE
//! candidates, presence rosters, chat, and light collaborative-state updates.
//! Media flows directly between peers and never touches this process.

pub mod signaling;
