pub mod client;
pub mod models;
pub mod server;

pub use client::ClientState;
pub use models::{ChannelInfo, SkillLevel};
pub use server::{RecorderStatus, ServerProfile, ServerState};
