//! parley-client: wire layer for the parley agent service
//!
//! This crate decodes the framed event stream the agent service emits over a
//! streaming HTTP response, types those frames, and exposes the service's
//! endpoints behind the [`AgentApi`] trait.

pub mod api;
pub mod error;
pub mod events;
pub mod frame;
pub mod types;

pub use api::{AgentApi, ClientConfig, HttpClient};
pub use error::{Error, Result};
pub use events::StreamEvent;
pub use frame::{EventFrame, FrameDecoder, FrameStream, decode_frames};
pub use types::*;
