//! Client library for the registry daemon's two control sockets.

pub mod client;
pub mod error;

pub use client::{KcontClient, KcontHandle, VarsClient};
pub use error::ClientError;
