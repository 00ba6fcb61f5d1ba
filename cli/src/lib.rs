pub mod client;
pub mod error;
pub mod logging;
pub mod server;

pub use client::{Client, ClientId, CloseReason};
pub use error::ServerError;
pub use server::Server;
