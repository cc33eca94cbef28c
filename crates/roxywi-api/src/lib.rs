// roxywi-api: Async Rust client for the Roxy-WI REST API

pub mod auth;
pub mod backups;
pub mod channels;
pub mod client;
pub mod credentials;
pub mod error;
pub mod groups;
pub mod ha;
pub mod haproxy;
pub mod letsencrypt;
pub mod nginx;
mod sections;
pub mod servers;
pub mod services;
pub mod transport;
pub mod udp;
pub mod users;
pub mod wire;

pub use client::RoxyClient;
pub use error::Error;
pub use transport::{TlsMode, TransportConfig, user_agent_for};
