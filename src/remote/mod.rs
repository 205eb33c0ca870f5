//! The Remote Client (C1): authenticated HTTP access to one ticketing
//! instance.

pub mod client;
pub mod wire;

pub use client::RemoteClient;
