mod client;

pub use client::{RemoteCommand, RemoteHost};
