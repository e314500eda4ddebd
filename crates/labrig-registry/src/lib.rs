pub mod client;
pub mod transport;
pub mod version;

pub use client::RegistryClient;
pub use transport::{HttpTransport, RegistryTransport, TagLookup, TransportError};
pub use version::{resolve_version, validate_format, validate_version};
