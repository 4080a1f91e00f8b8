//! Traits implemented by the network layer.

mod authenticator;

pub use authenticator::Authenticator;
