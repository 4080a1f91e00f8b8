//! mindrecord-http - HTTP client for the mindrecord API.
//!
//! Every call goes through one request primitive, [`ApiClient::request`],
//! described by a [`RequestSpec`]. [`AuthClient`] builds the login, refresh
//! and logout flows on top of it and implements the core
//! [`Authenticator`](mindrecord_core::Authenticator) trait.

pub mod api;
mod auth;
mod client;
pub mod endpoints;

pub use auth::AuthClient;
pub use client::{ApiClient, FormBody, RequestSpec, ResponseBody};
