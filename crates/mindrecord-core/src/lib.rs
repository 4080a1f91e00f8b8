//! mindrecord-core - Session and navigation core for the mindrecord client.
//!
//! This crate holds everything about authentication state that does not
//! touch the network: token decoding, the durable session store, the
//! observable [`AppState`] container and the [`RouteGuard`]. Remote calls are
//! reached through the [`Authenticator`] trait, implemented by
//! `mindrecord-http`.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use mindrecord_core::{Claims, MemoryStore, SessionStore, token};
//!
//! let claims = Claims::new().with("sub", "u1").with("role", "admin");
//! let access = token::encode_unsigned(&claims);
//! let refresh = token::encode_unsigned(&Claims::new().with("kind", "refresh"));
//!
//! let session = SessionStore::new(Arc::new(MemoryStore::new()));
//! session.save_session(&access, &refresh).unwrap();
//! assert!(session.current_user().unwrap().is_admin());
//! ```

pub mod credentials;
pub mod error;
pub mod route;
pub mod session;
pub mod state;
pub mod storage;
pub mod token;
pub mod traits;
pub mod types;

pub use credentials::Credentials;
pub use error::Error;
pub use route::{Navigation, Route, RouteGuard, RouteMatch, RouteTable};
pub use session::{SessionData, SessionStore};
pub use state::{AppState, AuthSnapshot, AuthStatus};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use token::{AccessToken, Claims, RefreshToken, Role};
pub use traits::Authenticator;
pub use types::ApiUrl;

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;
