//! Remote authentication trait.

use async_trait::async_trait;

use crate::session::{SessionData, SessionStore};
use crate::{Credentials, Result};

/// Performs logins against the remote API and records the outcome in a
/// [`SessionStore`].
///
/// [`AppState`](crate::AppState) drives every state transition through this
/// trait, which keeps the state machine independent of the HTTP client.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// The session store logins are persisted to.
    fn session(&self) -> &SessionStore;

    /// Obtain and persist a token pair without credentials.
    async fn login_anonymous(&self) -> Result<SessionData>;

    /// Obtain and persist a token pair for an email/password account.
    async fn login_with_credentials(&self, credentials: &Credentials) -> Result<SessionData>;

    /// Exchange the stored refresh token for a new token pair.
    async fn refresh_session(&self) -> Result<SessionData>;

    /// Forget the stored session.
    fn logout(&self) {
        self.session().clear_session();
    }
}
