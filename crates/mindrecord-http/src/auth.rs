//! Login, refresh and logout against `/auth`.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use tracing::{debug, info, instrument, warn};

use mindrecord_core::error::{AuthError, Error};
use mindrecord_core::{
    AccessToken, ApiUrl, Authenticator, Credentials, RefreshToken, Result, SessionData,
    SessionStore,
};

use crate::client::{ApiClient, FormBody, RequestSpec, ResponseBody};
use crate::endpoints::{AUTH, TokenResponse};

/// Authentication client for the mindrecord API.
///
/// Every successful login is persisted through the [`SessionStore`] before
/// it is returned, so a caller never sees a [`SessionData`] that is not also
/// in storage.
#[derive(Debug, Clone)]
pub struct AuthClient {
    api: ApiClient,
}

impl AuthClient {
    /// Create a client for the API at `base`, persisting sessions to `session`.
    pub fn new(base: ApiUrl, session: Arc<SessionStore>) -> Result<Self> {
        Ok(Self::from_api(ApiClient::new(base, session)?))
    }

    /// Wrap an existing [`ApiClient`].
    pub fn from_api(api: ApiClient) -> Self {
        Self { api }
    }

    /// The underlying request client.
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Log in without credentials.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidAuthorizationData`] if the server answers
    /// with anything but a well-formed token pair; nothing is stored then.
    #[instrument(skip(self), fields(api = %self.api.base()))]
    pub async fn login_anonymous(&self) -> Result<SessionData> {
        info!("Anonymous login");
        self.authenticate(None).await
    }

    /// Log in with email and password, sent as form fields.
    #[instrument(skip_all, fields(api = %self.api.base(), email = %credentials.email()))]
    pub async fn login_with_credentials(&self, credentials: &Credentials) -> Result<SessionData> {
        info!("Credential login");
        let form = vec![
            ("email".to_string(), credentials.email().to_string()),
            ("password".to_string(), credentials.password().to_string()),
        ];
        self.authenticate(Some(form)).await
    }

    /// Exchange the stored refresh token for a new pair.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Unauthorized`] without any network call if no
    /// refresh token is stored.
    #[instrument(skip(self), fields(api = %self.api.base()))]
    pub async fn refresh_session(&self) -> Result<SessionData> {
        let refresh = self
            .api
            .session()
            .refresh_token()
            .ok_or(AuthError::Unauthorized)?;

        info!("Refreshing session");
        let form = vec![("refresh_token".to_string(), refresh.as_str().to_string())];
        self.authenticate(Some(form)).await
    }

    /// Forget the stored session.
    pub fn logout(&self) {
        info!("Logging out");
        self.api.session().clear_session();
    }

    /// Call `path` with the stored access token as bearer credential and
    /// decode the response as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Unauthorized`] before any network I/O if no access
    /// token is stored.
    pub async fn authorized_request(
        &self,
        path: &str,
        method: Method,
        body: Option<FormBody>,
    ) -> Result<ResponseBody> {
        let mut spec = RequestSpec::new(method, path).authenticated();
        spec.body = body;
        self.api.request(spec).await
    }

    async fn authenticate(&self, form: Option<FormBody>) -> Result<SessionData> {
        let mut spec = RequestSpec::post(AUTH).text();
        spec.body = form;

        let body = self.api.request(spec).await?.into_text();
        let response: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            warn!(error = %e, "Login response is not JSON");
            AuthError::InvalidAuthorizationData
        })?;

        self.save_tokens(response)
    }

    fn save_tokens(&self, response: TokenResponse) -> Result<SessionData> {
        let (Some(access), Some(refresh)) = (response.access_token, response.refresh_token) else {
            warn!("Login response is missing a token");
            return Err(AuthError::InvalidAuthorizationData.into());
        };

        match self.api.session().save_session(&access, &refresh) {
            Ok(()) => {}
            Err(Error::Session(_)) => return Err(AuthError::InvalidAuthorizationData.into()),
            Err(e) => return Err(e),
        }

        debug!("Session stored");
        Ok(SessionData {
            access_token: AccessToken::new(access),
            refresh_token: RefreshToken::new(refresh),
            access_token_expiration: response.access_token_expiration,
            refresh_token_expiration: response.refresh_token_expiration,
        })
    }
}

#[async_trait]
impl Authenticator for AuthClient {
    fn session(&self) -> &SessionStore {
        self.api.session()
    }

    async fn login_anonymous(&self) -> Result<SessionData> {
        AuthClient::login_anonymous(self).await
    }

    async fn login_with_credentials(&self, credentials: &Credentials) -> Result<SessionData> {
        AuthClient::login_with_credentials(self, credentials).await
    }

    async fn refresh_session(&self) -> Result<SessionData> {
        AuthClient::refresh_session(self).await
    }

    fn logout(&self) {
        AuthClient::logout(self);
    }
}
