//! The request primitive.

use std::sync::Arc;

use reqwest::Method;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, trace};

use mindrecord_core::error::{AuthError, Error, ProtocolError, TransportError};
use mindrecord_core::{ApiUrl, Result, SessionStore};

use crate::endpoints::ApiErrorResponse;

/// Form fields sent as `application/x-www-form-urlencoded`.
pub type FormBody = Vec<(String, String)>;

/// Everything that varies between API calls.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub path: String,
    pub method: Method,
    /// Attach the stored access token as a bearer credential.
    pub requires_auth: bool,
    pub body: Option<FormBody>,
    pub query: Vec<(String, String)>,
    /// Decode the response as JSON; otherwise return it as text.
    pub response_is_json: bool,
}

impl RequestSpec {
    /// An unauthenticated JSON request.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method,
            requires_auth: false,
            body: None,
            query: Vec::new(),
            response_is_json: true,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn authenticated(mut self) -> Self {
        self.requires_auth = true;
        self
    }

    pub fn form(mut self, body: FormBody) -> Self {
        self.body = Some(body);
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Return the response body as text instead of JSON.
    pub fn text(mut self) -> Self {
        self.response_is_json = false;
        self
    }
}

/// A successful response body.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(serde_json::Value),
    Text(String),
}

impl ResponseBody {
    /// Deserialize a JSON body into `T`.
    pub fn into_json<T: DeserializeOwned>(self) -> Result<T> {
        let value = match self {
            ResponseBody::Json(value) => value,
            ResponseBody::Text(text) => serde_json::from_str(&text).map_err(decode_error)?,
        };
        serde_json::from_value(value).map_err(decode_error)
    }

    /// The body as text; JSON bodies are re-serialized.
    pub fn into_text(self) -> String {
        match self {
            ResponseBody::Json(value) => value.to_string(),
            ResponseBody::Text(text) => text,
        }
    }
}

/// HTTP client for the mindrecord API.
///
/// Holds the [`SessionStore`] that authenticated requests read their bearer
/// token from.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base: ApiUrl,
    session: Arc<SessionStore>,
}

impl ApiClient {
    /// Create a client for the API at `base`.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the HTTP client cannot be built.
    pub fn new(base: ApiUrl, session: Arc<SessionStore>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("mindrecord/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(transport_error)?;

        Ok(Self {
            client,
            base,
            session,
        })
    }

    /// Returns the API base URL.
    pub fn base(&self) -> &ApiUrl {
        &self.base
    }

    /// Returns the session store.
    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// Issue one API call.
    ///
    /// For authenticated specs the stored access token is read before any
    /// network I/O; if there is none the call fails with
    /// [`AuthError::Unauthorized`] and nothing is sent.
    #[instrument(skip(self, spec), fields(api = %self.base, method = %spec.method, path = %spec.path))]
    pub async fn request(&self, spec: RequestSpec) -> Result<ResponseBody> {
        let url = self.base.endpoint(&spec.path);
        let mut builder = self.client.request(spec.method.clone(), &url);

        if spec.requires_auth {
            let token = self.session.access_token().ok_or(AuthError::Unauthorized)?;
            builder = builder.bearer_auth(token.as_str());
        }

        if !spec.query.is_empty() {
            builder = builder.query(&spec.query);
        }

        if let Some(ref form) = spec.body {
            trace!(fields = form.len(), "form body");
            builder = builder.form(form);
        }

        debug!(authenticated = spec.requires_auth, "API request");
        let response = builder.send().await.map_err(transport_error)?;

        self.handle_response(response, spec.response_is_json).await
    }

    /// Issue a JSON call and deserialize the body.
    pub async fn request_json<R: DeserializeOwned>(&self, spec: RequestSpec) -> Result<R> {
        self.request(spec).await?.into_json()
    }

    async fn handle_response(
        &self,
        response: reqwest::Response,
        json: bool,
    ) -> Result<ResponseBody> {
        let status = response.status();
        trace!(status = %status, "API response");

        if !status.is_success() {
            return Err(Error::Protocol(self.parse_error_response(response).await));
        }

        if json {
            let value = response.json().await.map_err(transport_error)?;
            Ok(ResponseBody::Json(value))
        } else {
            let text = response.text().await.map_err(transport_error)?;
            Ok(ResponseBody::Text(text))
        }
    }

    async fn parse_error_response(&self, response: reqwest::Response) -> ProtocolError {
        let status = response.status().as_u16();

        match response.json::<ApiErrorResponse>().await {
            Ok(body) => ProtocolError::new(status, body.error, body.message),
            Err(_) => ProtocolError::new(status, None, None),
        }
    }
}

pub(crate) fn transport_error(err: reqwest::Error) -> Error {
    let transport = if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_connect() {
        TransportError::Connection {
            message: err.to_string(),
        }
    } else {
        TransportError::Http {
            message: err.to_string(),
        }
    };
    Error::Transport(transport)
}

fn decode_error(err: serde_json::Error) -> Error {
    Error::Transport(TransportError::Http {
        message: format!("unexpected response body: {}", err),
    })
}
