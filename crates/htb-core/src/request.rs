//! Outbound request construction.
//!
//! A [`RequestSpec`] describes one API call declaratively. It is assembled with
//! [`RequestSpecBuilder`], whose unset fields default to a `GET` with no query,
//! no body and no credentials, and is immutable afterwards.
//! [`RequestSpec::build`] turns it into a transport-ready [`reqwest::Request`]
//! without touching the network.

use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Body, Method, Request};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use url::Url;

use crate::error::{Error, Result};
use crate::paths::ApiPath;
use crate::query::QueryParams;

/// Media type used for request bodies and required on success responses.
pub const APPLICATION_JSON: &str = "application/json";

/// Declarative description of a single API request.
#[derive(Debug)]
pub struct RequestSpec {
    method: Method,
    path: ApiPath,
    query: QueryParams,
    body: Option<Body>,
    auth_token: Option<SecretString>,
    json: bool,
}

impl RequestSpec {
    /// Start describing a request to `path`.
    #[must_use]
    pub fn builder(path: ApiPath) -> RequestSpecBuilder {
        RequestSpecBuilder::new(path)
    }

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Target path.
    #[must_use]
    pub const fn path(&self) -> ApiPath {
        self.path
    }

    /// Query parameters.
    #[must_use]
    pub const fn query(&self) -> &QueryParams {
        &self.query
    }

    /// Returns true if the body is JSON.
    #[must_use]
    pub const fn is_json(&self) -> bool {
        self.json
    }

    /// Build the transport request against `host`.
    ///
    /// The body moves into the returned request and is dropped with it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedUrl`] if `host` and the path do not form a URL
    /// and [`Error::RequestConstructionFailed`] if the authorization header
    /// cannot be encoded.
    pub fn build(self, host: &str) -> Result<Request> {
        let raw = format!("{host}{}", self.path.as_str());
        let mut url = Url::parse(&raw).map_err(|source| Error::MalformedUrl { url: raw, source })?;

        if !self.query.is_empty() {
            url.set_query(Some(&self.query.encode()));
        }

        let mut request = Request::new(self.method, url);

        if let Some(token) = &self.auth_token {
            let token = token.expose_secret();
            if !token.is_empty() {
                let mut value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|err| {
                    Error::RequestConstructionFailed(format!("invalid authorization header: {err}"))
                })?;
                value.set_sensitive(true);
                request.headers_mut().insert(AUTHORIZATION, value);
            }
        }

        if self.json {
            request
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
        }

        *request.body_mut() = self.body;

        Ok(request)
    }
}

/// Builder for [`RequestSpec`].
#[derive(Debug)]
pub struct RequestSpecBuilder {
    spec: RequestSpec,
}

impl RequestSpecBuilder {
    /// Create a builder with defaults: `GET`, empty query, no body, no token.
    #[must_use]
    pub fn new(path: ApiPath) -> Self {
        Self {
            spec: RequestSpec {
                method: Method::GET,
                path,
                query: QueryParams::new(),
                body: None,
                auth_token: None,
                json: false,
            },
        }
    }

    /// Override the HTTP method.
    #[must_use]
    pub fn with_method(mut self, method: Method) -> Self {
        self.spec.method = method;
        self
    }

    /// Replace the query parameters.
    #[must_use]
    pub fn with_query(mut self, query: QueryParams) -> Self {
        self.spec.query = query;
        self
    }

    /// Attach a bearer token. Empty tokens are ignored when building.
    #[must_use]
    pub fn with_auth_token(mut self, token: SecretString) -> Self {
        self.spec.auth_token = Some(token);
        self
    }

    /// Attach an opaque body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.spec.body = Some(body.into());
        self.spec.json = false;
        self
    }

    /// Attach a JSON body and mark the request as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RequestConstructionFailed`] if `payload` cannot be serialized.
    pub fn with_json_body<T>(mut self, payload: &T) -> Result<Self>
    where
        T: Serialize + ?Sized,
    {
        let bytes = serde_json::to_vec(payload).map_err(|err| {
            Error::RequestConstructionFailed(format!("failed to serialize request body: {err}"))
        })?;
        self.spec.body = Some(Body::from(bytes));
        self.spec.json = true;
        Ok(self)
    }

    /// Finish the description.
    #[must_use]
    pub fn build(self) -> RequestSpec {
        self.spec
    }
}
