//! Response interpretation.
//!
//! Every operation funnels its request through [`ResponseInterpreter`], which
//! sends it under the caller's [`RequestContext`], classifies the status code,
//! enforces the JSON content type and decodes the operation's envelope.
//!
//! The envelope discriminator is not self-describing on the wire: listing
//! endpoints wrap their payload as `{"data": ...}`, singleton endpoints as
//! `{"info": ...}`, and failures as `{"message": ...}`. Callers pick the
//! envelope type per operation.

use std::sync::Arc;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Request, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::request::APPLICATION_JSON;
use crate::transport::{HttpTransport, RequestContext};

/// Envelope shape wrapping a success payload.
pub trait Envelope: DeserializeOwned {
    /// Payload carried by the envelope.
    type Payload;

    /// Unwrap the payload. `None` when the server sent `null` or omitted the key.
    fn into_payload(self) -> Option<Self::Payload>;
}

/// `{"data": T}` envelope used by listing endpoints.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct DataEnvelope<T> {
    /// Wrapped payload.
    pub data: Option<T>,
}

impl<T> Envelope for DataEnvelope<T>
where
    T: DeserializeOwned,
{
    type Payload = T;

    fn into_payload(self) -> Option<T> {
        self.data
    }
}

/// `{"info": T}` envelope used by current-singleton endpoints.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct InfoEnvelope<T> {
    /// Wrapped payload.
    pub info: Option<T>,
}

impl<T> Envelope for InfoEnvelope<T>
where
    T: DeserializeOwned,
{
    type Payload = T;

    fn into_payload(self) -> Option<T> {
        self.info
    }
}

/// `{"message": "..."}` envelope sent with failure statuses.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct MessageEnvelope {
    /// Server supplied message. The key is required; `null` reads as empty.
    #[serde(deserialize_with = "Option::deserialize")]
    pub message: Option<String>,
}

/// Sends requests and turns responses into payloads or classified errors.
#[derive(Clone)]
pub struct ResponseInterpreter {
    transport: Arc<dyn HttpTransport>,
    context: RequestContext,
}

impl std::fmt::Debug for ResponseInterpreter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseInterpreter")
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

impl ResponseInterpreter {
    /// Create an interpreter over `transport` bound to `context`.
    #[must_use]
    pub fn new(transport: Arc<dyn HttpTransport>, context: RequestContext) -> Self {
        Self { transport, context }
    }

    /// Same transport, different context.
    #[must_use]
    pub fn with_context(&self, context: RequestContext) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            context,
        }
    }

    /// Context requests are bound to.
    #[must_use]
    pub const fn context(&self) -> &RequestContext {
        &self.context
    }

    /// Send `request` and require a success status. The body is not inspected.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TransportFailure`] when sending fails and
    /// [`Error::ApiError`] or [`Error::UnexpectedStatusCode`] for failure statuses.
    pub async fn execute(&self, request: Request) -> Result<()> {
        self.send(request).await.map(drop)
    }

    /// Send `request` and decode the envelope `E`, returning its payload.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`ResponseInterpreter::execute`], plus
    /// [`Error::UnexpectedContentType`] when the success body is not
    /// `application/json` and [`Error::DecodeError`] when it does not decode as `E`.
    pub async fn fetch<E>(&self, request: Request) -> Result<Option<E::Payload>>
    where
        E: Envelope,
    {
        let response = self.send(request).await?;
        require_json(&response)?;

        let body = self.context.run(response.bytes()).await?;
        let envelope: E = serde_json::from_slice(&body)?;
        Ok(envelope.into_payload())
    }

    async fn send(&self, request: Request) -> Result<Response> {
        let method = request.method().clone();
        let path = request.url().path().to_owned();
        info!(%method, path = %path, "HTB request");

        let response = self.context.run(self.transport.execute(request)).await?;
        let status = response.status();
        debug!(%method, path = %path, status = status.as_u16(), "HTB response");

        if status.as_u16() >= 300 {
            return Err(self.classify_failure(status, response).await);
        }

        Ok(response)
    }

    async fn classify_failure(&self, status: StatusCode, response: Response) -> Error {
        let code = status.as_u16();
        let message = match self.context.run(response.bytes()).await {
            Ok(body) => serde_json::from_slice::<MessageEnvelope>(&body)
                .ok()
                .map(|envelope| envelope.message.unwrap_or_default()),
            Err(_) => None,
        };

        match message {
            Some(message) => {
                warn!(status = code, api_message = %message, "HTB API error");
                Error::ApiError {
                    status: code,
                    message,
                }
            }
            None => {
                warn!(status = code, "HTB request failed without an error message");
                Error::UnexpectedStatusCode { status: code }
            }
        }
    }
}

fn require_json(response: &Response) -> Result<()> {
    let actual = response
        .headers()
        .get(CONTENT_TYPE)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
        .unwrap_or_default();

    if actual == APPLICATION_JSON {
        Ok(())
    } else {
        Err(Error::UnexpectedContentType {
            expected: APPLICATION_JSON.to_string(),
            actual,
        })
    }
}
