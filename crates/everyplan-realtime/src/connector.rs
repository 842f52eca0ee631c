//! Transport seam for the event stream.
//!
//! [`EventConnector`] opens one stream connection and yields its frames.
//! The reconnection loop only ever talks to this trait, so tests can drive
//! it with a scripted connector and the production path uses
//! [`HttpConnector`].

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use reqwest::cookie::Jar;
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use tracing::debug;
use url::Url;

use crate::config::StreamAuth;
use crate::error::{RealtimeError, RealtimeResult};
use everyplan_session::SessionContext;

/// A boxed future type for object-safe async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Frames of one open connection. The stream ends when the server closes
/// the connection; an `Err` item means the connection broke.
pub type FrameStream = BoxStream<'static, RealtimeResult<SseFrame>>;

/// One server-sent event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseFrame {
    /// Event name; `message` when the server sent none.
    pub event: String,
    pub data: String,
    pub id: String,
}

impl SseFrame {
    /// Creates a named frame.
    pub fn new(event: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            data: data.into(),
            id: String::new(),
        }
    }
}

/// Where and how to connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    /// Full URL, including the token query parameter in query-token mode.
    pub url: Url,
    pub auth: StreamAuth,
}

/// Opens event stream connections.
pub trait EventConnector: Send + Sync + 'static {
    /// Opens a connection. Resolves once the server has accepted it, which
    /// is the moment the client reports the connection as open.
    fn connect<'a>(&'a self, request: &'a ConnectRequest)
    -> BoxFuture<'a, RealtimeResult<FrameStream>>;
}

impl<C: EventConnector + ?Sized> EventConnector for Arc<C> {
    fn connect<'a>(
        &'a self,
        request: &'a ConnectRequest,
    ) -> BoxFuture<'a, RealtimeResult<FrameStream>> {
        (**self).connect(request)
    }
}

/// `text/event-stream` over HTTP.
///
/// Query-token and session-cookie attempts go through separate clients:
/// only the session-cookie client carries the cookie jar, so a query-token
/// connection never sends the ambient session as well.
#[derive(Debug, Clone)]
pub struct HttpConnector {
    token_client: reqwest::Client,
    cookie_client: reqwest::Client,
}

impl HttpConnector {
    /// Wraps an HTTP client used for both modes. The client must not carry
    /// an overall request timeout, or it will cut long-lived streams, and
    /// must not carry a cookie store if query-token attempts are made.
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            token_client: http.clone(),
            cookie_client: http,
        }
    }

    /// Builds the streaming clients; the session-cookie one shares the
    /// session's cookie jar.
    pub fn for_session(ctx: &SessionContext) -> RealtimeResult<Self> {
        let connect_timeout = ctx.config().request_timeout;
        Ok(Self {
            token_client: streaming_client(None, connect_timeout)?,
            cookie_client: streaming_client(ctx.cookie_jar(), connect_timeout)?,
        })
    }

    fn client_for(&self, auth: StreamAuth) -> &reqwest::Client {
        match auth {
            StreamAuth::QueryToken => &self.token_client,
            StreamAuth::SessionCookie => &self.cookie_client,
        }
    }
}

fn streaming_client(
    jar: Option<Arc<Jar>>,
    connect_timeout: Duration,
) -> RealtimeResult<reqwest::Client> {
    let mut builder = reqwest::Client::builder().connect_timeout(connect_timeout);
    if let Some(jar) = jar {
        builder = builder.cookie_provider(jar);
    }
    builder
        .build()
        .map_err(|e| RealtimeError::config(format!("failed to create HTTP client: {}", e)))
}

impl EventConnector for HttpConnector {
    fn connect<'a>(
        &'a self,
        request: &'a ConnectRequest,
    ) -> BoxFuture<'a, RealtimeResult<FrameStream>> {
        Box::pin(async move {
            let response = self
                .client_for(request.auth)
                .get(request.url.clone())
                .header(ACCEPT, "text/event-stream")
                .header(CACHE_CONTROL, "no-cache")
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                return Err(RealtimeError::http(status.as_u16()));
            }
            debug!(status = status.as_u16(), auth = ?request.auth, "event stream accepted");

            let frames = response.bytes_stream().eventsource().map(|item| match item {
                Ok(event) => Ok(SseFrame {
                    event: event.event,
                    data: event.data,
                    id: event.id,
                }),
                Err(e) => Err(RealtimeError::transport(e.to_string())),
            });
            Ok(frames.boxed())
        })
    }
}
