//! Forwarding of screened requests to the protected application.
//!
//! # Responsibilities
//! - Rewrite the URI to the upstream authority
//! - Forward method, headers (including `x-request-id`) and body
//! - Map transport failures to 502 and timeouts to 504

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    body::Body,
    http::{
        uri::{Authority, PathAndQuery, Scheme},
        Request, StatusCode, Uri,
    },
    response::{IntoResponse, Response},
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("invalid upstream address '{0}'")]
    InvalidAddress(String),
}

/// HTTP client bound to a single upstream.
#[derive(Debug, Clone)]
pub struct Upstream {
    client: Client<HttpConnector, Body>,
    authority: Authority,
    timeout: Duration,
}

impl Upstream {
    pub fn new(address: &str, timeout: Duration) -> Result<Self, UpstreamError> {
        let addr: SocketAddr = address
            .parse()
            .map_err(|_| UpstreamError::InvalidAddress(address.to_string()))?;
        let authority: Authority = addr
            .to_string()
            .parse()
            .map_err(|_| UpstreamError::InvalidAddress(address.to_string()))?;

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        Ok(Self {
            client,
            authority,
            timeout,
        })
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// Send `request` upstream and relay the response.
    pub async fn forward(&self, request: Request<Body>) -> Response {
        let (mut parts, body) = request.into_parts();

        let mut uri_parts = parts.uri.clone().into_parts();
        uri_parts.scheme = Some(Scheme::HTTP);
        uri_parts.authority = Some(self.authority.clone());
        if uri_parts.path_and_query.is_none() {
            uri_parts.path_and_query = Some(PathAndQuery::from_static("/"));
        }
        parts.uri = match Uri::from_parts(uri_parts) {
            Ok(uri) => uri,
            Err(e) => {
                tracing::warn!(error = %e, "Could not build upstream URI");
                return (StatusCode::BAD_REQUEST, "Invalid request URI").into_response();
            }
        };

        let path = parts.uri.path().to_string();
        let request = Request::from_parts(parts, body);

        match tokio::time::timeout(self.timeout, self.client.request(request)).await {
            Ok(Ok(response)) => {
                let (parts, body) = response.into_parts();
                Response::from_parts(parts, Body::new(body))
            }
            Ok(Err(e)) => {
                tracing::error!(upstream = %self.authority, path = %path, error = %e, "Upstream error");
                (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
            }
            Err(_) => {
                tracing::error!(upstream = %self.authority, path = %path, timeout = ?self.timeout, "Upstream timed out");
                (StatusCode::GATEWAY_TIMEOUT, "Upstream timed out").into_response()
            }
        }
    }
}
