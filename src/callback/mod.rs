//! Local listener that captures the OAuth authorization-code redirect so an
//! operator can finish acquiring a Basis token by hand.

use crate::error::{AppError, Result};
use quick_xml::escape::escape;
use std::net::SocketAddr;
use tiny_http::{Header, Method, Request, Response, Server};
use tracing::{debug, info, instrument, warn};
use url::Url;

pub const DEFAULT_PORT: u16 = 8080;

const HTML: &str = "text/html; charset=utf-8";
const PLAIN: &str = "text/plain; charset=utf-8";

/// The code and state carried by a successful redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationGrant {
    pub code: String,
    pub state: Option<String>,
}

/// Response to a callback request, plus the grant it captured, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackReply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
    pub grant: Option<AuthorizationGrant>,
}

impl CallbackReply {
    fn html(body: String) -> Self {
        Self {
            status: 200,
            content_type: HTML,
            body,
            grant: None,
        }
    }

    fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: PLAIN,
            body: body.to_string(),
            grant: None,
        }
    }
}

/// Decide the reply for a redirect to `path` (path plus query string).
///
/// An `error` parameter wins over `code`. When `expected_state` is given, a
/// code whose `state` differs is rejected and not captured.
pub fn handle_callback(path: &str, expected_state: Option<&str>) -> CallbackReply {
    let Ok(url) = Url::parse(&format!("http://localhost{}", path)) else {
        return CallbackReply::text(400, "Malformed callback URL.");
    };
    // Blank values count as absent.
    let param = |name: &str| {
        url.query_pairs()
            .find(|(key, value)| key == name && !value.is_empty())
            .map(|(_, value)| value.into_owned())
    };

    if let Some(error) = param("error") {
        return CallbackReply::html(format!("<h1>OAuth Error: {}</h1>", escape(error.as_str())));
    }

    let Some(code) = param("code") else {
        return CallbackReply::text(400, "Missing 'code' parameter.");
    };
    let state = param("state");

    if expected_state.is_some_and(|expected| state.as_deref() != Some(expected)) {
        return CallbackReply::text(400, "State mismatch.");
    }

    CallbackReply {
        grant: Some(AuthorizationGrant { code, state }),
        ..CallbackReply::html(
            "<h1>OAuth Callback Received!</h1><p>Check your terminal for the authorization code.</p>"
                .to_string(),
        )
    }
}

pub struct CallbackListener {
    server: Server,
    expected_state: Option<String>,
}

impl CallbackListener {
    pub fn bind(addr: SocketAddr, expected_state: Option<String>) -> Result<Self> {
        let server = Server::http(addr)
            .map_err(|e| AppError::Callback(format!("Failed to bind to {}: {}", addr, e)))?;

        Ok(Self {
            server,
            expected_state,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.server
            .server_addr()
            .to_ip()
            .ok_or_else(|| AppError::Callback("Listener has no IP address".to_string()))
    }

    /// Answer a single request.
    pub fn handle_next(&self) -> Result<Option<AuthorizationGrant>> {
        let request = self.recv()?;
        self.respond(request)
    }

    /// Answer requests until the process is stopped. Capturing a code does
    /// not stop the listener.
    pub fn serve(&self) -> Result<()> {
        loop {
            let request = self.recv()?;
            if let Err(e) = self.respond(request) {
                warn!(error = %e, "Failed to answer callback request");
            }
        }
    }

    fn recv(&self) -> Result<Request> {
        self.server
            .recv()
            .map_err(|e| AppError::Callback(format!("Failed to receive request: {}", e)))
    }

    #[instrument(name = "Callback", skip_all, fields(method = %request.method()))]
    fn respond(&self, request: Request) -> Result<Option<AuthorizationGrant>> {
        let reply = if *request.method() == Method::Get {
            handle_callback(request.url(), self.expected_state.as_deref())
        } else {
            CallbackReply::text(405, "Method not allowed.")
        };
        info!(status = reply.status, "Callback request");

        if let Some(grant) = &reply.grant {
            println!("Authorization Code: {}", grant.code);
            println!("State: {}", grant.state.as_deref().unwrap_or(""));
        }

        let header = Header::from_bytes(&b"Content-Type"[..], reply.content_type.as_bytes())
            .map_err(|_| AppError::Callback("Invalid Content-Type header".to_string()))?;
        let response = Response::from_string(reply.body)
            .with_status_code(reply.status)
            .with_header(header);
        request
            .respond(response)
            .map_err(|e| AppError::Callback(format!("Failed to send response: {}", e)))?;
        debug!("Response sent");

        Ok(reply.grant)
    }
}
