// src/preview/proxy.rs

//! Reverse proxy in front of the local WordPress site.
//!
//! Every request is forwarded to the upstream URL. HTML responses get a
//! small client script injected that connects to the reload hub.

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::errors::{Result, RigError};

/// Largest request body forwarded upstream.
const MAX_BODY: usize = 16 * 1024 * 1024;

#[derive(Debug)]
struct ProxyState {
    client: reqwest::Client,
    upstream: String,
    hub_port: u16,
}

/// Script injected into proxied HTML pages.
pub fn reload_script(hub_port: u16) -> String {
    format!(
        "<script>(function(){{var s=new WebSocket(\"ws://\"+location.hostname+\":{hub_port}\");\
s.onmessage=function(e){{if(e.data===\"reload\"){{location.reload();}}}};}})();</script>"
    )
}

/// Insert the reload script before the last `</body>`, or append it.
pub fn inject_script(html: &str, hub_port: u16) -> String {
    let script = reload_script(hub_port);
    match html.rfind("</body>") {
        Some(idx) => format!("{}{}{}", &html[..idx], script, &html[idx..]),
        None => format!("{html}{script}"),
    }
}

/// Bind the proxy on `port` and serve it on the current runtime.
pub async fn spawn_proxy(port: u16, upstream: &str, hub_port: u16) -> Result<u16> {
    let listener = TcpListener::bind(("127.0.0.1", port))
        .await
        .map_err(|source| RigError::PreviewBind { port, source })?;
    let bound = listener.local_addr().map(|a| a.port()).unwrap_or(port);

    let state = Arc::new(ProxyState {
        client: reqwest::Client::new(),
        upstream: upstream.trim_end_matches('/').to_string(),
        hub_port,
    });
    let app = Router::new().fallback(forward).with_state(state);

    info!(port = bound, upstream = %upstream, "live preview proxy listening");
    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            warn!(error = %err, "live preview proxy stopped");
        }
    });
    Ok(bound)
}

fn bad_gateway(message: String) -> Response {
    (StatusCode::BAD_GATEWAY, message).into_response()
}

async fn forward(State(state): State<Arc<ProxyState>>, req: Request) -> Response {
    let (parts, body) = req.into_parts();
    let path = parts
        .uri
        .path_and_query()
        .map(|p| p.as_str())
        .unwrap_or("/");
    let url = format!("{}{}", state.upstream, path);
    debug!(method = %parts.method, url = %url, "proxying request");

    let body = match to_bytes(body, MAX_BODY).await {
        Ok(b) => b,
        Err(err) => return bad_gateway(format!("reading request body: {err}")),
    };

    let mut headers = parts.headers.clone();
    headers.remove(header::HOST);
    // Ask for an identity encoding so HTML can be rewritten.
    headers.remove(header::ACCEPT_ENCODING);

    let upstream = state
        .client
        .request(parts.method.clone(), &url)
        .headers(headers)
        .body(body)
        .send()
        .await;

    let upstream = match upstream {
        Ok(r) => r,
        Err(err) => return bad_gateway(format!("upstream {url} unreachable: {err}")),
    };

    let status = upstream.status();
    let mut headers: HeaderMap = upstream.headers().clone();
    let is_html = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("text/html"));

    let bytes = match upstream.bytes().await {
        Ok(b) => b,
        Err(err) => return bad_gateway(format!("reading upstream body: {err}")),
    };

    let body = if is_html {
        headers.remove(header::CONTENT_LENGTH);
        headers.remove(header::TRANSFER_ENCODING);
        Body::from(inject_script(&String::from_utf8_lossy(&bytes), state.hub_port))
    } else {
        Body::from(bytes)
    };

    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}
