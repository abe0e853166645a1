use std::collections::BTreeMap;

use crate::event::{Event, Notifier};

/// Socket-style requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketRequest {
    ConnectOnly { url: String },
    /// Connects, then sends `data` once the connection is open.
    Open { url: String, data: Vec<u8> },
    Send { url: String, data: Vec<u8> },
    Close { url: String },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method:  HttpMethod,
    pub url:     String,
    pub headers: BTreeMap<String, String>,
    pub body:    Vec<u8>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            headers: BTreeMap::new(),
            body: Vec::new(),
        }
    }

    pub fn post(url: impl Into<String>, body: Vec<u8>) -> Self {
        Self { method: HttpMethod::Post, body, ..Self::get(url) }
    }
}

/// Network requests. Routed as immediate events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkRequest {
    Socket(SocketRequest),
    Http(HttpRequest),
}

/// Network results. Routed as queued events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkNotice {
    Open { url: String },
    Receive { url: String, data: Vec<u8> },
    Error { url: String, reason: String },
    Close { url: String },
    HttpResponse {
        url:     String,
        status:  u16,
        headers: BTreeMap<String, String>,
        body:    Vec<u8>,
    },
    HttpError { url: String, reason: String },
}

/// Socket/HTTP client.
///
/// `send` must not block; completions are reported later through
/// `notifier`, possibly from another thread.
pub trait NetworkTransport {
    fn send(&mut self, request: NetworkRequest, notifier: Notifier);
}

/// Transport used when none is configured: every request fails.
#[derive(Debug, Default)]
pub struct NullTransport;

impl NetworkTransport for NullTransport {
    fn send(&mut self, request: NetworkRequest, notifier: Notifier) {
        let reason = "no network transport configured".to_string();
        let notice = match request {
            NetworkRequest::Socket(
                SocketRequest::ConnectOnly { url }
                | SocketRequest::Open { url, .. }
                | SocketRequest::Send { url, .. }
                | SocketRequest::Close { url },
            ) => NetworkNotice::Error { url, reason },
            NetworkRequest::Http(req) => NetworkNotice::HttpError { url: req.url, reason },
        };
        notifier.notify(Event::NetworkNotice(notice));
    }
}
