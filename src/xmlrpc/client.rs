// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

use std::fmt;
use std::io::Read;

use reqwest::blocking::{Body, Client as HttpClient};
use reqwest::header::CONTENT_TYPE;
use url::Url;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::xmlrpc::progress::ProgressReader;

/// Handler path used when the URL has none.
pub const DEFAULT_PATH: &str = "/RPC2";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

/// Where calls are sent. Only `http` and `https` URLs can be represented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    scheme: Scheme,
    host: String,
    path: String,
}

impl Endpoint {
    pub fn parse(url: &str) -> Result<Endpoint> {
        let trimmed = url.trim();
        let parsed = Url::parse(trimmed)
            .map_err(|err| Error::Config(format!("malformed URL {:?}: {}", url, err)))?;

        let scheme = match parsed.scheme() {
            "http" => Scheme::Http,
            "https" => Scheme::Https,
            other => {
                return Err(Error::Config(format!("unsupported XML-RPC protocol: {}", other)))
            }
        };

        let host = match (parsed.host_str(), parsed.port()) {
            (None, _) | (Some(""), _) => {
                return Err(Error::Config(format!("malformed URL {:?}: no host", url)))
            }
            (Some(host), None) => host.to_string(),
            (Some(host), Some(port)) => format!("{}:{}", host, port),
        };

        // `Url` normalizes a missing path to "/"; only an absent one gets the default.
        let explicit_path = trimmed
            .split_once("://")
            .and_then(|(_, rest)| rest.split(['?', '#']).next())
            .is_some_and(|authority_and_path| authority_and_path.contains('/'));
        let path = match parsed.query() {
            Some(query) => format!("{}?{}", parsed.path(), query),
            None if explicit_path => parsed.path().to_string(),
            None => DEFAULT_PATH.to_string(),
        };

        Ok(Endpoint { scheme, host, path })
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// Host name, including the port when one was given.
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn url(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}://{}{}", self.scheme.as_str(), self.host, self.path)
    }
}

/// A serialized request body, optionally observed while it is written.
#[derive(Debug)]
pub enum Payload {
    Plain(Vec<u8>),
    Instrumented(ProgressReader),
}

impl Payload {
    pub fn len(&self) -> u64 {
        match *self {
            Payload::Plain(ref body) => body.len() as u64,
            Payload::Instrumented(ref reader) => reader.total_len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drains the payload into memory, notifying any observer on the way.
    pub fn into_bytes(self) -> std::io::Result<Vec<u8>> {
        match self {
            Payload::Plain(body) => Ok(body),
            Payload::Instrumented(mut reader) => {
                let mut body = Vec::with_capacity(reader.total_len() as usize);
                reader.read_to_end(&mut body)?;
                Ok(body)
            }
        }
    }
}

/// Moves one request body to the server and brings back the response body.
pub trait Transport {
    fn send(&mut self, endpoint: &Endpoint, payload: Payload) -> Result<Vec<u8>>;

    /// Releases the connection. Safe to call repeatedly or not at all.
    fn close(&mut self);
}

/// Blocking HTTP(S) transport. The connection is opened on first use and
/// reused for later calls until [`close`](Transport::close).
pub struct HttpTransport {
    config: Config,
    http_client: Option<(Scheme, HttpClient)>,
}

impl HttpTransport {
    pub fn new(config: Config) -> HttpTransport {
        HttpTransport { config, http_client: None }
    }

    pub fn is_open(&self) -> bool {
        self.http_client.is_some()
    }

    /// Opens a client for `scheme` unless one is already open for it.
    pub fn open(&mut self, scheme: Scheme) -> Result<&HttpClient> {
        let client = match self.http_client.take() {
            Some((open, client)) if open == scheme => client,
            _ => {
                let mut builder = HttpClient::builder()
                    .user_agent(self.config.user_agent.clone())
                    .timeout(self.config.timeout);
                if let Some(timeout) = self.config.timeout {
                    builder = builder.connect_timeout(timeout);
                }
                if !self.config.system_proxy {
                    builder = builder.no_proxy();
                }
                // A TLS endpoint must never be downgraded by a redirect.
                if scheme == Scheme::Https {
                    builder = builder.https_only(true);
                }
                debug!("Open {} connection", scheme.as_str());
                builder.build()?
            }
        };
        Ok(&self.http_client.insert((scheme, client)).1)
    }
}

impl Default for HttpTransport {
    fn default() -> HttpTransport {
        HttpTransport::new(Config::default())
    }
}

impl Transport for HttpTransport {
    fn send(&mut self, endpoint: &Endpoint, payload: Payload) -> Result<Vec<u8>> {
        let url = endpoint.url();
        let length = payload.len();
        let body = match payload {
            Payload::Plain(bytes) => Body::from(bytes),
            Payload::Instrumented(reader) => Body::sized(reader, length),
        };

        debug!("Send XMLRPC request to: {} ({} bytes)", url, length);

        let client = self.open(endpoint.scheme())?;
        let response = client.post(&url).header(CONTENT_TYPE, "text/xml").body(body).send()?;

        let status = response.status();
        if !status.is_success() {
            debug!("XMLRPC endpoint {} answered {}", url, status);
            return Err(Error::HttpStatus { status: status.as_u16(), url });
        }

        let body = response.bytes()?.to_vec();
        trace!("Response body: {}", String::from_utf8_lossy(&body));
        Ok(body)
    }

    fn close(&mut self) {
        if self.http_client.take().is_some() {
            debug!("Close connection");
        }
    }
}

impl Drop for HttpTransport {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("config", &self.config)
            .field("open", &self.http_client.as_ref().map(|(scheme, _)| scheme))
            .finish()
    }
}
