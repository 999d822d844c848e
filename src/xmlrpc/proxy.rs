//! Calls remote methods by name.
//!
//! [`ServerProxy::invoke`] is the whole pipeline: encode, send, decode. Method
//! names are never checked locally; a misspelled name comes back from the
//! server as a fault. Accessors for the proxy itself (`endpoint`, `transport`,
//! `close`) are ordinary methods and so cannot clash with remote names, which
//! are plain strings.

use std::fmt;

use crate::config::{Config, Encoding};
use crate::error::Result;
use crate::xmlrpc::client::{Endpoint, HttpTransport, Payload, Transport};
use crate::xmlrpc::encoding::{self, Value};
use crate::xmlrpc::progress::ProgressReader;
use crate::xmlrpc::protocol::Response;

/// Builds an argument list, converting every element into a [`Value`].
#[macro_export]
macro_rules! params {
    () => (Vec::<$crate::xmlrpc::Value>::new());
    ($($arg:expr),+ $(,)?) => (vec![$($crate::xmlrpc::Value::from($arg)),+]);
}

pub struct ServerProxy<T: Transport = HttpTransport> {
    endpoint: Endpoint,
    transport: T,
    encoding: Encoding,
}

/// A remote method bound to its proxy. Created fresh for every lookup.
pub struct Method<'a, T: Transport> {
    proxy: &'a mut ServerProxy<T>,
    name: String,
}

impl ServerProxy<HttpTransport> {
    /// Validates `url` before any transport is created.
    pub fn new(url: &str, config: Config) -> Result<ServerProxy<HttpTransport>> {
        let endpoint = Endpoint::parse(url)?;
        let encoding = config.encoding;
        Ok(ServerProxy::with_transport(endpoint, HttpTransport::new(config), encoding))
    }
}

impl<T: Transport> ServerProxy<T> {
    pub fn with_transport(endpoint: Endpoint, transport: T, encoding: Encoding) -> ServerProxy<T> {
        ServerProxy { endpoint, transport, encoding }
    }

    pub fn invoke(&mut self, method: &str, params: Vec<Value>) -> Result<Value> {
        let body = encoding::encode_call(method, &params, self.encoding);
        self.request(method, Payload::Plain(body))
    }

    /// Like [`invoke`](ServerProxy::invoke), reporting `(total, chunk)` to
    /// `callback` as the request body is written.
    pub fn invoke_with_progress<F>(
        &mut self,
        method: &str,
        params: Vec<Value>,
        callback: F,
    ) -> Result<Value>
    where
        F: FnMut(u64, u64) + Send + 'static,
    {
        let body = encoding::encode_call(method, &params, self.encoding);
        self.request(method, Payload::Instrumented(ProgressReader::with_callback(body, callback)))
    }

    fn request(&mut self, method: &str, payload: Payload) -> Result<Value> {
        debug!("Call {} on {}", method, self.endpoint);

        let body = self.transport.send(&self.endpoint, payload)?;
        let value = Response::decode(&body)?.into_result()?;

        trace!("{} returned {}", method, value.kind());
        Ok(value)
    }

    pub fn method(&mut self, name: &str) -> Method<'_, T> {
        Method { proxy: self, name: name.to_string() }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn close(&mut self) {
        self.transport.close();
    }
}

impl<T: Transport> fmt::Debug for ServerProxy<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<ServerProxy for {}{}>", self.endpoint.host(), self.endpoint.path())
    }
}

impl<'a, T: Transport> Method<'a, T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(self, params: Vec<Value>) -> Result<Value> {
        self.proxy.invoke(&self.name, params)
    }

    pub fn call_with_progress<F>(self, params: Vec<Value>, callback: F) -> Result<Value>
    where
        F: FnMut(u64, u64) + Send + 'static,
    {
        self.proxy.invoke_with_progress(&self.name, params, callback)
    }
}
