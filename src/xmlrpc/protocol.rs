// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

use thiserror::Error as ThisError;

use crate::config::Encoding;
use crate::xmlrpc::encoding::{self, DecodeError, Value};

/// A method name and its positional arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    pub method: String,
    pub params: Vec<Value>,
}

/// Application-level error carried inside a well-formed response.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
#[error("<Fault {code}: '{message}'>")]
pub struct Fault {
    code: i32,
    message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Success(Vec<Value>),
    Fault(Fault),
}

impl MethodCall {
    pub fn new(method: &str) -> MethodCall {
        MethodCall { method: method.to_string(), params: Vec::new() }
    }

    pub fn argument<T: Into<Value>>(mut self, object: T) -> MethodCall {
        self.params.push(object.into());
        self
    }

    pub fn encode(&self, encoding: Encoding) -> Vec<u8> {
        encoding::encode_call(&self.method, &self.params, encoding)
    }

    pub fn decode(body: &[u8]) -> Result<MethodCall, DecodeError> {
        encoding::decode_call(body)
    }
}

impl Fault {
    pub fn new<S: Into<String>>(code: i32, message: S) -> Fault {
        Fault { code, message: message.into() }
    }

    /// A client-side validation failure; always code 0.
    pub fn local<S: Into<String>>(message: S) -> Fault {
        Fault::new(0, message)
    }

    pub fn code(&self) -> i32 {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_local(&self) -> bool {
        self.code == 0
    }
}

impl Response {
    pub fn decode(body: &[u8]) -> Result<Response, DecodeError> {
        encoding::decode_response(body)
    }

    pub fn encode(&self, encoding: Encoding) -> Vec<u8> {
        encoding::encode_response(self, encoding)
    }

    /// Collapses the parameter list: one parameter is returned bare, several
    /// become an array in order, none becomes `Value::Nil`.
    pub fn into_result(self) -> Result<Value, Fault> {
        match self {
            Response::Fault(fault) => Err(fault),
            Response::Success(mut params) => match params.len() {
                0 => Ok(Value::Nil),
                1 => Ok(params.remove(0)),
                _ => Ok(Value::Array(params)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Fault, MethodCall, Response};
    use crate::config::Encoding;
    use crate::xmlrpc::encoding::Value;

    #[test]
    fn test_encode() {
        let expected = concat!(
            "<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?>",
            "<methodCall><methodName>method_name_value</methodName><params>",
            "<param><value><string>string_value</string></value></param>",
            "<param><value><int>42</int></value></param>",
            "</params></methodCall>",
        );

        let request = MethodCall::new("method_name_value").argument("string_value").argument(42);

        assert_eq!(expected.as_bytes(), &request.encode(Encoding::Latin1)[..]);
    }

    #[test]
    fn call_without_params_round_trips() {
        let request = MethodCall::new("mt.supportedMethods");

        assert_eq!(request, MethodCall::decode(&request.encode(Encoding::Utf8)).unwrap());
    }

    #[test]
    fn faults_become_errors() {
        let response = Response::Fault(Fault::new(403, "Forbidden"));

        let fault = response.into_result().unwrap_err();
        assert_eq!(403, fault.code());
        assert_eq!("Forbidden", fault.message());
        assert!(!fault.is_local());
        assert_eq!("<Fault 403: 'Forbidden'>", fault.to_string());
    }

    #[test]
    fn single_param_is_unwrapped() {
        let response = Response::Success(vec![Value::Array(vec![Value::from(1)])]);

        assert_eq!(Value::Array(vec![Value::from(1)]), response.into_result().unwrap());
    }
}
