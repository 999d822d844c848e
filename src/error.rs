use std::io;
use std::result;

use thiserror::Error as ThisError;

use crate::xmlrpc::encoding::DecodeError;
use crate::xmlrpc::protocol::Fault;

pub type Result<T> = result::Result<T, Error>;

#[derive(Debug, ThisError)]
pub enum Error {
    /// The endpoint URL was rejected before any connection was attempted.
    #[error("configuration error: {0}")]
    Config(String),

    /// Connecting, writing the request or reading the response failed.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-success HTTP status.
    #[error("HTTP status {status} from {url}")]
    HttpStatus { status: u16, url: String },

    /// A remote fault, or a local validation failure carrying code 0.
    #[error("{0}")]
    Fault(Fault),

    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    pub fn local<S: Into<String>>(message: S) -> Error {
        Error::Fault(Fault::local(message))
    }

    /// The fault carried by this error, if it is one.
    pub fn fault(&self) -> Option<&Fault> {
        match *self {
            Error::Fault(ref fault) => Some(fault),
            _ => None,
        }
    }

    /// True when the exchange itself broke, as opposed to the server or the
    /// client rejecting the operation.
    pub fn is_transport(&self) -> bool {
        matches!(*self, Error::Transport(_) | Error::HttpStatus { .. })
    }
}

impl From<Fault> for Error {
    fn from(fault: Fault) -> Error {
        Error::Fault(fault)
    }
}

#[cfg(test)]
mod tests {
    use super::Error;

    #[test]
    fn local_errors_carry_code_zero() {
        let err = Error::local("Post edit failed");
        let fault = err.fault().unwrap();

        assert_eq!(0, fault.code());
        assert_eq!("Post edit failed", fault.message());
        assert!(fault.is_local());
        assert!(!err.is_transport());
    }

    #[test]
    fn status_errors_are_transport_errors() {
        let err = Error::HttpStatus { status: 502, url: "http://blog.example/RPC2".into() };

        assert!(err.is_transport());
        assert!(err.fault().is_none());
        assert_eq!("HTTP status 502 from http://blog.example/RPC2", err.to_string());
    }
}
