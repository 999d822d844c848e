// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! XML-RPC values and their wire form.
//!
//! Encoding writes the `<methodCall>` / `<methodResponse>` envelopes as text
//! and then transcodes them to the configured character set. Decoding is a
//! strict pull parser over `xml-rs` events: anything outside the XML-RPC
//! grammar is a [`DecodeError`].

use std::collections::{BTreeMap, HashMap};
use std::fmt::{self, Write};
use std::io::Read;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use thiserror::Error as ThisError;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::PrimitiveDateTime;
use xml::escape::escape_str_pcdata;
use xml::reader::{EventReader, ParserConfig, XmlEvent};

use crate::config::Encoding;
use crate::xmlrpc::protocol::{Fault, MethodCall, Response};

/// Represents an XML-RPC data value
#[derive(Clone, PartialEq, Debug)]
pub enum Value {
    Int(i32),
    Boolean(bool),
    String(String),
    Double(f64),
    /// `dateTime.iso8601`, always without a timezone.
    DateTime(PrimitiveDateTime),
    Base64(Vec<u8>),
    Array(Array),
    Struct(Struct),
    /// The `<nil/>` extension. Also stands for an empty parameter list.
    Nil,
}

pub type Array = Vec<Value>;
pub type Struct = BTreeMap<String, Value>;

const DATETIME_COMPACT: &[BorrowedFormatItem<'static>] =
    format_description!("[year][month][day]T[hour]:[minute]:[second]");
const DATETIME_DASHED: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");

#[derive(Debug, ThisError)]
pub enum DecodeError {
    #[error("malformed XML: {0}")]
    Xml(#[from] xml::reader::Error),
    #[error("expected {expected}, found {found}")]
    Unexpected { expected: String, found: String },
    #[error("invalid {kind} value {text:?}")]
    InvalidScalar { kind: &'static str, text: String },
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("fault struct is missing {0}")]
    MalformedFault(&'static str),
    #[error("missing struct member {0:?}")]
    MissingMember(String),
    #[error("{member:?} is {found}, expected {expected}")]
    MemberType { member: String, expected: &'static str, found: &'static str },
}

impl Value {
    /// If the value is a Struct, returns the member with the provided name.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_struct().and_then(|members| members.get(key))
    }

    /// Follows nested struct members; `None` as soon as one is missing.
    pub fn find_path(&self, keys: &[&str]) -> Option<&Value> {
        keys.iter().try_fold(self, |target, key| target.get(key))
    }

    pub fn as_struct(&self) -> Option<&Struct> {
        match *self {
            Value::Struct(ref members) => Some(members),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match *self {
            Value::Array(ref items) => Some(items),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match *self {
            Value::String(ref s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match *self {
            Value::Int(n) => Some(n),
            _ => None,
        }
    }

    /// Integers are widened; everything else is `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Int(n) => Some(f64::from(n)),
            Value::Double(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Boolean(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<PrimitiveDateTime> {
        match *self {
            Value::DateTime(dt) => Some(dt),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match *self {
            Value::Base64(ref bits) => Some(bits),
            _ => None,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(*self, Value::Nil)
    }

    /// Name of the wire tag, used in error messages.
    pub fn kind(&self) -> &'static str {
        match *self {
            Value::Int(_) => "int",
            Value::Boolean(_) => "boolean",
            Value::String(_) => "string",
            Value::Double(_) => "double",
            Value::DateTime(_) => "dateTime.iso8601",
            Value::Base64(_) => "base64",
            Value::Array(_) => "array",
            Value::Struct(_) => "struct",
            Value::Nil => "nil",
        }
    }
}

macro_rules! from_int_impl {
    ($($t:ty), +) => (
        $(impl From<$t> for Value {
            fn from(v: $t) -> Value { Value::Int(i32::from(v)) }
        })+
    )
}

// Only lossless conversions: XML-RPC integers are 4-byte signed.
from_int_impl! { i8, i16, i32, u16 }

impl From<bool> for Value {
    fn from(v: bool) -> Value {
        Value::Boolean(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Value {
        Value::Double(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Value {
        Value::Double(f64::from(v))
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Value {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Value {
        Value::String(v)
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Value {
        Value::String(v.clone())
    }
}

impl From<PrimitiveDateTime> for Value {
    fn from(v: PrimitiveDateTime) -> Value {
        Value::DateTime(v)
    }
}

impl<A: Into<Value>> From<Vec<A>> for Value {
    fn from(v: Vec<A>) -> Value {
        Value::Array(v.into_iter().map(Into::into).collect())
    }
}

impl<A: Into<Value>> From<BTreeMap<String, A>> for Value {
    fn from(v: BTreeMap<String, A>) -> Value {
        Value::Struct(v.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl<A: Into<Value>> From<HashMap<String, A>> for Value {
    fn from(v: HashMap<String, A>) -> Value {
        Value::Struct(v.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl<A: Into<Value>> From<Option<A>> for Value {
    fn from(v: Option<A>) -> Value {
        v.map_or(Value::Nil, Into::into)
    }
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

fn escape<W: Write>(w: &mut W, v: &str) -> fmt::Result {
    w.write_str(&escape_str_pcdata(v))
}

fn write_datetime<W: Write>(w: &mut W, dt: &PrimitiveDateTime) -> fmt::Result {
    write!(
        w,
        "{:04}{:02}{:02}T{:02}:{:02}:{:02}",
        dt.year(),
        u8::from(dt.month()),
        dt.day(),
        dt.hour(),
        dt.minute(),
        dt.second()
    )
}

/// Writes `<value>...</value>` for one value, recursing into arrays and structs.
pub fn write_value<W: Write>(w: &mut W, value: &Value) -> fmt::Result {
    w.write_str("<value>")?;
    match *value {
        Value::Int(v) => write!(w, "<int>{}</int>", v)?,
        Value::Boolean(v) => write!(w, "<boolean>{}</boolean>", u8::from(v))?,
        Value::Double(v) => write!(w, "<double>{}</double>", v)?,
        Value::String(ref v) => {
            w.write_str("<string>")?;
            escape(w, v)?;
            w.write_str("</string>")?;
        }
        Value::DateTime(ref dt) => {
            w.write_str("<dateTime.iso8601>")?;
            write_datetime(w, dt)?;
            w.write_str("</dateTime.iso8601>")?;
        }
        Value::Base64(ref bits) => write!(w, "<base64>{}</base64>", BASE64.encode(bits))?,
        Value::Array(ref items) => {
            w.write_str("<array><data>")?;
            for item in items {
                write_value(w, item)?;
            }
            w.write_str("</data></array>")?;
        }
        Value::Struct(ref members) => {
            w.write_str("<struct>")?;
            for (name, member) in members {
                w.write_str("<member><name>")?;
                escape(w, name)?;
                w.write_str("</name>")?;
                write_value(w, member)?;
                w.write_str("</member>")?;
            }
            w.write_str("</struct>")?;
        }
        Value::Nil => w.write_str("<nil/>")?,
    }
    w.write_str("</value>")
}

fn write_params<W: Write>(w: &mut W, params: &[Value]) -> fmt::Result {
    w.write_str("<params>")?;
    for param in params {
        w.write_str("<param>")?;
        write_value(w, param)?;
        w.write_str("</param>")?;
    }
    w.write_str("</params>")
}

fn write_call<W: Write>(
    w: &mut W,
    method: &str,
    params: &[Value],
    encoding: Encoding,
) -> fmt::Result {
    write!(w, "<?xml version=\"1.0\" encoding=\"{}\"?>", encoding.name())?;
    w.write_str("<methodCall><methodName>")?;
    escape(w, method)?;
    w.write_str("</methodName>")?;
    write_params(w, params)?;
    w.write_str("</methodCall>")
}

fn write_response<W: Write>(w: &mut W, response: &Response, encoding: Encoding) -> fmt::Result {
    write!(w, "<?xml version=\"1.0\" encoding=\"{}\"?>", encoding.name())?;
    w.write_str("<methodResponse>")?;
    match *response {
        Response::Success(ref params) => write_params(w, params)?,
        Response::Fault(ref fault) => {
            let mut members = Struct::new();
            members.insert("faultCode".to_string(), Value::Int(fault.code()));
            members.insert("faultString".to_string(), Value::String(fault.message().to_string()));
            w.write_str("<fault>")?;
            write_value(w, &Value::Struct(members))?;
            w.write_str("</fault>")?;
        }
    }
    w.write_str("</methodResponse>")
}

/// Converts the finished document to the bytes of `encoding`.
fn transcode(body: String, encoding: Encoding) -> Vec<u8> {
    match encoding {
        Encoding::Utf8 => body.into_bytes(),
        Encoding::Latin1 => {
            let mut out = Vec::with_capacity(body.len());
            for c in body.chars() {
                match u8::try_from(u32::from(c)) {
                    Ok(b) => out.push(b),
                    Err(_) => out.extend_from_slice(format!("&#{};", u32::from(c)).as_bytes()),
                }
            }
            out
        }
    }
}

/// Serializes a complete `<methodCall>` document.
pub fn encode_call(method: &str, params: &[Value], encoding: Encoding) -> Vec<u8> {
    let mut body = String::new();
    // Writing into a String never fails.
    let _ = write_call(&mut body, method, params, encoding);
    transcode(body, encoding)
}

/// Serializes a complete `<methodResponse>` document.
pub fn encode_response(response: &Response, encoding: Encoding) -> Vec<u8> {
    let mut body = String::new();
    let _ = write_response(&mut body, response, encoding);
    transcode(body, encoding)
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq)]
enum Token {
    Start(String),
    End(String),
    Text(String),
    EndDocument,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Token::Start(ref name) => write!(f, "<{}>", name),
            Token::End(ref name) => write!(f, "</{}>", name),
            Token::Text(ref text) => write!(f, "text {:?}", text),
            Token::EndDocument => f.write_str("end of document"),
        }
    }
}

fn unexpected<T>(expected: &str, found: &Token) -> Result<T, DecodeError> {
    Err(DecodeError::Unexpected { expected: expected.to_string(), found: found.to_string() })
}

struct Builder<R: Read> {
    parser: EventReader<R>,
}

impl<R: Read> Builder<R> {
    fn new(src: R) -> Builder<R> {
        let config = ParserConfig::new()
            .trim_whitespace(false)
            .whitespace_to_characters(false)
            .cdata_to_characters(true)
            .ignore_comments(true);
        Builder { parser: EventReader::new_with_config(src, config) }
    }

    /// Next raw event mapped to a token. Whitespace is returned as text so the
    /// caller decides whether it matters.
    fn raw_token(&mut self) -> Result<Token, DecodeError> {
        loop {
            return Ok(match self.parser.next()? {
                XmlEvent::StartElement { name, .. } => Token::Start(name.local_name),
                XmlEvent::EndElement { name } => Token::End(name.local_name),
                XmlEvent::Characters(s) | XmlEvent::CData(s) | XmlEvent::Whitespace(s) => {
                    Token::Text(s)
                }
                XmlEvent::EndDocument => Token::EndDocument,
                // declaration, processing instructions, comments
                _ => continue,
            });
        }
    }

    /// Next token that is not insignificant whitespace between elements.
    fn next_token(&mut self) -> Result<Token, DecodeError> {
        loop {
            match self.raw_token()? {
                Token::Text(ref s) if s.trim().is_empty() => continue,
                token => return Ok(token),
            }
        }
    }

    fn expect_start(&mut self, name: &str) -> Result<(), DecodeError> {
        match self.next_token()? {
            Token::Start(ref found) if found == name => Ok(()),
            other => unexpected(&format!("<{}>", name), &other),
        }
    }

    fn expect_end(&mut self, name: &str) -> Result<(), DecodeError> {
        match self.next_token()? {
            Token::End(ref found) if found == name => Ok(()),
            other => unexpected(&format!("</{}>", name), &other),
        }
    }

    fn expect_end_document(&mut self) -> Result<(), DecodeError> {
        match self.next_token()? {
            Token::EndDocument => Ok(()),
            other => unexpected("end of document", &other),
        }
    }

    /// Character content up to the closing tag `name`, whitespace preserved.
    fn text(&mut self, name: &str) -> Result<String, DecodeError> {
        let mut text = String::new();
        loop {
            match self.raw_token()? {
                Token::Text(s) => text.push_str(&s),
                Token::End(ref found) if found == name => return Ok(text),
                other => return unexpected(&format!("</{}>", name), &other),
            }
        }
    }

    /// Parses a value whose `<value>` tag was already consumed, including the
    /// closing `</value>`.
    fn build_value(&mut self) -> Result<Value, DecodeError> {
        let mut text = String::new();
        let tag = loop {
            match self.raw_token()? {
                Token::Text(s) => text.push_str(&s),
                // An untyped value is a string.
                Token::End(ref found) if found == "value" => return Ok(Value::String(text)),
                Token::Start(tag) if text.trim().is_empty() => break tag,
                other => return unexpected("a value", &other),
            }
        };

        let value = match tag.as_str() {
            "int" | "i4" => {
                let text = self.text(&tag)?;
                Value::Int(parse_scalar("int", &text)?)
            }
            "boolean" => {
                let text = self.text(&tag)?;
                match text.trim() {
                    "0" => Value::Boolean(false),
                    "1" => Value::Boolean(true),
                    _ => return Err(DecodeError::InvalidScalar { kind: "boolean", text }),
                }
            }
            "double" => {
                let text = self.text(&tag)?;
                Value::Double(parse_scalar("double", &text)?)
            }
            "string" => Value::String(self.text(&tag)?),
            "dateTime.iso8601" => {
                let text = self.text(&tag)?;
                Value::DateTime(parse_datetime(&text)?)
            }
            "base64" => {
                let text = self.text(&tag)?;
                let packed: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
                Value::Base64(BASE64.decode(packed)?)
            }
            "array" => self.build_array()?,
            "struct" => self.build_struct()?,
            "nil" => {
                self.expect_end("nil")?;
                Value::Nil
            }
            _ => return unexpected("a value type", &Token::Start(tag)),
        };

        self.expect_end("value")?;
        Ok(value)
    }

    fn build_array(&mut self) -> Result<Value, DecodeError> {
        self.expect_start("data")?;
        let mut items = Array::new();
        loop {
            match self.next_token()? {
                Token::Start(ref name) if name == "value" => items.push(self.build_value()?),
                Token::End(ref name) if name == "data" => break,
                other => return unexpected("<value> or </data>", &other),
            }
        }
        self.expect_end("array")?;
        Ok(Value::Array(items))
    }

    fn build_struct(&mut self) -> Result<Value, DecodeError> {
        let mut members = Struct::new();
        loop {
            match self.next_token()? {
                Token::Start(ref name) if name == "member" => {}
                Token::End(ref name) if name == "struct" => return Ok(Value::Struct(members)),
                other => return unexpected("<member> or </struct>", &other),
            }
            self.expect_start("name")?;
            let key = self.text("name")?;
            self.expect_start("value")?;
            let value = self.build_value()?;
            self.expect_end("member")?;
            members.insert(key, value);
        }
    }

    /// `<params>` already consumed; reads up to and including `</params>`.
    fn build_params(&mut self) -> Result<Vec<Value>, DecodeError> {
        let mut params = Vec::new();
        loop {
            match self.next_token()? {
                Token::Start(ref name) if name == "param" => {}
                Token::End(ref name) if name == "params" => return Ok(params),
                other => return unexpected("<param> or </params>", &other),
            }
            self.expect_start("value")?;
            params.push(self.build_value()?);
            self.expect_end("param")?;
        }
    }

    fn build_fault(&mut self) -> Result<Fault, DecodeError> {
        self.expect_start("value")?;
        let value = self.build_value()?;
        self.expect_end("fault")?;

        let code = value
            .get("faultCode")
            .and_then(Value::as_i32)
            .ok_or(DecodeError::MalformedFault("faultCode"))?;
        let message = value
            .get("faultString")
            .and_then(Value::as_str)
            .ok_or(DecodeError::MalformedFault("faultString"))?;
        Ok(Fault::new(code, message))
    }

    fn build_response(&mut self) -> Result<Response, DecodeError> {
        self.expect_start("methodResponse")?;
        let response = match self.next_token()? {
            Token::Start(ref name) if name == "params" => Response::Success(self.build_params()?),
            Token::Start(ref name) if name == "fault" => Response::Fault(self.build_fault()?),
            // Some servers answer a void method with an empty envelope.
            Token::End(ref name) if name == "methodResponse" => {
                self.expect_end_document()?;
                return Ok(Response::Success(Vec::new()));
            }
            other => return unexpected("<params> or <fault>", &other),
        };
        self.expect_end("methodResponse")?;
        self.expect_end_document()?;
        Ok(response)
    }

    fn build_call(&mut self) -> Result<MethodCall, DecodeError> {
        self.expect_start("methodCall")?;
        self.expect_start("methodName")?;
        let method = self.text("methodName")?.trim().to_string();
        let params = match self.next_token()? {
            Token::Start(ref name) if name == "params" => {
                let params = self.build_params()?;
                self.expect_end("methodCall")?;
                params
            }
            Token::End(ref name) if name == "methodCall" => Vec::new(),
            other => return unexpected("<params> or </methodCall>", &other),
        };
        self.expect_end_document()?;
        Ok(MethodCall { method, params })
    }
}

fn parse_scalar<T: std::str::FromStr>(kind: &'static str, text: &str) -> Result<T, DecodeError> {
    text.trim().parse().map_err(|_| DecodeError::InvalidScalar { kind, text: text.to_string() })
}

/// Accepts `YYYYMMDDTHH:MM:SS`, the dashed ISO form, and a trailing `Z`.
pub fn parse_datetime(text: &str) -> Result<PrimitiveDateTime, DecodeError> {
    let trimmed = text.trim();
    let trimmed = trimmed.strip_suffix('Z').unwrap_or(trimmed);
    PrimitiveDateTime::parse(trimmed, DATETIME_COMPACT)
        .or_else(|_| PrimitiveDateTime::parse(trimmed, DATETIME_DASHED))
        .map_err(|_| DecodeError::InvalidScalar {
            kind: "dateTime.iso8601",
            text: text.to_string(),
        })
}

/// Parses a `<methodResponse>` document.
pub fn decode_response(body: &[u8]) -> Result<Response, DecodeError> {
    Builder::new(body).build_response()
}

/// Parses a `<methodCall>` document.
pub fn decode_call(body: &[u8]) -> Result<MethodCall, DecodeError> {
    Builder::new(body).build_call()
}
