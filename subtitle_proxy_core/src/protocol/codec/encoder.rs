//! Message encoder for the XML-RPC protocol
//!
//! This module handles encoding of method calls (and, for test servers,
//! method responses) into XML documents.

use crate::protocol::codec::Value;
use crate::protocol::error::{ProtocolError, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use log::trace;

/// Encode a `methodCall` document
pub fn encode_call(method: &str, params: &[Value]) -> Result<String> {
    if method.is_empty() {
        return Err(ProtocolError::encoding("Empty method name"));
    }
    if !method
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ':' | '/'))
    {
        return Err(ProtocolError::encoding(format!(
            "Invalid method name: {method}"
        )));
    }

    let mut out = String::with_capacity(256);
    out.push_str("<?xml version=\"1.0\"?>\n<methodCall><methodName>");
    out.push_str(method);
    out.push_str("</methodName><params>");
    for param in params {
        out.push_str("<param>");
        write_value(&mut out, param)?;
        out.push_str("</param>");
    }
    out.push_str("</params></methodCall>\n");

    trace!("Encoded {method} call: {} bytes", out.len());
    Ok(out)
}

/// Encode a successful `methodResponse` document
pub fn encode_response(value: &Value) -> Result<String> {
    let mut out = String::with_capacity(256);
    out.push_str("<?xml version=\"1.0\"?>\n<methodResponse><params><param>");
    write_value(&mut out, value)?;
    out.push_str("</param></params></methodResponse>\n");
    Ok(out)
}

/// Encode a `fault` response document
pub fn encode_fault(code: i64, message: &str) -> Result<String> {
    let fault = Value::structure([
        ("faultCode", Value::Int(code)),
        ("faultString", Value::from(message)),
    ]);
    let mut out = String::with_capacity(256);
    out.push_str("<?xml version=\"1.0\"?>\n<methodResponse><fault>");
    write_value(&mut out, &fault)?;
    out.push_str("</fault></methodResponse>\n");
    Ok(out)
}

fn write_value(out: &mut String, value: &Value) -> Result<()> {
    out.push_str("<value>");
    match value {
        Value::Nil => out.push_str("<nil/>"),
        Value::Bool(b) => {
            out.push_str("<boolean>");
            out.push(if *b { '1' } else { '0' });
            out.push_str("</boolean>");
        }
        Value::Int(i) => {
            if i32::try_from(*i).is_ok() {
                out.push_str(&format!("<int>{i}</int>"));
            } else {
                out.push_str(&format!("<i8>{i}</i8>"));
            }
        }
        Value::Double(d) => {
            if !d.is_finite() {
                return Err(ProtocolError::encoding(format!(
                    "Non-finite double cannot be encoded: {d}"
                )));
            }
            out.push_str(&format!("<double>{d}</double>"));
        }
        Value::String(s) => {
            out.push_str("<string>");
            escape_into(out, s);
            out.push_str("</string>");
        }
        Value::Base64(bytes) => {
            out.push_str("<base64>");
            out.push_str(&STANDARD.encode(bytes));
            out.push_str("</base64>");
        }
        Value::Array(items) => {
            out.push_str("<array><data>");
            for item in items {
                write_value(out, item)?;
            }
            out.push_str("</data></array>");
        }
        Value::Struct(members) => {
            out.push_str("<struct>");
            for (name, member) in members {
                out.push_str("<member><name>");
                escape_into(out, name);
                out.push_str("</name>");
                write_value(out, member)?;
                out.push_str("</member>");
            }
            out.push_str("</struct>");
        }
    }
    out.push_str("</value>");
    Ok(())
}

fn escape_into(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
}
