//! XML-RPC message encoding and decoding
//!
//! This module handles the conversion between [`Value`] trees and the XML
//! documents exchanged with the remote endpoint.

mod decoder;
mod encoder;
mod value;

pub use decoder::{decode_call, decode_response};
pub use encoder::{encode_call, encode_fault, encode_response};
pub use value::Value;

/// Method names whose first parameters are credentials and must not be logged
const SENSITIVE_METHODS: &[&str] = &["LogIn"];

/// Render a call for logs with credentials masked
pub fn describe_call(method: &str, params: &[Value]) -> String {
    let rendered: Vec<String> = if SENSITIVE_METHODS.contains(&method) {
        params
            .iter()
            .enumerate()
            .map(|(i, p)| {
                if i == 1 {
                    "***".to_string()
                } else {
                    render_param(p)
                }
            })
            .collect()
    } else {
        // The first parameter of authenticated calls is the session token
        params
            .iter()
            .enumerate()
            .map(|(i, p)| if i == 0 { "<token>".to_string() } else { render_param(p) })
            .collect()
    };
    format!("{method}({})", rendered.join(", "))
}

fn render_param(value: &Value) -> String {
    match value {
        Value::String(s) => format!("{s:?}"),
        Value::Base64(bytes) => format!("<{} bytes>", bytes.len()),
        other => format!("{other:?}"),
    }
}
