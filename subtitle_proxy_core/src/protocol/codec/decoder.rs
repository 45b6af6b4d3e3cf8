//! Message decoder for the XML-RPC protocol
//!
//! This module turns `methodResponse` (and `methodCall`) documents into
//! [`Value`] trees. It understands exactly the XML subset XML-RPC uses:
//! elements without meaningful attributes, character references, comments,
//! CDATA sections and the XML declaration.

use crate::protocol::codec::Value;
use crate::protocol::error::{ProtocolError, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use log::{trace, warn};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
enum Token<'a> {
    Start(&'a str),
    End(&'a str),
    Empty(&'a str),
    Text(String),
}

/// Decode a `methodResponse` document
///
/// Returns the single response parameter, or [`ProtocolError::Fault`] if the
/// document carries a fault.
pub fn decode_response(xml: &str) -> Result<Value> {
    let mut parser = Parser::new(xml)?;
    parser.expect_start("methodResponse")?;
    parser.skip_whitespace();

    let value = match parser.next_token() {
        Some(Token::Start("params")) => {
            parser.skip_whitespace();
            let value = if parser.peek_is_end("params") {
                Value::Nil
            } else {
                parser.expect_start("param")?;
                let value = parser.parse_value()?;
                parser.expect_end("param")?;
                value
            };
            parser.expect_end("params")?;
            value
        }
        Some(Token::Empty("params")) => Value::Nil,
        Some(Token::Start("fault")) => {
            let fault = parser.parse_value()?;
            let code = fault.get("faultCode").and_then(Value::as_i64).unwrap_or(0);
            let message = fault
                .get("faultString")
                .and_then(Value::as_str)
                .unwrap_or("unknown fault")
                .to_string();
            warn!("Remote fault {code}: {message}");
            return Err(ProtocolError::fault(code, message));
        }
        other => {
            return Err(ProtocolError::invalid_response(
                "params or fault",
                format!("{other:?}"),
            ));
        }
    };

    parser.expect_end("methodResponse")?;
    Ok(value)
}

/// Decode a `methodCall` document into its method name and parameters
pub fn decode_call(xml: &str) -> Result<(String, Vec<Value>)> {
    let mut parser = Parser::new(xml)?;
    parser.expect_start("methodCall")?;
    parser.expect_start("methodName")?;
    let method = parser.text_until_end("methodName")?.trim().to_string();

    let mut params = Vec::new();
    parser.skip_whitespace();
    match parser.next_token() {
        Some(Token::Start("params")) => loop {
            parser.skip_whitespace();
            if parser.peek_is_end("params") {
                parser.pos += 1;
                break;
            }
            parser.expect_start("param")?;
            params.push(parser.parse_value()?);
            parser.expect_end("param")?;
        },
        Some(Token::Empty("params")) => {}
        Some(Token::End("methodCall")) => return Ok((method, params)),
        other => {
            return Err(ProtocolError::invalid_response(
                "params",
                format!("{other:?}"),
            ));
        }
    }

    parser.expect_end("methodCall")?;
    Ok((method, params))
}

struct Parser<'a> {
    tokens: Vec<Token<'a>>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(xml: &'a str) -> Result<Self> {
        let tokens = tokenize(xml)?;
        trace!("Tokenized XML document into {} tokens", tokens.len());
        Ok(Self { tokens, pos: 0 })
    }

    fn next_token(&mut self) -> Option<Token<'a>> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn peek_is_end(&self, name: &str) -> bool {
        matches!(self.tokens.get(self.pos), Some(Token::End(n)) if *n == name)
    }

    fn skip_whitespace(&mut self) {
        while let Some(Token::Text(text)) = self.tokens.get(self.pos) {
            if !text.trim().is_empty() {
                break;
            }
            self.pos += 1;
        }
    }

    fn expect_start(&mut self, name: &str) -> Result<()> {
        self.skip_whitespace();
        match self.next_token() {
            Some(Token::Start(n)) if n == name => Ok(()),
            other => Err(ProtocolError::invalid_response(
                format!("<{name}>"),
                format!("{other:?}"),
            )),
        }
    }

    fn expect_end(&mut self, name: &str) -> Result<()> {
        self.skip_whitespace();
        match self.next_token() {
            Some(Token::End(n)) if n == name => Ok(()),
            other => Err(ProtocolError::invalid_response(
                format!("</{name}>"),
                format!("{other:?}"),
            )),
        }
    }

    /// Read the optional text content of an element and its closing tag
    fn text_until_end(&mut self, name: &str) -> Result<String> {
        let text = match self.tokens.get(self.pos) {
            Some(Token::Text(text)) => {
                let text = text.clone();
                self.pos += 1;
                text
            }
            _ => String::new(),
        };
        self.expect_end(name)?;
        Ok(text)
    }

    fn parse_value(&mut self) -> Result<Value> {
        self.skip_whitespace();
        match self.next_token() {
            Some(Token::Start("value")) => {}
            Some(Token::Empty("value")) => return Ok(Value::String(String::new())),
            other => {
                return Err(ProtocolError::invalid_response(
                    "<value>",
                    format!("{other:?}"),
                ));
            }
        }

        // Untyped content is an implicit string
        if let Some(Token::Text(text)) = self.tokens.get(self.pos)
            && matches!(self.tokens.get(self.pos + 1), Some(Token::End("value")))
        {
            let text = text.clone();
            self.pos += 2;
            return Ok(Value::String(text));
        }

        self.skip_whitespace();
        let value = match self.next_token() {
            Some(Token::End("value")) => return Ok(Value::String(String::new())),
            Some(Token::Empty(name)) => match name {
                "nil" => Value::Nil,
                "string" => Value::String(String::new()),
                "array" => Value::Array(Vec::new()),
                "struct" => Value::Struct(BTreeMap::new()),
                other => {
                    return Err(ProtocolError::decoding(format!(
                        "Empty <{other}/> element is not a value"
                    )));
                }
            },
            Some(Token::Start(name)) => self.parse_typed(name)?,
            other => {
                return Err(ProtocolError::invalid_response(
                    "typed value",
                    format!("{other:?}"),
                ));
            }
        };

        self.expect_end("value")?;
        Ok(value)
    }

    fn parse_typed(&mut self, name: &str) -> Result<Value> {
        match name {
            "string" | "dateTime.iso8601" => Ok(Value::String(self.text_until_end(name)?)),
            "int" | "i4" | "i8" => {
                let text = self.text_until_end(name)?;
                text.trim()
                    .parse::<i64>()
                    .map(Value::Int)
                    .map_err(|e| ProtocolError::decoding(format!("Invalid integer {text:?}: {e}")))
            }
            "boolean" => match self.text_until_end(name)?.trim() {
                "1" | "true" => Ok(Value::Bool(true)),
                "0" | "false" => Ok(Value::Bool(false)),
                other => Err(ProtocolError::decoding(format!(
                    "Invalid boolean {other:?}"
                ))),
            },
            "double" => {
                let text = self.text_until_end(name)?;
                text.trim()
                    .parse::<f64>()
                    .map(Value::Double)
                    .map_err(|e| ProtocolError::decoding(format!("Invalid double {text:?}: {e}")))
            }
            "base64" => {
                let text = self.text_until_end(name)?;
                let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
                STANDARD
                    .decode(compact.as_bytes())
                    .map(Value::Base64)
                    .map_err(|e| ProtocolError::decoding(format!("Invalid base64 payload: {e}")))
            }
            "nil" => {
                self.expect_end("nil")?;
                Ok(Value::Nil)
            }
            "array" => {
                self.skip_whitespace();
                match self.next_token() {
                    Some(Token::Start("data")) => {}
                    Some(Token::Empty("data")) => {
                        self.expect_end("array")?;
                        return Ok(Value::Array(Vec::new()));
                    }
                    other => {
                        return Err(ProtocolError::invalid_response(
                            "<data>",
                            format!("{other:?}"),
                        ));
                    }
                }
                let mut items = Vec::new();
                loop {
                    self.skip_whitespace();
                    if self.peek_is_end("data") {
                        self.pos += 1;
                        break;
                    }
                    items.push(self.parse_value()?);
                }
                self.expect_end("array")?;
                Ok(Value::Array(items))
            }
            "struct" => {
                let mut members = BTreeMap::new();
                loop {
                    self.skip_whitespace();
                    if self.peek_is_end("struct") {
                        self.pos += 1;
                        break;
                    }
                    self.expect_start("member")?;
                    self.expect_start("name")?;
                    let member_name = self.text_until_end("name")?;
                    let member_value = self.parse_value()?;
                    self.expect_end("member")?;
                    members.insert(member_name, member_value);
                }
                Ok(Value::Struct(members))
            }
            other => Err(ProtocolError::decoding(format!(
                "Unsupported value type <{other}>"
            ))),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token<'_>>> {
    let mut tokens = Vec::new();
    let mut rest = input;

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix("<?") {
            let end = after
                .find("?>")
                .ok_or_else(|| ProtocolError::decoding("Unterminated XML declaration"))?;
            rest = &after[end + 2..];
        } else if let Some(after) = rest.strip_prefix("<!--") {
            let end = after
                .find("-->")
                .ok_or_else(|| ProtocolError::decoding("Unterminated comment"))?;
            rest = &after[end + 3..];
        } else if let Some(after) = rest.strip_prefix("<![CDATA[") {
            let end = after
                .find("]]>")
                .ok_or_else(|| ProtocolError::decoding("Unterminated CDATA section"))?;
            push_text(&mut tokens, after[..end].to_string());
            rest = &after[end + 3..];
        } else if rest.starts_with('<') {
            let end = rest
                .find('>')
                .ok_or_else(|| ProtocolError::decoding("Unterminated tag"))?;
            let inner = &rest[1..end];
            rest = &rest[end + 1..];

            if let Some(name) = inner.strip_prefix('/') {
                tokens.push(Token::End(name.trim()));
            } else if let Some(body) = inner.strip_suffix('/') {
                tokens.push(Token::Empty(tag_name(body)?));
            } else {
                tokens.push(Token::Start(tag_name(inner)?));
            }
        } else {
            let end = rest.find('<').unwrap_or(rest.len());
            push_text(&mut tokens, unescape(&rest[..end])?);
            rest = &rest[end..];
        }
    }

    Ok(tokens)
}

fn tag_name(inner: &str) -> Result<&str> {
    inner
        .split_whitespace()
        .next()
        .ok_or_else(|| ProtocolError::decoding("Empty tag name"))
}

fn push_text(tokens: &mut Vec<Token<'_>>, text: String) {
    if let Some(Token::Text(previous)) = tokens.last_mut() {
        previous.push_str(&text);
    } else {
        tokens.push(Token::Text(text));
    }
}

fn unescape(text: &str) -> Result<String> {
    if !text.contains('&') {
        return Ok(text.to_string());
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let semi = after
            .find(';')
            .ok_or_else(|| ProtocolError::decoding("Unterminated entity reference"))?;
        let entity = &after[..semi];
        match entity {
            "amp" => out.push('&'),
            "lt" => out.push('<'),
            "gt" => out.push('>'),
            "quot" => out.push('"'),
            "apos" => out.push('\''),
            _ => {
                let code = if let Some(hex) = entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                {
                    u32::from_str_radix(hex, 16).ok()
                } else if let Some(dec) = entity.strip_prefix('#') {
                    dec.parse::<u32>().ok()
                } else {
                    None
                };
                let ch = code.and_then(char::from_u32).ok_or_else(|| {
                    ProtocolError::decoding(format!("Unknown entity &{entity};"))
                })?;
                out.push(ch);
            }
        }
        rest = &after[semi + 1..];
    }
    out.push_str(rest);
    Ok(out)
}
