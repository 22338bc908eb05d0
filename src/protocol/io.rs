//! Protocol I/O: graceful request parsing, response serialization, and the
//! line-oriented serve loop.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::catalog::CatalogIndex;
use crate::error::IndexError;

use super::dispatch::dispatch;
use super::message::{Request, Response};

/// Maximum length for raw JSON in logs
const MAX_RAW_LOG_PREVIEW: usize = 200;

/// Truncated preview of raw JSON for logging, plus the full length
pub fn log_preview(raw: &str) -> (&str, usize) {
    let len = raw.len();
    if len > MAX_RAW_LOG_PREVIEW {
        let mut end = MAX_RAW_LOG_PREVIEW;
        while !raw.is_char_boundary(end) {
            end -= 1;
        }
        (&raw[..end], len)
    } else {
        (raw, len)
    }
}

/// Classified outcome of parsing one line
#[derive(Debug)]
pub enum ParseResult {
    Ok(Request),
    /// Valid JSON without a string `type` field
    MissingType { raw: String },
    /// A `type` we do not handle
    UnknownType { message_type: String, raw: String },
    /// Known type, but fields of the wrong shape
    InvalidPayload {
        message_type: String,
        error: String,
        raw: String,
    },
    /// Not JSON at all
    ParseError(serde_json::Error),
}

/// Parse a request, classifying failures instead of collapsing them.
pub fn parse_request_graceful(line: &str) -> ParseResult {
    let (preview, _) = log_preview(line);

    let value: serde_json::Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => return ParseResult::ParseError(e),
    };

    let message_type = match value.get("type").and_then(|t| t.as_str()) {
        Some(t) => t.to_string(),
        None => {
            return ParseResult::MissingType {
                raw: preview.to_string(),
            }
        }
    };

    match serde_json::from_value::<Request>(value) {
        Ok(request) => ParseResult::Ok(request),
        Err(e) => {
            let error = e.to_string();
            if error.contains("unknown variant") {
                ParseResult::UnknownType {
                    message_type,
                    raw: preview.to_string(),
                }
            } else {
                ParseResult::InvalidPayload {
                    message_type,
                    error,
                    raw: preview.to_string(),
                }
            }
        }
    }
}

/// Parse a request into a typed value or an argument error.
pub fn parse_request(line: &str) -> Result<Request, IndexError> {
    match parse_request_graceful(line) {
        ParseResult::Ok(request) => Ok(request),
        ParseResult::MissingType { raw } => {
            warn!(raw = %raw, "Request without type");
            Err(IndexError::invalid("type", "is required"))
        }
        ParseResult::UnknownType { message_type, raw } => {
            warn!(message_type = %message_type, raw = %raw, "Unknown request type");
            Err(IndexError::invalid(
                "type",
                format!("'{}' is not a known request", message_type),
            ))
        }
        ParseResult::InvalidPayload {
            message_type,
            error,
            raw,
        } => {
            warn!(message_type = %message_type, error = %error, raw = %raw, "Invalid request payload");
            Err(IndexError::invalid(message_type, error))
        }
        ParseResult::ParseError(e) => {
            let (preview, len) = log_preview(line);
            warn!(raw = %preview, raw_len = len, error = %e, "Failed to parse request JSON");
            Err(IndexError::ProtocolParse(e))
        }
    }
}

/// Serialize a response to one JSON line (without newline)
pub fn serialize_response(response: &Response) -> Result<String, serde_json::Error> {
    serde_json::to_string(response)
}

/// Parse and answer one line. Errors become `error` responses.
pub fn handle_line(index: &mut CatalogIndex, line: &str) -> Response {
    match parse_request(line) {
        Ok(request) => dispatch(index, request),
        Err(e) => Response::error(&e),
    }
}

/// Answer requests line by line until the reader is exhausted.
///
/// `after_each` runs after every answered request, e.g. to persist usage.
pub fn serve<R, W, F>(index: &mut CatalogIndex, reader: R, mut writer: W, mut after_each: F) -> Result<()>
where
    R: BufRead,
    W: Write,
    F: FnMut(&CatalogIndex, &Response),
{
    for line in reader.lines() {
        let line = line.context("Failed to read request line")?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        debug!(bytes = trimmed.len(), "Handling request line");

        let response = handle_line(index, trimmed);
        let json = serialize_response(&response).context("Failed to serialize response")?;
        writeln!(writer, "{}", json).context("Failed to write response")?;
        writer.flush().context("Failed to flush response")?;

        after_each(index, &response);
    }
    debug!("Reached end of request stream");
    Ok(())
}
