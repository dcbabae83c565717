//! Header-block parsing and display formatting shared by both adapters.

use chrono::{DateTime, Utc};
use mail_parser::{Addr, MessageParser};

use super::error::{FetchError, Result};

/// Metadata extracted from a message's header block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderInfo {
    pub from: Option<String>,
    pub subject: Option<String>,
    pub message_id: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

/// Parses a raw RFC 5322 header block (no body).
///
/// Every line must be either a `Name: value` field or a folded continuation
/// (leading whitespace). Anything else means the block is corrupt or
/// truncated, which is reported as a [`FetchError::ParseError`].
pub fn parse_header_block(raw: &[u8]) -> Result<HeaderInfo> {
    let text = String::from_utf8_lossy(raw);
    let mut fields = 0usize;

    for (line_no, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            break;
        }
        if line.starts_with(' ') || line.starts_with('\t') {
            if fields == 0 {
                return Err(FetchError::ParseError(
                    "header block starts with a continuation line".to_string(),
                ));
            }
            continue;
        }
        if !is_field_line(line) {
            return Err(FetchError::ParseError(format!(
                "line {} is not a header field",
                line_no + 1
            )));
        }
        fields += 1;
    }

    if fields == 0 {
        return Err(FetchError::ParseError("empty header block".to_string()));
    }

    let mut block = raw.to_vec();
    if !block.ends_with(b"\r\n\r\n") && !block.ends_with(b"\n\n") {
        block.extend_from_slice(b"\r\n");
    }

    let message = MessageParser::default()
        .parse(&block)
        .ok_or_else(|| FetchError::ParseError("unparsable header block".to_string()))?;

    Ok(HeaderInfo {
        from: message
            .from()
            .and_then(|addr| addr.first())
            .map(format_addr),
        subject: message.subject().map(str::to_string),
        message_id: message.message_id().and_then(normalize_message_id),
        date: message
            .date()
            .and_then(|d| DateTime::from_timestamp(d.to_timestamp(), 0)),
    })
}

/// A header field line has a non-empty name of printable, non-space ASCII
/// characters followed by a colon.
fn is_field_line(line: &str) -> bool {
    match line.split_once(':') {
        Some((name, _)) => {
            !name.is_empty() && name.bytes().all(|b| b.is_ascii_graphic() && b != b':')
        }
        None => false,
    }
}

fn format_addr(addr: &Addr) -> String {
    let address = addr.address().unwrap_or_default();
    format_sender(addr.name(), address)
}

/// Formats a display sender as `Name <address>`, or the bare address when
/// there is no personal name.
pub fn format_sender(name: Option<&str>, address: &str) -> String {
    match name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => format!("{} <{}>", name, address),
        None => address.to_string(),
    }
}

/// Strips whitespace and surrounding angle brackets from a Message-ID.
/// Returns `None` for an empty id.
pub fn normalize_message_id(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix('<').unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix('>').unwrap_or(trimmed).trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Decodes RFC 2047 encoded words (`=?UTF-8?B?...?=`) in a header value.
/// Plain values are returned unchanged.
pub fn decode_header_text(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    if !text.contains("=?") {
        return text.trim().to_string();
    }

    let block = format!("Subject: {}\r\n\r\n", text.trim());
    MessageParser::default()
        .parse(block.as_bytes())
        .and_then(|m| m.subject().map(str::to_string))
        .unwrap_or_else(|| text.trim().to_string())
}

/// Parses an RFC 2822 date as carried in an IMAP envelope.
pub fn parse_rfc2822_date(raw: &[u8]) -> Option<DateTime<Utc>> {
    let text = String::from_utf8_lossy(raw);
    DateTime::parse_from_rfc2822(text.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
