use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::{self, BufRead, Read, Write};

pub use super::MAX_DAP_HEADER_LINE_BYTES;

pub(crate) fn sanitize_json_error_message(message: &str) -> String {
    // `serde_json::Error` display strings can include user-provided scalar values (for example:
    // `invalid type: string "..."`). Avoid echoing those values into logs: request arguments
    // carry user source paths and variable contents.
    let mut out = String::with_capacity(message.len());
    let mut rest = message;
    while let Some(start) = rest.find('"') {
        out.push_str(&rest[..start + 1]);
        rest = &rest[start + 1..];

        let Some(end) = rest.find('"') else {
            out.push_str(rest);
            return out;
        };
        out.push_str("<redacted>\"");
        rest = &rest[end + 1..];
    }
    out.push_str(rest);
    out
}

fn read_line_limited<R: BufRead>(reader: &mut R, max_len: usize) -> io::Result<Option<String>> {
    let mut buf = Vec::<u8>::new();
    loop {
        let available = reader.fill_buf()?;
        if available.is_empty() {
            if buf.is_empty() {
                return Ok(None);
            }
            break;
        }

        let newline_pos = available.iter().position(|&b| b == b'\n');
        let take = newline_pos.map(|pos| pos + 1).unwrap_or(available.len());
        if buf.len() + take > max_len {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("DAP header line exceeds maximum size ({max_len} bytes)"),
            ));
        }

        buf.extend_from_slice(&available[..take]);
        reader.consume(take);
        if newline_pos.is_some() {
            break;
        }
    }

    let line = String::from_utf8(buf)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "DAP header line is not UTF-8"))?;
    Ok(Some(line))
}

/// Read a single DAP-framed JSON message from `reader`.
///
/// DAP messages are framed using an HTTP-like header section:
///
/// ```text
/// Content-Length: 123\r\n
/// \r\n
/// { ...json... }
/// ```
///
/// Returns `Ok(None)` on a clean end of stream between messages.
pub fn read_json_message<R: BufRead, T: DeserializeOwned>(reader: &mut R) -> io::Result<Option<T>> {
    let bytes = match read_raw_message(reader)? {
        Some(bytes) => bytes,
        None => return Ok(None),
    };

    let parsed = serde_json::from_slice(&bytes).map_err(|err| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            sanitize_json_error_message(&err.to_string()),
        )
    })?;
    Ok(Some(parsed))
}

/// Write a single DAP-framed JSON message to `writer`.
pub fn write_json_message<W: Write, T: Serialize>(writer: &mut W, message: &T) -> io::Result<()> {
    let bytes = serde_json::to_vec(message).map_err(|err| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            sanitize_json_error_message(&err.to_string()),
        )
    })?;
    write_raw_message(writer, &bytes)
}

/// Read one header block plus exactly `Content-Length` body bytes.
///
/// The body size is not capped. It is read incrementally, so a bogus length can
/// only fail with `UnexpectedEof` once the peer stops sending.
pub fn read_raw_message<R: BufRead>(reader: &mut R) -> io::Result<Option<Vec<u8>>> {
    let mut content_length: Option<u64> = None;
    let mut saw_header_line = false;

    loop {
        let Some(line) = read_line_limited(reader, MAX_DAP_HEADER_LINE_BYTES)? else {
            if !saw_header_line {
                return Ok(None);
            }

            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "EOF while reading DAP headers",
            ));
        };
        saw_header_line = true;

        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            break;
        }

        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("Content-Length") {
                let value = value.trim();
                content_length = Some(value.parse::<u64>().map_err(|err| {
                    io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("invalid Content-Length {value:?}: {err}"),
                    )
                })?);
            }
        }
    }

    let Some(content_length) = content_length else {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "DAP message missing Content-Length header",
        ));
    };

    let mut buf = Vec::new();
    reader.by_ref().take(content_length).read_to_end(&mut buf)?;
    if (buf.len() as u64) < content_length {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!(
                "EOF after {} of {content_length} DAP body bytes",
                buf.len()
            ),
        ));
    }
    Ok(Some(buf))
}

pub fn write_raw_message<W: Write>(writer: &mut W, json_bytes: &[u8]) -> io::Result<()> {
    write!(writer, "Content-Length: {}\r\n\r\n", json_bytes.len())?;
    writer.write_all(json_bytes)?;
    writer.flush()?;
    Ok(())
}
