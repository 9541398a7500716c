//! Line-delimited JSON codec (spec §6): one JSON object per line, no
//! length-prefix framing — MCP stdio transport is already newline
//! delimited, unlike the teacher's binary IPC framing.

use std::io::{BufRead, Write};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::GatewayRequest;

/// Read one `GatewayRequest` from the next non-empty line of `reader`.
/// Returns `Ok(None)` at EOF.
pub fn read_request_line<R: BufRead>(reader: &mut R) -> std::io::Result<Option<GatewayRequest>> {
    loop {
        let mut line = String::new();
        let n = reader.read_line(&mut line)?;
        if n == 0 {
            return Ok(None);
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let request: GatewayRequest = serde_json::from_str(trimmed)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        return Ok(Some(request));
    }
}

/// Write one JSON value followed by a newline, flushing immediately so the
/// peer observes the response as soon as it's written.
pub fn write_response_line<W: Write, T: Serialize>(writer: &mut W, value: &T) -> std::io::Result<()> {
    let line = serde_json::to_string(value).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{line}")?;
    writer.flush()
}

/// Parse a raw line into any deserializable type — used by tests and by
/// callers that already hold a line from another source.
pub fn parse_line<T: DeserializeOwned>(line: &str) -> std::io::Result<T> {
    serde_json::from_str(line.trim()).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_one_request_per_line_skipping_blanks() {
        let input = "\n{\"domain\":\"tasks\",\"operation\":\"list\"}\n";
        let mut cursor = Cursor::new(input.as_bytes());
        let req = read_request_line(&mut cursor).unwrap().unwrap();
        assert_eq!(req.domain, "tasks");
        assert!(read_request_line(&mut cursor).unwrap().is_none());
    }

    #[test]
    fn write_response_line_appends_newline() {
        let mut buf = Vec::new();
        write_response_line(&mut buf, &serde_json::json!({"ok": true})).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "{\"ok\":true}\n");
    }
}
