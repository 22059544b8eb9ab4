use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// How a message arrived on stdio; replies use the same framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// `Content-Length` headers followed by a JSON body
    Headers,
    /// One JSON document per line
    Lines,
}

/// What one frame carried.
#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
    Message(Value),
    /// The frame was delimited correctly but its payload was not JSON.
    Malformed(String),
}

/// Read the next frame. `Ok(None)` is a clean EOF between messages.
///
/// Unparseable payloads come back as [`Incoming::Malformed`] so the caller
/// can answer them and keep reading; only I/O failures and a broken header
/// block are errors.
pub async fn read_message<R>(reader: &mut R) -> Result<Option<(Incoming, Framing)>, std::io::Error>
where
    R: AsyncBufRead + Unpin,
{
    let mut content_length: Option<usize> = None;
    let mut saw_header = false;

    loop {
        let mut raw = Vec::new();
        let bytes_read = reader.read_until(b'\n', &mut raw).await?;
        if bytes_read == 0 {
            if !saw_header {
                return Ok(None);
            }
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "Unexpected EOF while reading MCP headers",
            ));
        }

        let Ok(line) = std::str::from_utf8(&raw) else {
            if saw_header {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "MCP header is not valid UTF-8",
                ));
            }
            return Ok(Some((
                Incoming::Malformed("Message is not valid UTF-8".to_string()),
                Framing::Lines,
            )));
        };

        let trimmed = line.trim();
        if !saw_header && trimmed.is_empty() {
            continue;
        }
        if !saw_header && (trimmed.starts_with('{') || trimmed.starts_with('[')) {
            return Ok(Some((parse_payload(trimmed.as_bytes()), Framing::Lines)));
        }
        if trimmed.is_empty() {
            break;
        }

        saw_header = true;
        if trimmed.to_ascii_lowercase().starts_with("content-length:") {
            let raw_len = trimmed
                .split_once(':')
                .map(|(_, right)| right.trim())
                .unwrap_or_default();
            let parsed = raw_len.parse::<usize>().map_err(|_| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "Invalid Content-Length header",
                )
            })?;
            content_length = Some(parsed);
        }
    }

    let content_length = content_length.ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "Missing Content-Length header",
        )
    })?;
    let mut payload = vec![0_u8; content_length];
    reader.read_exact(&mut payload).await?;

    Ok(Some((parse_payload(&payload), Framing::Headers)))
}

fn parse_payload(payload: &[u8]) -> Incoming {
    match serde_json::from_slice(payload) {
        Ok(value) => Incoming::Message(value),
        Err(e) => Incoming::Malformed(format!("Invalid JSON payload: {e}")),
    }
}

pub async fn write_message<W>(
    writer: &mut W,
    value: &Value,
    framing: Framing,
) -> Result<(), std::io::Error>
where
    W: AsyncWrite + Unpin,
{
    let body = serde_json::to_vec(value).map_err(|e| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Failed to serialize JSON: {e}"),
        )
    })?;
    match framing {
        Framing::Headers => {
            let header = format!(
                "Content-Length: {}\r\nContent-Type: application/json\r\n\r\n",
                body.len()
            );
            writer.write_all(header.as_bytes()).await?;
            writer.write_all(&body).await?;
        }
        Framing::Lines => {
            writer.write_all(&body).await?;
            writer.write_all(b"\n").await?;
        }
    }
    writer.flush().await?;
    Ok(())
}
