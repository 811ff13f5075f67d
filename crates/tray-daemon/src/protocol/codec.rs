use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::errors::DaemonError;

/// Read a single JSONL message from an async buffered reader.
///
/// Returns `Ok(None)` at EOF. Blank lines are skipped.
/// Malformed JSON is a `ProtocolError`; the stream stays usable afterwards.
pub async fn read_message<R, T>(reader: &mut R) -> Result<Option<T>, DaemonError>
where
    R: AsyncBufRead + Unpin,
    T: DeserializeOwned,
{
    let mut line = String::new();
    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line).await?;
        if bytes_read == 0 {
            return Ok(None);
        }
        if !line.trim().is_empty() {
            break;
        }
    }

    let trimmed = line.trim();
    let msg: T = serde_json::from_str(trimmed)
        .map_err(|e| DaemonError::ProtocolError(format!("invalid JSON: {}", e)))?;
    Ok(Some(msg))
}

/// Write a single JSONL message and flush.
pub async fn write_message<W, T>(writer: &mut W, msg: &T) -> Result<(), DaemonError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let json = serde_json::to_string(msg)?;
    writer.write_all(json.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tray_core::TrayError;
    use tray_protocol::{ClientMessage, DaemonMessage, PollingStatus};

    #[tokio::test]
    async fn test_written_message_is_one_line() {
        let msg = DaemonMessage::State {
            id: "req-1".to_string(),
            polling: PollingStatus::AuthRequired,
            state: None,
        };

        let mut buf: Vec<u8> = Vec::new();
        write_message(&mut buf, &msg).await.unwrap();

        let text = String::from_utf8(buf).unwrap();
        assert!(text.ends_with('\n'));
        assert_eq!(text.matches('\n').count(), 1);
    }

    #[tokio::test]
    async fn test_read_eof() {
        let buf: &[u8] = b"";
        let mut reader = tokio::io::BufReader::new(buf);
        let result: Option<ClientMessage> = read_message(&mut reader).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_read_invalid_json() {
        let buf: &[u8] = b"not json\n";
        let mut reader = tokio::io::BufReader::new(buf);
        let err = read_message::<_, ClientMessage>(&mut reader)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "protocol_error");
    }

    #[tokio::test]
    async fn test_unknown_type_is_protocol_error() {
        let buf: &[u8] = b"{\"type\":\"reboot\",\"id\":\"1\"}\n";
        let mut reader = tokio::io::BufReader::new(buf);
        let err = read_message::<_, ClientMessage>(&mut reader)
            .await
            .unwrap_err();
        assert!(matches!(err, DaemonError::ProtocolError(_)));
    }

    #[tokio::test]
    async fn test_blank_lines_are_skipped() {
        let buf: &[u8] = b"\n  \n{\"type\":\"ping\",\"id\":\"p\"}\n\n";
        let mut reader = tokio::io::BufReader::new(buf);

        let parsed: ClientMessage = read_message(&mut reader).await.unwrap().unwrap();
        assert_eq!(parsed.id(), "p");

        let rest: Option<ClientMessage> = read_message(&mut reader).await.unwrap();
        assert!(rest.is_none());
    }

    #[tokio::test]
    async fn test_multiple_messages() {
        let mut buf: Vec<u8> = Vec::new();
        write_message(
            &mut buf,
            &ClientMessage::GetState {
                id: "1".to_string(),
            },
        )
        .await
        .unwrap();
        write_message(
            &mut buf,
            &ClientMessage::SetToken {
                id: "2".to_string(),
                token: "t0ken".to_string(),
            },
        )
        .await
        .unwrap();

        let mut reader = tokio::io::BufReader::new(buf.as_slice());

        let first: ClientMessage = read_message(&mut reader).await.unwrap().unwrap();
        assert!(matches!(first, ClientMessage::GetState { .. }));

        let second: ClientMessage = read_message(&mut reader).await.unwrap().unwrap();
        match second {
            ClientMessage::SetToken { id, token } => {
                assert_eq!(id, "2");
                assert_eq!(token, "t0ken");
            }
            other => panic!("wrong variant: {:?}", other),
        }

        let eof: Option<ClientMessage> = read_message(&mut reader).await.unwrap();
        assert!(eof.is_none());
    }
}
