//! Length-prefixed frame encoding.
//!
//! Each frame is a 4-byte big-endian length followed by a JSON document:
//!
//! ```text
//! +----------------+------------------+
//! | length (4 BE)  |  JSON payload    |
//! +----------------+------------------+
//! ```
//!
//! [`read_frame`] and [`write_frame`] move one frame over a tokio stream.

use serde::{Serialize, de::DeserializeOwned};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{ProtocolError, ProtocolResult};

/// Encodes a message, rejecting payloads larger than `max` bytes.
///
/// ```rust
/// use rested_protocol::{Envelope, MAX_MESSAGE_SIZE, encode_message_limited};
///
/// let bytes = encode_message_limited(&Envelope::new("req-1", 42), MAX_MESSAGE_SIZE).unwrap();
/// let len = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
/// assert_eq!(len as usize, bytes.len() - 4);
/// ```
pub fn encode_message_limited<T: Serialize>(message: &T, max: u32) -> ProtocolResult<Vec<u8>> {
    let json = serde_json::to_vec(message)?;
    let len = check_len(json.len(), max)?;

    let mut buffer = Vec::with_capacity(4 + json.len());
    buffer.extend_from_slice(&len.to_be_bytes());
    buffer.extend_from_slice(&json);
    Ok(buffer)
}

fn check_len(len: usize, max: u32) -> ProtocolResult<u32> {
    match u32::try_from(len) {
        Ok(len) if len <= max => Ok(len),
        _ => Err(ProtocolError::MessageTooLarge {
            size: u32::try_from(len).unwrap_or(u32::MAX),
            max,
        }),
    }
}

fn check_incoming(len: u32, max: u32) -> ProtocolResult<usize> {
    if len > max {
        return Err(ProtocolError::MessageTooLarge { size: len, max });
    }
    if len == 0 {
        return Err(ProtocolError::EmptyMessage);
    }
    Ok(len as usize)
}

/// Reads one frame from an async stream.
///
/// Returns `Ok(None)` on a clean end of stream before any byte of the frame.
pub async fn read_frame<R, T>(reader: &mut R, max: u32) -> ProtocolResult<Option<T>>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = check_incoming(u32::from_be_bytes(len_buf), max)?;
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(Some(serde_json::from_slice(&payload)?))
}

/// Writes and flushes one frame to an async stream.
pub async fn write_frame<W, T>(writer: &mut W, message: &T, max: u32) -> ProtocolResult<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let data = encode_message_limited(message, max)?;
    writer.write_all(&data).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::{RequestMethod, StatusCode};
    use crate::uri::Uri;
    use crate::MAX_MESSAGE_SIZE;
    use crate::wire::{Envelope, ReplyBody, WireReply, WireRequest};

    fn request(id: &str) -> Envelope<WireRequest> {
        Envelope::new(
            id,
            WireRequest::new(RequestMethod::Get, "http://h/a", Some(r#"{ "a" : 1 }"#.into())),
        )
    }

    #[test]
    fn length_prefix_matches_payload() {
        let bytes = encode_message_limited(&request("r"), MAX_MESSAGE_SIZE).unwrap();
        let len = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        assert_eq!(len as usize, bytes.len() - 4);

        let decoded: Envelope<WireRequest> = serde_json::from_slice(&bytes[4..]).unwrap();
        assert_eq!(decoded, request("r"));
    }

    #[test]
    fn encode_enforces_limit() {
        let result = encode_message_limited(&request("r"), 8);
        assert!(matches!(
            result,
            Err(ProtocolError::MessageTooLarge { max: 8, .. })
        ));
    }

    #[tokio::test]
    async fn async_reader_rejects_empty_frame() {
        let (mut client, mut server) = tokio::io::duplex(64);
        client.write_all(&0u32.to_be_bytes()).await.unwrap();
        let result: ProtocolResult<Option<Envelope<WireRequest>>> =
            read_frame(&mut server, MAX_MESSAGE_SIZE).await;
        assert!(matches!(result, Err(ProtocolError::EmptyMessage)));
    }

    #[tokio::test]
    async fn async_reader_rejects_oversized_prefix() {
        let (mut client, mut server) = tokio::io::duplex(64);
        client
            .write_all(&(MAX_MESSAGE_SIZE + 1).to_be_bytes())
            .await
            .unwrap();
        let result: ProtocolResult<Option<Envelope<WireRequest>>> =
            read_frame(&mut server, MAX_MESSAGE_SIZE).await;
        assert!(matches!(result, Err(ProtocolError::MessageTooLarge { .. })));
    }

    #[tokio::test]
    async fn async_round_trip_over_duplex() {
        let (mut client, mut server) = tokio::io::duplex(4096);
        let uri = Uri::parse("http://h/a").unwrap();
        let reply = Envelope::new("1", WireReply::new(StatusCode::Accepted, &uri, ReplyBody::Empty));

        write_frame(&mut client, &request("1"), MAX_MESSAGE_SIZE)
            .await
            .unwrap();
        let received: Envelope<WireRequest> = read_frame(&mut server, MAX_MESSAGE_SIZE)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received, request("1"));

        write_frame(&mut server, &reply, MAX_MESSAGE_SIZE).await.unwrap();
        let back: Envelope<WireReply> = read_frame(&mut client, MAX_MESSAGE_SIZE)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(back.payload.status, 202);

        drop(server);
        let eof: Option<Envelope<WireReply>> = read_frame(&mut client, MAX_MESSAGE_SIZE)
            .await
            .unwrap();
        assert!(eof.is_none());
    }

    #[tokio::test]
    async fn async_reader_enforces_limit() {
        let (mut client, mut server) = tokio::io::duplex(4096);
        write_frame(&mut client, &request("1"), MAX_MESSAGE_SIZE)
            .await
            .unwrap();
        let result: ProtocolResult<Option<Envelope<WireRequest>>> =
            read_frame(&mut server, 8).await;
        assert!(matches!(result, Err(ProtocolError::MessageTooLarge { max: 8, .. })));
    }
}
