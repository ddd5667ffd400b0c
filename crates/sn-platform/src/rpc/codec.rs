//! Frame codec
//!
//! A call body is a sequence of frames: `kind: u8 | length: u32 BE | payload`.
//! `Message` frames carry one JSON-encoded wire message, `Chunk` frames carry
//! raw upload bytes and exactly one `Status` frame closes every response.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use futures::stream::{self, BoxStream, Stream, StreamExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use super::status::RpcStatus;

pub const CONTENT_TYPE: &str = "application/x-sonora-rpc";
pub const TIMEOUT_HEADER: &str = "rpc-timeout-ms";

pub const HEADER_LEN: usize = 5;
pub const MAX_FRAME_LEN: usize = 4 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Message = 0,
    Chunk = 1,
    Status = 2,
}

impl FrameKind {
    fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(FrameKind::Message),
            1 => Some(FrameKind::Chunk),
            2 => Some(FrameKind::Status),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("unknown frame kind {0}")]
    UnknownKind(u8),

    #[error("frame of {0} bytes exceeds the {max} byte limit", max = MAX_FRAME_LEN)]
    TooLarge(usize),

    #[error("stream ended inside a frame")]
    Truncated,

    #[error("unexpected {0:?} frame")]
    Unexpected(FrameKind),

    #[error("stream ended without a status frame")]
    MissingStatus,

    #[error("transport: {0}")]
    Transport(String),

    #[error("malformed payload: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub kind: FrameKind,
    pub payload: Bytes,
}

impl Frame {
    pub fn message<T: Serialize>(message: &T) -> Result<Self, FrameError> {
        Ok(Self {
            kind: FrameKind::Message,
            payload: Bytes::from(serde_json::to_vec(message)?),
        })
    }

    pub fn chunk(data: Bytes) -> Self {
        Self {
            kind: FrameKind::Chunk,
            payload: data,
        }
    }

    pub fn status(status: &RpcStatus) -> Self {
        // A status is plain strings and enums; serialisation cannot fail.
        let payload = serde_json::to_vec(status).unwrap_or_else(|_| br#"{"code":"INTERNAL","message":""}"#.to_vec());
        Self {
            kind: FrameKind::Status,
            payload: Bytes::from(payload),
        }
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, FrameError> {
        Ok(serde_json::from_slice(&self.payload)?)
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(HEADER_LEN + self.payload.len());
        buf.put_u8(self.kind as u8);
        buf.put_u32(self.payload.len() as u32);
        buf.put_slice(&self.payload);
        buf.freeze()
    }
}

/// Incremental decoder fed with arbitrary body chunks.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: BytesMut,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Next complete frame, or `None` until more bytes arrive.
    pub fn next_frame(&mut self) -> Result<Option<Frame>, FrameError> {
        if self.buf.len() < HEADER_LEN {
            return Ok(None);
        }

        let kind = FrameKind::from_u8(self.buf[0]).ok_or(FrameError::UnknownKind(self.buf[0]))?;
        let len = u32::from_be_bytes([self.buf[1], self.buf[2], self.buf[3], self.buf[4]]) as usize;
        if len > MAX_FRAME_LEN {
            return Err(FrameError::TooLarge(len));
        }
        if self.buf.len() < HEADER_LEN + len {
            return Ok(None);
        }

        self.buf.advance(HEADER_LEN);
        let payload = self.buf.split_to(len).freeze();
        Ok(Some(Frame { kind, payload }))
    }
}

/// Turn a byte stream into a frame stream. The stream stops after the first
/// error.
pub fn decode_frames<S, E>(body: S) -> BoxStream<'static, Result<Frame, FrameError>>
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let state = (Box::pin(body), FrameDecoder::new(), false);

    stream::unfold(state, |(mut body, mut decoder, failed)| async move {
        if failed {
            return None;
        }
        loop {
            match decoder.next_frame() {
                Ok(Some(frame)) => return Some((Ok(frame), (body, decoder, false))),
                Ok(None) => {}
                Err(err) => return Some((Err(err), (body, decoder, true))),
            }

            match body.next().await {
                Some(Ok(chunk)) => decoder.extend(&chunk),
                Some(Err(err)) => {
                    return Some((Err(FrameError::Transport(err.to_string())), (body, decoder, true)));
                }
                None if decoder.is_empty() => return None,
                None => return Some((Err(FrameError::Truncated), (body, decoder, true))),
            }
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::status::Code;

    #[test]
    fn test_header_layout() {
        let frame = Frame::chunk(Bytes::from_static(b"abc"));
        assert_eq!(&frame.encode()[..], &[1, 0, 0, 0, 3, b'a', b'b', b'c']);
    }

    #[test]
    fn test_decoder_waits_for_complete_frames() {
        let encoded = Frame::chunk(Bytes::from_static(b"hello")).encode();
        let mut decoder = FrameDecoder::new();

        decoder.extend(&encoded[..3]);
        assert!(decoder.next_frame().unwrap().is_none());
        decoder.extend(&encoded[3..7]);
        assert!(decoder.next_frame().unwrap().is_none());
        decoder.extend(&encoded[7..]);

        let frame = decoder.next_frame().unwrap().unwrap();
        assert_eq!(frame.payload, Bytes::from_static(b"hello"));
        assert!(decoder.is_empty());
    }

    #[test]
    fn test_decoder_rejects_unknown_kind_and_oversize() {
        let mut decoder = FrameDecoder::new();
        decoder.extend(&[9, 0, 0, 0, 0]);
        assert!(matches!(decoder.next_frame(), Err(FrameError::UnknownKind(9))));

        let mut decoder = FrameDecoder::new();
        decoder.extend(&[0, 0xFF, 0xFF, 0xFF, 0xFF]);
        assert!(matches!(decoder.next_frame(), Err(FrameError::TooLarge(_))));
    }

    #[tokio::test]
    async fn test_decode_frames_across_chunk_boundaries() {
        let mut body = BytesMut::new();
        body.extend_from_slice(&Frame::message(&serde_json::json!({"id": 1})).unwrap().encode());
        body.extend_from_slice(&Frame::status(&RpcStatus::ok()).encode());
        let body = body.freeze();

        // Deliver one byte at a time.
        let pieces: Vec<Result<Bytes, std::io::Error>> = (0..body.len()).map(|i| Ok(body.slice(i..i + 1))).collect();
        let frames: Vec<_> = decode_frames(stream::iter(pieces)).collect().await;

        assert_eq!(frames.len(), 2);
        let first = frames[0].as_ref().unwrap();
        assert_eq!(first.kind, FrameKind::Message);
        assert_eq!(first.decode::<serde_json::Value>().unwrap()["id"], 1);
        let status: RpcStatus = frames[1].as_ref().unwrap().decode().unwrap();
        assert_eq!(status.code, Code::Ok);
    }

    #[tokio::test]
    async fn test_decode_frames_reports_truncation() {
        let encoded = Frame::chunk(Bytes::from_static(b"hello")).encode();
        let pieces: Vec<Result<Bytes, std::io::Error>> = vec![Ok(encoded.slice(..6))];
        let frames: Vec<_> = decode_frames(stream::iter(pieces)).collect().await;
        assert_eq!(frames.len(), 1);
        assert!(matches!(frames[0], Err(FrameError::Truncated)));
    }
}
