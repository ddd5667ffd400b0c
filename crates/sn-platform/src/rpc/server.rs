//! Server side of the framed RPC transport: request extractors and
//! response bodies for axum handlers.

use std::convert::Infallible;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::{FromRequest, Request};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use futures::stream::{self, BoxStream, Stream, StreamExt};
use serde::de::DeserializeOwned;
use serde::Serialize;

use sn_common::REQUEST_ID_HEADER;

use super::codec::{decode_frames, Frame, FrameDecoder, FrameError, FrameKind, CONTENT_TYPE, TIMEOUT_HEADER};
use super::status::{Code, RpcStatus};
use crate::shared::error::{PlatformError, Result};
use crate::usecase::ExecutionContext;

/// Request envelope rebuilt from the call headers.
pub fn context_from_headers(headers: &HeaderMap) -> ExecutionContext {
    let ctx = match headers.get(REQUEST_ID_HEADER).and_then(|v| v.to_str().ok()) {
        Some(id) if !id.is_empty() => ExecutionContext::with_request_id(id),
        _ => ExecutionContext::create(),
    };

    match headers
        .get(TIMEOUT_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
    {
        Some(ms) => ctx.with_timeout(Duration::from_millis(ms)),
        None => ctx,
    }
}

/// A status-only response, used for rejected calls.
#[derive(Debug)]
pub struct RpcRejection(pub RpcStatus);

impl From<FrameError> for RpcRejection {
    fn from(err: FrameError) -> Self {
        RpcRejection(RpcStatus::invalid_argument(err.to_string()))
    }
}

impl IntoResponse for RpcRejection {
    fn into_response(self) -> Response {
        framed(Body::from(Frame::status(&self.0).encode()))
    }
}

fn framed(body: Body) -> Response {
    (StatusCode::OK, [(header::CONTENT_TYPE, CONTENT_TYPE)], body).into_response()
}

/// A unary call: one message in, decoded.
pub struct RpcRequest<T>(pub ExecutionContext, pub T);

impl<S, T> FromRequest<S> for RpcRequest<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = RpcRejection;

    async fn from_request(req: Request, state: &S) -> std::result::Result<Self, Self::Rejection> {
        let ctx = context_from_headers(req.headers());
        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| RpcRejection(RpcStatus::invalid_argument(e.body_text())))?;

        let mut decoder = FrameDecoder::new();
        decoder.extend(&body);
        let frame = decoder.next_frame()?.ok_or(FrameError::Truncated)?;
        if frame.kind != FrameKind::Message {
            return Err(FrameError::Unexpected(frame.kind).into());
        }
        if !decoder.is_empty() {
            return Err(RpcRejection(RpcStatus::invalid_argument("unary call carries more than one frame")));
        }
        Ok(RpcRequest(ctx, frame.decode()?))
    }
}

/// A client-streaming call: a leading message followed by raw chunks.
pub struct RpcUpload<T> {
    pub ctx: ExecutionContext,
    pub head: T,
    pub chunks: BoxStream<'static, std::result::Result<Bytes, FrameError>>,
}

impl<S, T> FromRequest<S> for RpcUpload<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = RpcRejection;

    async fn from_request(req: Request, _state: &S) -> std::result::Result<Self, Self::Rejection> {
        let ctx = context_from_headers(req.headers());
        let mut frames = decode_frames(req.into_body().into_data_stream());

        let head = match frames.next().await {
            Some(Ok(frame)) if frame.kind == FrameKind::Message => frame.decode()?,
            Some(Ok(frame)) => return Err(FrameError::Unexpected(frame.kind).into()),
            Some(Err(err)) => return Err(err.into()),
            None => return Err(FrameError::Truncated.into()),
        };

        let chunks = frames
            .map(|frame| match frame {
                Ok(frame) if frame.kind == FrameKind::Chunk => Ok(frame.payload),
                Ok(frame) => Err(FrameError::Unexpected(frame.kind)),
                Err(err) => Err(err),
            })
            .boxed();

        Ok(RpcUpload { ctx, head, chunks })
    }
}

/// Reply to a unary call.
pub struct Unary<T>(pub Result<T>);

impl<T: Serialize> IntoResponse for Unary<T> {
    fn into_response(self) -> Response {
        let mut body = Vec::new();
        let status = match self.0 {
            Ok(reply) => match Frame::message(&reply) {
                Ok(frame) => {
                    body.extend_from_slice(&frame.encode());
                    RpcStatus::ok()
                }
                Err(err) => RpcStatus::new(Code::Internal, err.to_string()),
            },
            Err(err) => RpcStatus::from(&err),
        };
        body.extend_from_slice(&Frame::status(&status).encode());
        framed(Body::from(body))
    }
}

/// Reply to a server-streaming call. Items are written as they are
/// produced; the first error ends the stream with its status.
pub fn streaming<S, T>(items: S) -> Response
where
    S: Stream<Item = Result<T>> + Send + 'static,
    T: Serialize + Send + 'static,
{
    let frames = stream::unfold(Some(items.boxed()), |state| async move {
        let mut items = state?;
        let frame = match items.next().await {
            Some(Ok(item)) => match Frame::message(&item) {
                Ok(frame) => return Some((frame.encode(), Some(items))),
                Err(err) => Frame::status(&RpcStatus::new(Code::Internal, err.to_string())),
            },
            Some(Err(err)) => Frame::status(&RpcStatus::from(&err)),
            None => Frame::status(&RpcStatus::ok()),
        };
        Some((frame.encode(), None))
    });

    framed(Body::from_stream(frames.map(Ok::<_, Infallible>)))
}

/// Collect the chunks of an upload, rejecting bodies above `limit` bytes
/// as soon as they cross it.
pub async fn read_chunks(
    mut chunks: BoxStream<'static, std::result::Result<Bytes, FrameError>>,
    limit: usize,
) -> Result<Bytes> {
    let mut data = Vec::new();
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk.map_err(|e| PlatformError::validation(e.to_string()))?;
        if data.len() + chunk.len() > limit {
            return Err(PlatformError::PayloadTooLarge { limit });
        }
        data.extend_from_slice(&chunk);
    }
    Ok(Bytes::from(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use http_body_util::BodyExt;

    async fn frames_of(response: Response) -> Vec<Frame> {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let mut decoder = FrameDecoder::new();
        decoder.extend(&body);
        let mut frames = Vec::new();
        while let Some(frame) = decoder.next_frame().unwrap() {
            frames.push(frame);
        }
        frames
    }

    #[test]
    fn test_context_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static("req-9"));
        headers.insert(TIMEOUT_HEADER, HeaderValue::from_static("1500"));
        let ctx = context_from_headers(&headers);
        assert_eq!(ctx.request_id, "req-9");
        assert!(ctx.remaining().unwrap() <= Duration::from_millis(1500));

        let ctx = context_from_headers(&HeaderMap::new());
        assert!(!ctx.request_id.is_empty());
        assert!(ctx.deadline.is_none());
    }

    #[tokio::test]
    async fn test_unary_reply_frames() {
        let frames = frames_of(Unary(Ok(serde_json::json!({"id": 1}))).into_response()).await;
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].kind, FrameKind::Message);
        assert!(frames[1].decode::<RpcStatus>().unwrap().is_ok());

        let frames = frames_of(Unary::<serde_json::Value>(Err(PlatformError::not_found("user", 3))).into_response()).await;
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].decode::<RpcStatus>().unwrap().code, Code::NotFound);
    }

    #[tokio::test]
    async fn test_streaming_stops_at_first_error() {
        let items = stream::iter(vec![
            Ok(1),
            Ok(2),
            Err(PlatformError::validation("boom")),
            Ok(3),
        ]);
        let frames = frames_of(streaming(items)).await;
        assert_eq!(frames.len(), 3);
        let status: RpcStatus = frames[2].decode().unwrap();
        assert_eq!(status.code, Code::InvalidArgument);
    }

    #[tokio::test]
    async fn test_read_chunks_enforces_limit() {
        let chunks = stream::iter(vec![Ok(Bytes::from_static(b"abcd")), Ok(Bytes::from_static(b"ef"))]).boxed();
        assert_eq!(read_chunks(chunks, 6).await.unwrap(), Bytes::from_static(b"abcdef"));

        let chunks = stream::iter(vec![Ok(Bytes::from_static(b"abcd")), Ok(Bytes::from_static(b"efg"))]).boxed();
        assert!(matches!(
            read_chunks(chunks, 6).await,
            Err(PlatformError::PayloadTooLarge { limit: 6 })
        ));
    }
}
