//! Client side of the framed RPC transport.

use std::marker::PhantomData;
use std::time::Duration;

use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use sn_common::REQUEST_ID_HEADER;

use super::codec::{decode_frames, Frame, FrameError, FrameKind, CONTENT_TYPE, TIMEOUT_HEADER};
use super::status::RpcStatus;
use crate::shared::error::{PlatformError, Result};
use crate::usecase::ExecutionContext;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// One persistent HTTP/2 connection to a sibling service.
#[derive(Clone)]
pub struct RpcChannel {
    client: Client,
    base_url: String,
    service: &'static str,
}

impl RpcChannel {
    /// Plaintext HTTP/2 with prior knowledge; only for use inside the cluster.
    pub fn connect(base_url: &str, service: &'static str) -> Result<Self> {
        let client = Client::builder()
            .http2_prior_knowledge()
            .pool_max_idle_per_host(1)
            .connect_timeout(CONNECT_TIMEOUT)
            .tcp_keepalive(Duration::from_secs(30))
            .build()
            .map_err(|e| PlatformError::internal(format!("failed to build {} client: {}", service, e)))?;

        info!(service, base_url, "RPC channel configured");
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            service,
        })
    }

    pub fn service(&self) -> &'static str {
        self.service
    }

    fn transport_error(&self, err: reqwest::Error) -> PlatformError {
        if err.is_timeout() {
            PlatformError::upstream(self.service, "deadline exceeded")
        } else {
            PlatformError::upstream(self.service, err.to_string())
        }
    }

    fn frame_error(&self, err: FrameError) -> PlatformError {
        PlatformError::upstream(self.service, err.to_string())
    }

    fn request(&self, ctx: &ExecutionContext, method: &str) -> Result<RequestBuilder> {
        let url = format!("{}/{}/{}", self.base_url, self.service, method);
        let mut builder = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, CONTENT_TYPE)
            .header(REQUEST_ID_HEADER, &ctx.request_id);

        if let Some(remaining) = ctx.remaining() {
            if remaining.is_zero() {
                return Err(PlatformError::upstream(self.service, "deadline exceeded"));
            }
            builder = builder
                .timeout(remaining)
                .header(TIMEOUT_HEADER, remaining.as_millis().to_string());
        }
        Ok(builder)
    }

    async fn send(&self, builder: RequestBuilder, method: &str) -> Result<BoxStream<'static, std::result::Result<Frame, FrameError>>> {
        let response = builder.send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(PlatformError::upstream(
                self.service,
                format!("{} answered HTTP {}", method, status),
            ));
        }
        Ok(decode_frames(response.bytes_stream()))
    }

    pub async fn unary<Req, Resp>(&self, ctx: &ExecutionContext, method: &str, request: &Req) -> Result<Resp>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        debug!(service = self.service, method, request_id = %ctx.request_id, "RPC unary call");
        let frame = Frame::message(request).map_err(|e| self.frame_error(e))?;
        let builder = self.request(ctx, method)?.body(frame.encode());
        let frames = self.send(builder, method).await?;

        let mut replies = RpcStream::new(frames, self.service);
        let reply = replies
            .message()
            .await?
            .ok_or_else(|| PlatformError::upstream(self.service, format!("{} returned no reply", method)))?;
        replies.finish().await?;
        Ok(reply)
    }

    pub async fn server_streaming<Req, Resp>(
        &self,
        ctx: &ExecutionContext,
        method: &str,
        request: &Req,
    ) -> Result<RpcStream<Resp>>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        debug!(service = self.service, method, request_id = %ctx.request_id, "RPC streaming call");
        let frame = Frame::message(request).map_err(|e| self.frame_error(e))?;
        let builder = self.request(ctx, method)?.body(frame.encode());
        let frames = self.send(builder, method).await?;
        Ok(RpcStream::new(frames, self.service))
    }

    /// Send `head` as the first message, then every chunk as a `Chunk` frame.
    pub async fn client_streaming<Head, Resp>(
        &self,
        ctx: &ExecutionContext,
        method: &str,
        head: &Head,
        chunks: Vec<Bytes>,
    ) -> Result<Resp>
    where
        Head: Serialize,
        Resp: DeserializeOwned,
    {
        debug!(service = self.service, method, request_id = %ctx.request_id, "RPC client-streaming call");
        let mut frames = Vec::with_capacity(chunks.len() + 1);
        frames.push(Frame::message(head).map_err(|e| self.frame_error(e))?.encode());
        frames.extend(chunks.into_iter().map(|chunk| Frame::chunk(chunk).encode()));
        let body = stream::iter(frames.into_iter().map(Ok::<Bytes, std::io::Error>));

        let builder = self.request(ctx, method)?.body(reqwest::Body::wrap_stream(body));
        let frames = self.send(builder, method).await?;

        let mut replies = RpcStream::new(frames, self.service);
        let reply = replies
            .message()
            .await?
            .ok_or_else(|| PlatformError::upstream(self.service, format!("{} returned no reply", method)))?;
        replies.finish().await?;
        Ok(reply)
    }
}

/// Typed view over a response body.
pub struct RpcStream<T> {
    frames: BoxStream<'static, std::result::Result<Frame, FrameError>>,
    service: &'static str,
    finished: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> RpcStream<T> {
    pub fn new(frames: BoxStream<'static, std::result::Result<Frame, FrameError>>, service: &'static str) -> Self {
        Self {
            frames,
            service,
            finished: false,
            _marker: PhantomData,
        }
    }

    /// Next message; `None` after an OK status. A non-OK status becomes the
    /// mapped error.
    pub async fn message(&mut self) -> Result<Option<T>> {
        if self.finished {
            return Ok(None);
        }

        let frame = match self.frames.next().await {
            Some(Ok(frame)) => frame,
            Some(Err(err)) => {
                self.finished = true;
                return Err(PlatformError::upstream(self.service, err.to_string()));
            }
            None => {
                self.finished = true;
                return Err(PlatformError::upstream(self.service, FrameError::MissingStatus.to_string()));
            }
        };

        match frame.kind {
            FrameKind::Message => frame
                .decode()
                .map(Some)
                .map_err(|e| PlatformError::upstream(self.service, e.to_string())),
            FrameKind::Status => {
                self.finished = true;
                let status: RpcStatus = frame
                    .decode()
                    .map_err(|e| PlatformError::upstream(self.service, e.to_string()))?;
                if status.is_ok() {
                    Ok(None)
                } else {
                    Err(status.into_error(self.service))
                }
            }
            FrameKind::Chunk => {
                self.finished = true;
                Err(PlatformError::upstream(
                    self.service,
                    FrameError::Unexpected(FrameKind::Chunk).to_string(),
                ))
            }
        }
    }

    /// Read up to `limit` messages, stopping early at end-of-stream. Any
    /// error discards what was read so far.
    pub async fn collect(mut self, limit: usize) -> Result<Vec<T>> {
        let mut items = Vec::with_capacity(limit.min(64));
        while items.len() < limit {
            match self.message().await? {
                Some(item) => items.push(item),
                None => break,
            }
        }
        Ok(items)
    }

    /// Expect the closing status and nothing else.
    pub async fn finish(&mut self) -> Result<()> {
        match self.message().await? {
            None => Ok(()),
            Some(_) => Err(PlatformError::upstream(self.service, "unexpected extra message")),
        }
    }
}
