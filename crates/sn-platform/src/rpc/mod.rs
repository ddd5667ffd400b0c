//! Internal RPC
//!
//! Calls between the API server and the sibling services run over plaintext
//! HTTP/2. Each call is `POST {base}/{Service}/{Method}` with a framed body
//! (see [`codec`]); responses always end with a status frame.

pub mod channel;
pub mod codec;
pub mod messages;
pub mod server;
pub mod status;

pub use channel::{RpcChannel, RpcStream};
pub use codec::{Frame, FrameDecoder, FrameError, FrameKind};
pub use server::{streaming, RpcRejection, RpcRequest, RpcUpload, Unary};
pub use status::{Code, RpcStatus};

pub const AUTHORIZATION_SERVICE: &str = "Authorization";
pub const USER_SERVICE: &str = "User";
pub const SEARCH_SERVICE: &str = "Search";

/// Avatar uploads are streamed in chunks of this size.
pub const UPLOAD_CHUNK_SIZE: usize = 1024;
