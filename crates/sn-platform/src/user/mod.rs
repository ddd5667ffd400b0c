//! User Aggregate
//!
//! Profiles and credentials. The API server reads and edits users through
//! [`UserAgent`]; [`UserService`] is the implementation behind the User RPC
//! service.

pub mod agent;
pub mod api;
pub mod entity;
pub mod repository;
pub mod rpc;
pub mod service;

pub use agent::{RpcUserAgent, UserAgent};
pub use api::{users_router, UserResponse, UsersState};
pub use entity::{Credentials, NewUser, Sex, User, UserUpdate};
pub use repository::UserRepository;
pub use rpc::user_rpc_router;
pub use service::UserService;
