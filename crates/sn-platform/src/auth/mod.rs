//! Authentication
//!
//! Token issuing and verification, password hashing, the account store
//! behind the Authorization RPC service, and the agent the API server uses
//! to reach it.

pub mod account_service;
pub mod agent;
pub mod api;
pub mod password_service;
pub mod rpc;
pub mod token_service;

pub use account_service::AccountService;
pub use agent::{AuthAgent, RpcAuthAgent};
pub use api::{auth_router, csrf_router, AuthState};
pub use password_service::{Argon2Config, PasswordPolicy, PasswordService};
pub use rpc::authorization_rpc_router;
pub use token_service::{TokenConfig, TokenService};
