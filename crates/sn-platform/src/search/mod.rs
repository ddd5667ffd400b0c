//! Search
//!
//! The API server forwards queries to the Search service ([`agent`],
//! [`service`]); the Search service answers from [`repository`].

pub mod agent;
pub mod api;
pub mod entity;
pub mod repository;
pub mod rpc;
pub mod service;

pub use agent::{RpcSearchAgent, SearchAgent};
pub use api::{search_router, SearchState};
pub use entity::{SearchKind, SearchResults, MAX_AMOUNT};
pub use repository::{PgSearchRepository, SearchIndex};
pub use rpc::search_rpc_router;
pub use service::SearchService;
