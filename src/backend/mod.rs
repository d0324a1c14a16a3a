//! Backend client for the three widget endpoints.
//!
//! - [`ChatBackend`]: the seam the widget talks through
//! - [`HttpBackend`]: `reqwest` implementation against a live server
//! - [`types`]: request/response bodies

mod http;
pub mod types;

pub use http::HttpBackend;
pub use types::{ChatReply, ChatRequest, ClearReply, SetRoleReply, SetRoleRequest};

use async_trait::async_trait;

use crate::error::Result;

/// Remote side of the widget.
///
/// An `Err` is a transport failure (network, non-2xx status, undecodable
/// body). Application failures come back as `Ok` with `success == false`.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// `POST /chat`.
    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply>;

    /// `POST /clear` with an empty body.
    async fn clear(&self) -> Result<ClearReply>;

    /// `POST /set_role`.
    async fn set_role(&self, request: &SetRoleRequest) -> Result<SetRoleReply>;
}
