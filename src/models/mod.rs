//! Request and Response models for the cache server API
//!
//! DTOs used for serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

pub use requests::{DeleteManyRequest, ReplaceRequest, SetRequest, TtlRequest};
pub use responses::{
    DeleteResponse, ErrorResponse, FlushResponse, GetResponse, HealthResponse, ReplaceResponse,
    SetResponse, SimilarResponse, StatsResponse, TtlResponse, UpdateResponse,
};
