//! Client core for the VMS admin console.
//!
//! # Overview
//! Keeps client-side collections of cameras, media servers, transcoding
//! channels and the other admin records in sync with the backend. Two
//! backend flavours are spoken: the legacy paginated REST collections and
//! the FastAPI bulk query plus composite-key REST endpoints.
//!
//! # Design
//! - `VmsClient` is stateless: `build_*` produces an `HttpRequest`,
//!   `parse_*` consumes an `HttpResponse`.
//! - The round-trip happens in a `Transport`. `ReqwestTransport` is the
//!   production one; tests script their own.
//! - `Api` wraps client and transport with request/response logging and the
//!   401 session teardown.
//! - `ApiStoreHelper` is the generic TTL-cached CRUD layer every domain store
//!   in `stores` is configured from.
//! - `Console` builds the whole graph explicitly; there are no globals.

pub mod api;
pub mod client;
pub mod config;
pub mod console;
pub mod error;
pub mod http;
pub mod session;
pub mod store;
pub mod stores;
pub mod transport;
pub mod types;

pub use api::{Api, ApiResponse, FastApi};
pub use client::VmsClient;
pub use config::ApiConfig;
pub use console::Console;
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport};
pub use session::Session;
pub use store::{ApiStoreHelper, CollectionState, Entity, StoreState};
pub use transport::ReqwestTransport;
pub use types::{AuthUser, DbArrayQuery, KeySpec, PaginatedResponse, RecordKey, Table};
