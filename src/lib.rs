//! # service-request
//!
//! 统一的 HTTP 请求编排层：请求标识、取消、重试、响应解包与归一化错误。
//!
//! Request orchestration between application call sites and an HTTP transport.
//!
//! ## Overview
//!
//! Every outbound call gets a stable identity and a cancellation handle. Transient failures
//! are retried, successful responses are classified and unwrapped at the extraction level the
//! call asked for, and every terminal failure is normalized into one [`ApiError`] shape,
//! surfaced at most once while visible, and tied to session teardown on 401.
//!
//! ## Key Features
//!
//! - **Two calling conventions**: [`RequestClient`] (`Result`) and [`FlatRequestClient`]
//!   (`{ data, error, response }`) over one [`client::Coordinator`]
//! - **Cancellation**: per-identity handles, `cancel_request` / `cancel_all`, caller tokens chained in
//! - **Retry**: network failures and idempotent transient statuses, never a bare 500
//! - **Classification**: pass-through, structured success or unrecognized
//! - **Notification dedup**: identical failure reports are shown once while visible
//! - **Hooks**: pre-request mutation, response transform, error disposition
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use service_request::{ClientConfig, ExtractLevel, RequestClient, RequestDescriptor};
//!
//! #[tokio::main]
//! async fn main() -> service_request::Result<()> {
//!     let client = RequestClient::builder()
//!         .with_config(ClientConfig::new().with_base_url("https://api.example.com/api"))
//!         .build()?;
//!
//!     let user = client
//!         .request(RequestDescriptor::get("/v2/users/1").extract_level(ExtractLevel::Payload))
//!         .await;
//!     match user {
//!         Ok(value) => println!("{}", value.to_value()),
//!         Err(e) => eprintln!("{}", e.to_report_message()),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | Coordinator, clients, retry policy, cancellation, classification |
//! | [`config`] | Client configuration (YAML or code) |
//! | [`error`] | Library errors and the normalized [`ApiError`] |
//! | [`interceptors`] | Request hooks and bearer authorization |
//! | [`notify`] | Notification dedup stack, notifier and localizer interfaces |
//! | [`session`] | Token accessor and 401 session teardown |
//! | [`transport`] | Transport trait and the reqwest implementation |

pub mod client;
pub mod config;
pub mod error;
pub mod error_code;
pub mod interceptors;
pub mod notify;
pub mod session;
pub mod transport;
pub mod utils;

pub use client::{
    create_flat_request, create_request, ExtractLevel, Extracted, FlatRequestClient,
    FlatResponse, RequestClient, RequestClientBuilder, RequestDescriptor, RequestId,
    ResponseType,
};
pub use config::{ClientConfig, RetryConfig};
pub use error::{ApiError, Error, ErrorCode, ErrorContext, ErrorKind};
pub use interceptors::{BearerTokenHooks, ErrorDisposition, RequestHooks};
pub use notify::{Localizer, Notifier, NotifyOptions};
pub use session::{AuthSession, Navigator, SessionStore, TokenStore};
pub use transport::{HttpTransport, Transport};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;
