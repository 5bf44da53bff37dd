//! Request clients.
//!
//! Two calling conventions over the same machinery: [`RequestClient`] settles with
//! `Result<Extracted, ApiError>`, [`FlatRequestClient`] with a [`FlatResponse`].
//! Implementation details are split into submodules under `src/client/`.

pub mod builder;
pub mod cancel;
pub mod classify;
pub mod core;
mod execution;
pub mod failure;
pub mod instance;
pub mod policy;
pub mod state;
pub mod types;

pub use builder::RequestClientBuilder;
pub use cancel::CancellationRegistry;
pub use classify::{classify, extract, Classification};
pub use core::{Coordinator, PendingRequest};
pub use instance::{create_flat_request, create_request, FlatRequestClient, RequestClient};
pub use policy::{AttemptFailure, IdempotentRetryPolicy, NoRetry, RetryDecision, RetryPolicy};
pub use state::StateBag;
pub use types::{
    ExtractLevel, Extracted, FlatResponse, PreparedRequest, RequestBody, RequestDescriptor,
    RequestId, ResponseBody, ResponseEnvelope, ResponseType,
};
