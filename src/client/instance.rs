//! The two calling conventions over one [`Coordinator`].

use crate::client::builder::RequestClientBuilder;
use crate::client::core::{Coordinator, PendingRequest};
use crate::client::state::StateBag;
use crate::client::types::{Extracted, FlatResponse, RequestDescriptor, RequestId};
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::interceptors::RequestHooks;
use crate::Result;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Throwing client: calls settle with `Ok(value)` or `Err(ApiError)`.
#[derive(Clone)]
pub struct RequestClient {
    inner: Arc<Coordinator>,
}

impl RequestClient {
    pub fn builder() -> RequestClientBuilder {
        RequestClientBuilder::new()
    }

    pub(crate) fn from_coordinator(inner: Arc<Coordinator>) -> Self {
        Self { inner }
    }

    pub async fn request(
        &self,
        descriptor: RequestDescriptor,
    ) -> std::result::Result<Extracted, ApiError> {
        self.inner.dispatch(descriptor).send().await
    }

    /// Request and deserialize the extracted value.
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        descriptor: RequestDescriptor,
    ) -> std::result::Result<T, ApiError> {
        self.request(descriptor).await?.json()
    }

    /// Dispatch without sending, to learn the identity before the call settles.
    pub fn dispatch(&self, descriptor: RequestDescriptor) -> PendingRequest {
        self.inner.dispatch(descriptor)
    }

    pub fn cancel_request(&self, id: &RequestId) -> bool {
        self.inner.cancel(id)
    }

    pub fn cancel_all(&self) -> usize {
        self.inner.cancel_all()
    }

    pub fn state(&self) -> &StateBag {
        self.inner.state()
    }

    pub fn coordinator(&self) -> &Arc<Coordinator> {
        &self.inner
    }
}

/// Structured-result client: calls always resolve to a [`FlatResponse`].
#[derive(Clone)]
pub struct FlatRequestClient {
    inner: Arc<Coordinator>,
}

impl FlatRequestClient {
    pub fn builder() -> RequestClientBuilder {
        RequestClientBuilder::new()
    }

    pub(crate) fn from_coordinator(inner: Arc<Coordinator>) -> Self {
        Self { inner }
    }

    pub async fn request(&self, descriptor: RequestDescriptor) -> FlatResponse {
        self.inner.dispatch(descriptor).send_flat().await
    }

    pub fn dispatch(&self, descriptor: RequestDescriptor) -> PendingRequest {
        self.inner.dispatch(descriptor)
    }

    pub fn cancel_request(&self, id: &RequestId) -> bool {
        self.inner.cancel(id)
    }

    pub fn cancel_all(&self) -> usize {
        self.inner.cancel_all()
    }

    pub fn state(&self) -> &StateBag {
        self.inner.state()
    }

    pub fn coordinator(&self) -> &Arc<Coordinator> {
        &self.inner
    }
}

/// Throwing client from a base configuration and a hook bundle.
pub fn create_request(config: ClientConfig, hooks: Arc<dyn RequestHooks>) -> Result<RequestClient> {
    RequestClientBuilder::new()
        .with_config(config)
        .with_hooks(hooks)
        .build()
}

/// Structured-result client from a base configuration and a hook bundle.
pub fn create_flat_request(
    config: ClientConfig,
    hooks: Arc<dyn RequestHooks>,
) -> Result<FlatRequestClient> {
    RequestClientBuilder::new()
        .with_config(config)
        .with_hooks(hooks)
        .build_flat()
}
