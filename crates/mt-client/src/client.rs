//! High-level MediTurnos client

use crate::api::{
    AppointmentsApi, AuthApi, HistoryApi, PatientsApi, PaymentsApi, ReviewsApi,
};
use crate::cache::{QueryCache, QueryKey};
use crate::config::ClientConfig;
use crate::error::{ApiError, ClientError};
use crate::http::{HttpClient, LogSessionObserver, SessionObserver};
use crate::request::{RequestDescriptor, Requester};
use crate::token_store::TokenStore;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// MediTurnos API client
///
/// Cloning is cheap; clones share the token store, HTTP connection pool
/// and query cache.
#[derive(Debug, Clone)]
pub struct MediTurnos {
    requester: Requester,
    cache: Arc<QueryCache>,
    tokens: TokenStore,
}

impl MediTurnos {
    /// Create a client that only logs when a session expires.
    pub fn new(config: ClientConfig, tokens: TokenStore) -> Result<Self, ClientError> {
        Self::with_observer(config, tokens, Arc::new(LogSessionObserver))
    }

    /// Create a client that notifies `observer` when a session expires.
    pub fn with_observer(
        config: ClientConfig,
        tokens: TokenStore,
        observer: Arc<dyn SessionObserver>,
    ) -> Result<Self, ClientError> {
        let cache = Arc::new(QueryCache::new().with_retry_delay(config.retry_delay));

        let observer = Arc::new(ForgetCachedData {
            cache: cache.clone(),
            inner: observer,
        });
        let http = HttpClient::new(&config, tokens.clone())?.with_observer(observer);

        Ok(Self {
            requester: Requester::new(Arc::new(http)),
            cache,
            tokens,
        })
    }

    pub fn auth(&self) -> AuthApi<'_> {
        AuthApi::new(self)
    }

    pub fn patients(&self) -> PatientsApi<'_> {
        PatientsApi::new(self)
    }

    pub fn history(&self) -> HistoryApi<'_> {
        HistoryApi::new(self)
    }

    pub fn reviews(&self) -> ReviewsApi<'_> {
        ReviewsApi::new(self)
    }

    pub fn payments(&self) -> PaymentsApi<'_> {
        PaymentsApi::new(self)
    }

    pub fn appointments(&self) -> AppointmentsApi<'_> {
        AppointmentsApi::new(self)
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn requester(&self) -> &Requester {
        &self.requester
    }

    /// Run a write, then drop the cached reads it affects.
    pub(crate) async fn mutate<T>(
        &self,
        descriptor: RequestDescriptor,
        invalidates: &[QueryKey],
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        let result = self.requester.execute(descriptor).await?;
        for key in invalidates {
            self.cache.invalidate(key);
        }
        Ok(result)
    }
}

/// Cached reads belong to the user whose session just ended.
struct ForgetCachedData {
    cache: Arc<QueryCache>,
    inner: Arc<dyn SessionObserver>,
}

#[async_trait]
impl SessionObserver for ForgetCachedData {
    async fn session_expired(&self, login_path: &str) {
        self.cache.clear();
        self.inner.session_expired(login_path).await;
    }
}
