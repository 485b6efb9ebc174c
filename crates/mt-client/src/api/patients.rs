use super::{keys, paths, PATIENT_LIST_QUERY};
use crate::client::MediTurnos;
use crate::error::ApiError;
use crate::request::RequestDescriptor;
use mt_common::{UserEmailRequest, UserProfile};
use serde_json::Value;

/// A professional's patients and the users they have blocked.
pub struct PatientsApi<'a> {
    client: &'a MediTurnos,
}

impl<'a> PatientsApi<'a> {
    pub(crate) fn new(client: &'a MediTurnos) -> Self {
        Self { client }
    }

    pub async fn linked(&self) -> Result<Vec<UserProfile>, ApiError> {
        self.list(keys::linked_patients(), paths::LINKED_PATIENTS).await
    }

    pub async fn blocked(&self) -> Result<Vec<UserProfile>, ApiError> {
        self.list(keys::blocked_users(), paths::BLOCKED_USERS).await
    }

    pub async fn block(&self, email: &str) -> Result<Value, ApiError> {
        let descriptor = RequestDescriptor::post(paths::BLOCK_USER).json(&UserEmailRequest {
            email: email.to_string(),
        })?;
        self.client.mutate(descriptor, &affected()).await
    }

    pub async fn unblock(&self, email: &str) -> Result<Value, ApiError> {
        let descriptor = RequestDescriptor::delete(paths::UNBLOCK_USER).json(&UserEmailRequest {
            email: email.to_string(),
        })?;
        self.client.mutate(descriptor, &affected()).await
    }

    async fn list(
        &self,
        key: crate::cache::QueryKey,
        path: &'static str,
    ) -> Result<Vec<UserProfile>, ApiError> {
        let requester = self.client.requester();
        self.client
            .cache()
            .fetch(key, PATIENT_LIST_QUERY, move || async move {
                let users: Option<Vec<UserProfile>> =
                    requester.execute(RequestDescriptor::get(path)).await?;
                Ok(users.unwrap_or_default())
            })
            .await
    }
}

fn affected() -> [crate::cache::QueryKey; 2] {
    [keys::linked_patients(), keys::blocked_users()]
}
