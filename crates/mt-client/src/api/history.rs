//! Medical histories

use super::{keys, paths, HISTORY_LIST_QUERY, PATIENT_HISTORY_QUERY};
use crate::cache::QueryKey;
use crate::client::MediTurnos;
use crate::error::ApiError;
use crate::request::RequestDescriptor;
use mt_common::{DeleteMedicalHistoryRequest, MedicalHistory, NewMedicalHistory};
use serde_json::Value;
use tracing::debug;

pub struct HistoryApi<'a> {
    client: &'a MediTurnos,
}

impl<'a> HistoryApi<'a> {
    pub(crate) fn new(client: &'a MediTurnos) -> Self {
        Self { client }
    }

    pub async fn create(&self, history: &NewMedicalHistory) -> Result<Value, ApiError> {
        let descriptor = RequestDescriptor::post(paths::CREATE_HISTORY).json(history)?;
        self.client
            .mutate(descriptor, &affected(&history.patient_email))
            .await
    }

    pub async fn update(&self, history: &MedicalHistory) -> Result<Value, ApiError> {
        let descriptor = RequestDescriptor::put(paths::UPDATE_HISTORY).json(history)?;
        self.client
            .mutate(descriptor, &affected(&history.patient_email))
            .await
    }

    pub async fn delete(&self, id: i64, patient_email: &str) -> Result<Value, ApiError> {
        let descriptor =
            RequestDescriptor::delete(paths::DELETE_HISTORY).json(&DeleteMedicalHistoryRequest {
                id,
                patient_email: patient_email.to_string(),
            })?;
        self.client.mutate(descriptor, &affected(patient_email)).await
    }

    /// The patient's history, or `None` when the patient has none yet.
    pub async fn for_patient(&self, email: &str) -> Result<Option<MedicalHistory>, ApiError> {
        let requester = self.client.requester();
        self.client
            .cache()
            .fetch(
                keys::patient_history(Some(email)),
                PATIENT_HISTORY_QUERY,
                move || async move {
                    let descriptor =
                        RequestDescriptor::get(paths::PATIENT_HISTORY).query("pacienteMail", email);
                    match requester.execute::<Option<MedicalHistory>>(descriptor).await {
                        Err(e) if is_missing_history(&e) => {
                            debug!(patient = %email, "Patient has no history yet");
                            Ok(None)
                        }
                        other => other,
                    }
                },
            )
            .await
    }

    /// Every history written by the signed-in professional.
    pub async fn mine(&self) -> Result<Vec<MedicalHistory>, ApiError> {
        let requester = self.client.requester();
        self.client
            .cache()
            .fetch(keys::my_histories(), HISTORY_LIST_QUERY, move || async move {
                let histories: Option<Vec<MedicalHistory>> = requester
                    .execute(RequestDescriptor::get(paths::MY_HISTORIES))
                    .await?;
                Ok(histories.unwrap_or_default())
            })
            .await
    }
}

fn affected(patient_email: &str) -> [QueryKey; 2] {
    [keys::my_histories(), keys::patient_history(Some(patient_email))]
}

/// The backend reports "no history" as a 404, or sometimes a 500, whose
/// message says it was not found.
fn is_missing_history(error: &ApiError) -> bool {
    matches!(error.status, 404 | 500) && error.message.to_lowercase().contains("no encontr")
}
