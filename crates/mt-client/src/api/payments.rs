use super::{keys, paths, PAYMENTS_QUERY};
use crate::client::MediTurnos;
use crate::error::ApiError;
use crate::request::RequestDescriptor;
use mt_common::{AppointmentRequest, Payment};
use serde_json::Value;
use tracing::info;

/// Appointment payments, from the patient's and the professional's side.
pub struct PaymentsApi<'a> {
    client: &'a MediTurnos,
}

impl<'a> PaymentsApi<'a> {
    pub(crate) fn new(client: &'a MediTurnos) -> Self {
        Self { client }
    }

    pub async fn mine(&self) -> Result<Vec<Payment>, ApiError> {
        self.list(keys::my_payments(), paths::MY_PAYMENTS).await
    }

    pub async fn professional(&self) -> Result<Vec<Payment>, ApiError> {
        self.list(keys::professional_payments(), paths::PROFESSIONAL_PAYMENTS)
            .await
    }

    pub async fn pay(&self, appointment_id: i64) -> Result<Value, ApiError> {
        let descriptor =
            RequestDescriptor::put(paths::PAY_APPOINTMENT).json(&AppointmentRequest { appointment_id })?;
        let result = self
            .client
            .mutate(
                descriptor,
                &[keys::my_payments(), keys::professional_payments()],
            )
            .await?;
        info!(appointment_id, "Appointment paid");
        Ok(result)
    }

    async fn list(
        &self,
        key: crate::cache::QueryKey,
        path: &'static str,
    ) -> Result<Vec<Payment>, ApiError> {
        let requester = self.client.requester();
        self.client
            .cache()
            .fetch(key, PAYMENTS_QUERY, move || async move {
                let payments: Option<Vec<Payment>> =
                    requester.execute(RequestDescriptor::get(path)).await?;
                Ok(payments.unwrap_or_default())
            })
            .await
    }
}
