use super::{keys, paths};
use crate::client::MediTurnos;
use crate::error::ApiError;
use crate::request::RequestDescriptor;
use mt_common::{AppointmentRequest, ExpressAppointmentRequest};
use serde_json::Value;
use tracing::info;

/// Express appointments: requested by anyone, accepted by a professional.
pub struct AppointmentsApi<'a> {
    client: &'a MediTurnos,
}

impl<'a> AppointmentsApi<'a> {
    pub(crate) fn new(client: &'a MediTurnos) -> Self {
        Self { client }
    }

    /// Request an express appointment without an account.
    pub async fn request_express(&self, request: &ExpressAppointmentRequest) -> Result<Value, ApiError> {
        let descriptor = RequestDescriptor::post(paths::REQUEST_EXPRESS)
            .anonymous()
            .json(request)?;
        let result = self.client.requester().execute(descriptor).await?;
        info!(email = %request.email, specialty = %request.specialty, "Express appointment requested");
        Ok(result)
    }

    pub async fn accept_express(&self, appointment_id: i64) -> Result<Value, ApiError> {
        let descriptor =
            RequestDescriptor::put(paths::ACCEPT_EXPRESS).json(&AppointmentRequest { appointment_id })?;
        self.client
            .mutate(descriptor, &[keys::appointments()])
            .await
    }
}
