//! Reviews of professionals
//!
//! Patients review a professional after an appointment; reviews are only
//! public once an admin approves them.

use super::{keys, paths, ALL_REVIEWS_QUERY, APPOINTMENT_REVIEW_QUERY, REVIEW_QUERY};
use crate::client::MediTurnos;
use crate::error::ApiError;
use crate::request::RequestDescriptor;
use mt_common::{IdRequest, NewReview, Review};
use serde_json::Value;

pub struct ReviewsApi<'a> {
    client: &'a MediTurnos,
}

impl<'a> ReviewsApi<'a> {
    pub(crate) fn new(client: &'a MediTurnos) -> Self {
        Self { client }
    }

    /// Every review, approved or not. Admin only.
    pub async fn all(&self) -> Result<Vec<Review>, ApiError> {
        let requester = self.client.requester();
        self.client
            .cache()
            .fetch(keys::all_reviews(), ALL_REVIEWS_QUERY, move || async move {
                let reviews: Option<Vec<Review>> = requester
                    .execute(RequestDescriptor::get(paths::ALL_REVIEWS))
                    .await?;
                Ok(reviews.unwrap_or_default())
            })
            .await
    }

    pub async fn approve(&self, id: i64) -> Result<Value, ApiError> {
        let descriptor = RequestDescriptor::put(paths::APPROVE_REVIEW).json(&IdRequest { id })?;
        self.client
            .mutate(
                descriptor,
                &[keys::all_reviews(), keys::professional_reviews(None)],
            )
            .await
    }

    pub async fn delete(&self, id: i64) -> Result<Value, ApiError> {
        let descriptor = RequestDescriptor::delete(paths::DELETE_REVIEW).json(&IdRequest { id })?;
        self.client
            .mutate(
                descriptor,
                &[keys::all_reviews(), keys::professional_reviews(None)],
            )
            .await
    }

    pub async fn for_professional(&self, email: &str) -> Result<Vec<Review>, ApiError> {
        let requester = self.client.requester();
        self.client
            .cache()
            .fetch(
                keys::professional_reviews(Some(email)),
                REVIEW_QUERY,
                move || async move {
                    let descriptor = RequestDescriptor::get(paths::PROFESSIONAL_REVIEWS)
                        .query("profesionalMail", email);
                    let reviews: Option<Vec<Review>> = requester.execute(descriptor).await?;
                    Ok(reviews.unwrap_or_default())
                },
            )
            .await
    }

    pub async fn create(&self, review: &NewReview) -> Result<Value, ApiError> {
        let descriptor = RequestDescriptor::post(paths::CREATE_REVIEW).json(review)?;
        self.client
            .mutate(
                descriptor,
                &[
                    keys::appointment_review(review.appointment_id),
                    keys::professional_reviews(None),
                    keys::all_reviews(),
                ],
            )
            .await
    }

    /// The review left for an appointment, if any.
    pub async fn for_appointment(&self, appointment_id: i64) -> Result<Option<Review>, ApiError> {
        let requester = self.client.requester();
        self.client
            .cache()
            .fetch(
                keys::appointment_review(appointment_id),
                APPOINTMENT_REVIEW_QUERY,
                move || async move {
                    let descriptor = RequestDescriptor::get(paths::APPOINTMENT_REVIEW)
                        .query("idTurno", appointment_id);
                    requester.execute(descriptor).await
                },
            )
            .await
    }
}
