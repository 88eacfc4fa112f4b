//! Best-effort in-app notifications.
//!
//! A failed notification never fails the action that triggered it.

use serde_json::{json, Value};
use sqlx::PgPool;

use crate::models::{kinds, NotificationRepository, Offer, RequestStatus};

pub async fn notify(db: &PgPool, user_id: i64, kind: &str, data: Value) {
    if let Err(e) = NotificationRepository::create(db, user_id, kind, &data).await {
        tracing::error!(user_id, kind, error = %e, "Failed to store notification");
    }
}

pub async fn new_application(
    db: &PgPool,
    owner_id: i64,
    offer: &Offer,
    request_id: i64,
    provider_name: &str,
) {
    let data = json!({
        "service_request_id": request_id,
        "offer_id": offer.id,
        "offer_title": offer.title,
        "provider_name": provider_name,
        "message": format!("{provider_name} applied to your offer \"{}\"", offer.title),
    });
    notify(db, owner_id, kinds::NEW_APPLICATION, data).await;
}

pub async fn new_invitation(
    db: &PgPool,
    provider_id: i64,
    offer: &Offer,
    request_id: i64,
    client_name: &str,
) {
    let data = json!({
        "service_request_id": request_id,
        "offer_id": offer.id,
        "offer_title": offer.title,
        "client_name": client_name,
        "message": format!("{client_name} invited you to the offer \"{}\"", offer.title),
    });
    notify(db, provider_id, kinds::NEW_INVITATION, data).await;
}

pub async fn request_status_changed(
    db: &PgPool,
    recipient_id: i64,
    request_id: i64,
    offer_title: &str,
    status: RequestStatus,
) {
    let data = json!({
        "service_request_id": request_id,
        "offer_title": offer_title,
        "status": status.as_str(),
        "message": format!("Request for \"{offer_title}\" is now {}", status.as_str()),
    });
    notify(db, recipient_id, kinds::REQUEST_STATUS, data).await;
}

pub async fn account_warning(db: &PgPool, user_id: i64, reason: &str) {
    let data = json!({
        "reason": reason,
        "message": format!("Your account received a warning: {reason}"),
    });
    notify(db, user_id, kinds::ACCOUNT_WARNING, data).await;
}
