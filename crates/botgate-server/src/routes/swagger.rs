//! OpenAPI Documentation
//!
//! Centralized API documentation using utoipa.

use utoipa::OpenApi;

use crate::models::{MessengerResponse, ProfileResponse};

#[derive(OpenApi)]
#[openapi(
    paths(
        super::webhook::receive_webhook,
        super::messenger::activate_messenger,
        super::messenger::deactivate_messenger,
        super::messenger::messenger_profile,
    ),
    components(schemas(MessengerResponse, ProfileResponse)),
    tags(
        (name = "Webhook", description = "Inbound platform webhooks"),
        (name = "Messenger", description = "Operator webhook switching and diagnostics")
    )
)]
pub struct ApiDoc;
