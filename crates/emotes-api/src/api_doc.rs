//! OpenAPI documentation.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::error;
use crate::handlers;
use emotes_core::models;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Emotes API",
        version = "0.1.0",
        description = "Emote upload and processing. Uploads are resized into four renditions in the background; progress is streamed over /v1/ws."
    ),
    paths(
        handlers::emotes::create_emote,
        handlers::emotes::get_emote,
        handlers::emotes::edit_emote,
        handlers::emotes::delete_emote,
        handlers::channels::add_channel_emote,
        handlers::channels::remove_channel_emote,
        handlers::ws::status_stream,
        handlers::health::health_check,
    ),
    components(
        schemas(
            models::EmoteData,
            models::EmoteStatus,
            models::User,
            models::UserRank,
            models::ProcessingUpdate,
            emotes_services::UpdateOptions,
            emotes_services::UpdateOutcome,
            emotes_services::emote::Rejection,
            handlers::emotes::CreateEmoteData,
            handlers::emotes::CreateEmoteForm,
            handlers::emotes::EditEmoteResponse,
            handlers::health::HealthResponse,
            error::ErrorResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "emotes", description = "Emote upload, edit and removal"),
        (name = "channels", description = "Per-channel emote sets"),
        (name = "status", description = "Processing progress stream"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;
