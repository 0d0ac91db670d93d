use actix_web::{HttpResponse, http::header::ContentType, web};
use actix_web_flash_messages::{IncomingFlashMessages, Level};
use uuid::Uuid;

use crate::routes::helpers::{get_message, prepare_html_template};

#[derive(serde::Deserialize)]
pub struct Parameters {
    email: Option<String>,
    user_id: Option<String>,
}

pub async fn unsubscribe_form(
    parameters: web::Query<Parameters>,
    flash_messages: IncomingFlashMessages,
) -> HttpResponse {
    let error_string = get_message(&flash_messages, Some(Level::Error));
    let info_string = get_message(&flash_messages, Some(Level::Info));

    let email = parameters.0.email.unwrap_or_default();
    let user_id = parameters
        .0
        .user_id
        .as_deref()
        .and_then(|raw| Uuid::parse_str(raw).ok())
        .map(|id| id.to_string())
        .unwrap_or_default();

    let invalid_link = email.trim().is_empty() && user_id.is_empty();

    let page = prepare_html_template(
        &[
            ("email", &email),
            ("user_id", &user_id),
            ("error", &error_string),
            ("info", &info_string),
            ("invalid_link", if invalid_link { "true" } else { "" }),
        ],
        "unsubscribe.html",
    );

    HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(page)
}
