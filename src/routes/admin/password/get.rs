use actix_web::{HttpResponse, http::header::ContentType};
use actix_web_flash_messages::{IncomingFlashMessages, Level};

use crate::routes::helpers::{get_message, prepare_html_template};

pub async fn change_password_form(
    flash_messages: IncomingFlashMessages,
) -> Result<HttpResponse, actix_web::Error> {
    let error_string = get_message(&flash_messages, Some(Level::Error));
    let info_string = get_message(&flash_messages, Some(Level::Info));

    let page = prepare_html_template(
        &[("error", &error_string), ("info", &info_string)],
        "admin/change_password_form.html",
    );
    Ok(HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(page))
}
