use actix_web::{HttpResponse, http::header::ContentType};

use crate::routes::helpers::prepare_html_template;
use crate::session_state::TypedSession;

use super::helpers::e500;

pub async fn consulting(session: TypedSession) -> Result<HttpResponse, actix_web::Error> {
    let logged_in = session.get_user_id().map_err(e500)?.is_some();
    let page = prepare_html_template(
        &[("logged_in", if logged_in { "true" } else { "" })],
        "consulting.html",
    );
    Ok(HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(page))
}

pub async fn pricing(session: TypedSession) -> Result<HttpResponse, actix_web::Error> {
    let logged_in = session.get_user_id().map_err(e500)?.is_some();
    let page = prepare_html_template(
        &[("logged_in", if logged_in { "true" } else { "" })],
        "pricing.html",
    );
    Ok(HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(page))
}
