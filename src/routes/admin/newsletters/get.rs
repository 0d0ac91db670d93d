use actix_web::{HttpResponse, http::header::ContentType, web};
use actix_web_flash_messages::IncomingFlashMessages;
use sqlx::PgPool;
use uuid::Uuid;

use crate::routes::helpers::{e500, get_message, render_template};

#[derive(sqlx::FromRow, serde::Serialize)]
pub struct NewsletterRow {
    pub id: Uuid,
    pub title: String,
    pub subject: String,
    pub body_html: String,
    pub body_text: String,
    pub access_tier: String,
    pub status: String,
    pub recipient_count: i32,
    pub created_on: String,
    pub scheduled_for: Option<String>,
    pub sent_on: Option<String>,
}

pub async fn admin_newsletters(
    pool: web::Data<PgPool>,
    flash_messages: IncomingFlashMessages,
) -> Result<HttpResponse, actix_web::Error> {
    let newsletters = list_newsletters(&pool).await.map_err(e500)?;

    let mut ctx = tera::Context::new();
    ctx.insert("newsletters", &newsletters);
    ctx.insert("message", &get_message(&flash_messages, None));

    let page = render_template(ctx, "admin/newsletters.html");
    Ok(HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(page))
}

pub async fn newsletter_form(
    flash_messages: IncomingFlashMessages,
) -> Result<HttpResponse, actix_web::Error> {
    let mut ctx = tera::Context::new();
    ctx.insert("action", "/admin/newsletters");
    ctx.insert("message", &get_message(&flash_messages, None));

    let page = render_template(ctx, "admin/newsletter_form.html");
    Ok(HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(page))
}

pub async fn edit_newsletter_form(
    id: web::Path<Uuid>,
    pool: web::Data<PgPool>,
    flash_messages: IncomingFlashMessages,
) -> Result<HttpResponse, actix_web::Error> {
    let newsletter_id = id.into_inner();
    let newsletter = get_newsletter(&pool, newsletter_id)
        .await
        .map_err(e500)?
        .ok_or_else(|| actix_web::error::ErrorNotFound("Unknown newsletter."))?;

    let mut ctx = tera::Context::new();
    ctx.insert("action", &format!("/admin/newsletters/{newsletter_id}"));
    ctx.insert("newsletter", &newsletter);
    ctx.insert("message", &get_message(&flash_messages, None));

    let page = render_template(ctx, "admin/newsletter_form.html");
    Ok(HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(page))
}

#[tracing::instrument(name = "List newsletters", skip(pool))]
async fn list_newsletters(pool: &PgPool) -> Result<Vec<NewsletterRow>, sqlx::Error> {
    sqlx::query_as::<_, NewsletterRow>(
        r#"
        SELECT id, title, subject, body_html, body_text, access_tier, status, recipient_count,
               to_char(created_at, 'FMMonth DD, YYYY') AS created_on,
               to_char(scheduled_at, 'FMMonth DD, YYYY HH24:MI') AS scheduled_for,
               to_char(sent_at, 'FMMonth DD, YYYY HH24:MI') AS sent_on
        FROM newsletters
        ORDER BY created_at DESC
        "#,
    )
    .fetch_all(pool)
    .await
}

#[tracing::instrument(name = "Get newsletter for editing", skip(pool))]
pub(super) async fn get_newsletter(
    pool: &PgPool,
    id: Uuid,
) -> Result<Option<NewsletterRow>, sqlx::Error> {
    sqlx::query_as::<_, NewsletterRow>(
        r#"
        SELECT id, title, subject, body_html, body_text, access_tier, status, recipient_count,
               to_char(created_at, 'FMMonth DD, YYYY') AS created_on,
               to_char(scheduled_at, 'FMMonth DD, YYYY HH24:MI') AS scheduled_for,
               to_char(sent_at, 'FMMonth DD, YYYY HH24:MI') AS sent_on
        FROM newsletters
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}
