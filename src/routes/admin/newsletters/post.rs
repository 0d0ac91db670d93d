use actix_web::{HttpResponse, web};
use actix_web_flash_messages::FlashMessage;
use anyhow::Context;
use sqlx::PgPool;
use sqlx::types::chrono::{DateTime, NaiveDateTime, Utc};
use uuid::Uuid;

use crate::authentication::UserId;
use crate::domain::{AccessTier, NewsletterStatus};
use crate::routes::helpers::{e500, see_other};

use super::get::get_newsletter;

#[derive(serde::Deserialize)]
pub struct FormData {
    title: String,
    subject: String,
    body_html: String,
    body_text: String,
    access_tier: AccessTier,
    scheduled_at: Option<String>,
}

impl FormData {
    /// The composer submits a `datetime-local` value; an empty string
    /// means "leave it a draft".
    fn scheduled_at(&self) -> Result<Option<DateTime<Utc>>, String> {
        match self.scheduled_at.as_deref().filter(|s| !s.trim().is_empty()) {
            None => Ok(None),
            Some(raw) => NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M")
                .map(|naive| Some(naive.and_utc()))
                .map_err(|_| format!("{raw} is not a valid schedule time.")),
        }
    }
}

#[tracing::instrument(
    name = "Create newsletter",
    skip(form, pool, user_id),
    fields(title = %form.title)
)]
pub async fn create_newsletter(
    form: web::Form<FormData>,
    pool: web::Data<PgPool>,
    user_id: web::ReqData<UserId>,
) -> Result<HttpResponse, actix_web::Error> {
    let scheduled_at = match form.scheduled_at() {
        Ok(scheduled_at) => scheduled_at,
        Err(e) => {
            FlashMessage::error(e).send();
            return Ok(see_other("/admin/newsletters/new"));
        }
    };

    let newsletter_id = Uuid::new_v4();
    let status = if scheduled_at.is_some() {
        "scheduled"
    } else {
        "draft"
    };

    sqlx::query(
        r#"
        INSERT INTO newsletters
            (id, title, subject, body_html, body_text, access_tier, status,
             author_id, scheduled_at, recipient_count, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 0, now(), now())
        "#,
    )
    .bind(newsletter_id)
    .bind(&form.title)
    .bind(&form.subject)
    .bind(&form.body_html)
    .bind(&form.body_text)
    .bind(form.access_tier.as_str())
    .bind(status)
    .bind(**user_id)
    .bind(scheduled_at)
    .execute(pool.get_ref())
    .await
    .context("Failed to insert a new newsletter in the database.")
    .map_err(e500)?;

    let message = if scheduled_at.is_some() {
        "The newsletter has been scheduled."
    } else {
        "The newsletter draft has been saved."
    };
    FlashMessage::info(message).send();
    Ok(see_other("/admin/newsletters"))
}

#[tracing::instrument(
    name = "Update newsletter",
    skip(form, pool),
    fields(title = %form.title)
)]
pub async fn update_newsletter(
    id: web::Path<Uuid>,
    form: web::Form<FormData>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, actix_web::Error> {
    let newsletter_id = id.into_inner();

    let newsletter = get_newsletter(&pool, newsletter_id)
        .await
        .map_err(e500)?
        .ok_or_else(|| actix_web::error::ErrorNotFound("Unknown newsletter."))?;
    let status = NewsletterStatus::parse(&newsletter.status).map_err(e500)?;
    if !status.is_sendable() {
        FlashMessage::error("A sent or cancelled newsletter can no longer be edited.").send();
        return Ok(see_other("/admin/newsletters"));
    }

    let scheduled_at = match form.scheduled_at() {
        Ok(scheduled_at) => scheduled_at,
        Err(e) => {
            FlashMessage::error(e).send();
            return Ok(see_other(&format!(
                "/admin/newsletters/{newsletter_id}/edit"
            )));
        }
    };
    let status = if scheduled_at.is_some() {
        "scheduled"
    } else {
        "draft"
    };

    sqlx::query(
        r#"
        UPDATE newsletters
        SET title = $1, subject = $2, body_html = $3, body_text = $4, access_tier = $5,
            status = $6, scheduled_at = $7, updated_at = now()
        WHERE id = $8
        "#,
    )
    .bind(&form.title)
    .bind(&form.subject)
    .bind(&form.body_html)
    .bind(&form.body_text)
    .bind(form.access_tier.as_str())
    .bind(status)
    .bind(scheduled_at)
    .bind(newsletter_id)
    .execute(pool.get_ref())
    .await
    .map_err(e500)?;

    FlashMessage::info("The newsletter has been updated.").send();
    Ok(see_other("/admin/newsletters"))
}

#[tracing::instrument(name = "Cancel newsletter", skip(pool))]
pub async fn cancel_newsletter(
    id: web::Path<Uuid>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, actix_web::Error> {
    let cancelled = sqlx::query(
        r#"
        UPDATE newsletters
        SET status = 'cancelled', scheduled_at = NULL, updated_at = now()
        WHERE id = $1 AND status IN ('draft', 'scheduled')
        "#,
    )
    .bind(id.into_inner())
    .execute(pool.get_ref())
    .await
    .map_err(e500)?;

    if cancelled.rows_affected() == 0 {
        FlashMessage::error("Only a draft or scheduled newsletter can be cancelled.").send();
    } else {
        FlashMessage::info("The newsletter has been cancelled.").send();
    }
    Ok(see_other("/admin/newsletters"))
}
