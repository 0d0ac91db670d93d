use actix_web::{HttpResponse, web};
use actix_web_flash_messages::FlashMessage;
use sqlx::PgPool;
use sqlx::postgres::PgQueryResult;
use uuid::Uuid;

use crate::activity::{ActivityKind, log_activity};
use crate::routes::helpers::{e500, see_other};

#[derive(serde::Deserialize)]
pub struct FormData {
    email: Option<String>,
    // Arrives as an empty string when the link carried no profile id.
    user_id: Option<String>,
    // Checkboxes arrive as "on" when ticked and are absent otherwise.
    unsubscribe_free: Option<String>,
    unsubscribe_paid: Option<String>,
    unsubscribe_all: Option<String>,
}

#[tracing::instrument(
    name = "Update newsletter preferences",
    skip(form, pool),
    fields(user_id=tracing::field::Empty)
)]
pub async fn unsubscribe(
    form: web::Form<FormData>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, actix_web::Error> {
    let email = form.0.email.unwrap_or_default();
    let user_id = form
        .0
        .user_id
        .as_deref()
        .and_then(|raw| Uuid::parse_str(raw).ok());

    if user_id.is_none() && email.trim().is_empty() {
        FlashMessage::error(
            "Invalid unsubscribe link. Please check your email for the correct link.",
        )
        .send();
        return Ok(see_other("/unsubscribe"));
    }
    if let Some(user_id) = user_id {
        tracing::Span::current().record("user_id", tracing::field::display(&user_id));
    }

    let unsubscribe_all = form.0.unsubscribe_all.is_some();
    let stop_free = unsubscribe_all || form.0.unsubscribe_free.is_some();
    let stop_paid = unsubscribe_all || form.0.unsubscribe_paid.is_some();

    let result = update_preferences(&pool, user_id, &email, unsubscribe_all, stop_free, stop_paid)
        .await
        .map_err(e500)?;

    if result.rows_affected() == 0 {
        FlashMessage::error("We could not find a matching subscription.").send();
        return Ok(see_other("/unsubscribe"));
    }

    log_activity(
        &pool,
        ActivityKind::UserUnsubscribed,
        &unsubscribe_title(&email, user_id),
        Some(&describe_change(unsubscribe_all, stop_free, stop_paid)),
        user_id,
    )
    .await
    .map_err(|e| tracing::warn!(error = %e, "Failed to record unsubscribe activity."))
    .ok();

    FlashMessage::info("Your newsletter preferences have been updated.").send();
    Ok(see_other("/unsubscribe"))
}

fn unsubscribe_title(email: &str, user_id: Option<Uuid>) -> String {
    if email.trim().is_empty() {
        format!("Unsubscribed: {}", user_id.unwrap_or_default())
    } else {
        format!("Unsubscribed: {email}")
    }
}

fn describe_change(unsubscribe_all: bool, stop_free: bool, stop_paid: bool) -> String {
    if unsubscribe_all {
        "Unsubscribed from all newsletters".to_string()
    } else {
        format!(
            "free newsletters: {}, paid newsletters: {}",
            if stop_free { "off" } else { "on" },
            if stop_paid { "off" } else { "on" }
        )
    }
}

#[tracing::instrument(name = "Update stored preferences", skip(pool, email))]
async fn update_preferences(
    pool: &PgPool,
    user_id: Option<Uuid>,
    email: &str,
    unsubscribe_all: bool,
    stop_free: bool,
    stop_paid: bool,
) -> Result<PgQueryResult, sqlx::Error> {
    // The original matches by profile id when the link carries one and
    // falls back to the email address otherwise.
    match user_id {
        Some(user_id) => {
            sqlx::query(
                r#"
                UPDATE users
                SET newsletter_subscribed = newsletter_subscribed AND NOT $1,
                    receive_free_newsletters = NOT $2,
                    receive_paid_newsletters = NOT $3
                WHERE user_id = $4
                "#,
            )
            .bind(unsubscribe_all)
            .bind(stop_free)
            .bind(stop_paid)
            .bind(user_id)
            .execute(pool)
            .await
        }
        None => {
            sqlx::query(
                r#"
                UPDATE users
                SET newsletter_subscribed = newsletter_subscribed AND NOT $1,
                    receive_free_newsletters = NOT $2,
                    receive_paid_newsletters = NOT $3
                WHERE email = $4
                "#,
            )
            .bind(unsubscribe_all)
            .bind(stop_free)
            .bind(stop_paid)
            .bind(email)
            .execute(pool)
            .await
        }
    }
}
