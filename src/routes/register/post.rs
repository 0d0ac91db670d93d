use actix_web::{HttpResponse, web};
use actix_web_flash_messages::FlashMessage;
use anyhow::Context;
use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use uuid::Uuid;

use crate::activity::{ActivityKind, log_activity};
use crate::authentication::compute_password_hash;
use crate::domain::{SubscriberEmail, UserType};
use crate::routes::helpers::{e500, see_other};
use crate::session_state::TypedSession;
use crate::telemetry::spawn_blocking_with_tracing;

#[derive(serde::Deserialize)]
pub struct FormData {
    email: String,
    password: SecretString,
    password_check: SecretString,
}

#[tracing::instrument(
    name = "Register a new user",
    skip(form, pool, session),
    fields(email = %form.email)
)]
pub async fn register(
    form: web::Form<FormData>,
    pool: web::Data<PgPool>,
    session: TypedSession,
) -> Result<HttpResponse, actix_web::Error> {
    let email = match SubscriberEmail::parse(form.0.email) {
        Ok(email) => email,
        Err(_) => {
            FlashMessage::error("Please enter a valid email address.").send();
            return Ok(see_other("/register"));
        }
    };

    if form.0.password.expose_secret() != form.0.password_check.expose_secret() {
        FlashMessage::error("You entered two different passwords - the field values must match.")
            .send();
        return Ok(see_other("/register"));
    }

    let password_length = form.0.password.expose_secret().len();
    if !(12..=128).contains(&password_length) {
        FlashMessage::error(
            "The password should be longer than 12 characters but shorter than 128 characters.",
        )
        .send();
        return Ok(see_other("/register"));
    }

    if email_is_taken(&pool, &email).await.map_err(e500)? {
        FlashMessage::error("An account with this email already exists.").send();
        return Ok(see_other("/register"));
    }

    let password = form.0.password;
    let password_hash = spawn_blocking_with_tracing(move || compute_password_hash(password))
        .await
        .context("Failed to spawn blocking task.")
        .map_err(e500)?
        .map_err(e500)?;

    let user_id = insert_user(&pool, &email, &password_hash)
        .await
        .context("Failed to insert a new user in the database.")
        .map_err(e500)?;

    log_activity(
        &pool,
        ActivityKind::UserRegistered,
        &format!("New registration: {}", email.as_ref()),
        None,
        Some(user_id),
    )
    .await
    .map_err(|e| tracing::warn!(error = %e, "Failed to record registration activity."))
    .ok();

    session.renew();
    session
        .insert_user(user_id, UserType::Free)
        .map_err(e500)?;

    Ok(see_other("/"))
}

#[tracing::instrument(name = "Check email availability", skip(pool))]
async fn email_is_taken(pool: &PgPool, email: &SubscriberEmail) -> Result<bool, sqlx::Error> {
    let existing: Option<(Uuid,)> = sqlx::query_as(
        r#"
        SELECT user_id FROM users WHERE email = $1
        "#,
    )
    .bind(email.as_ref())
    .fetch_optional(pool)
    .await?;

    Ok(existing.is_some())
}

#[tracing::instrument(name = "Insert new user", skip(pool, password_hash))]
async fn insert_user(
    pool: &PgPool,
    email: &SubscriberEmail,
    password_hash: &SecretString,
) -> Result<Uuid, sqlx::Error> {
    let user_id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO users
            (user_id, email, password_hash, user_type, newsletter_subscribed,
             receive_free_newsletters, receive_paid_newsletters, created_at)
        VALUES ($1, $2, $3, 'free_user', TRUE, TRUE, TRUE, now())
        "#,
    )
    .bind(user_id)
    .bind(email.as_ref())
    .bind(password_hash.expose_secret())
    .execute(pool)
    .await?;

    Ok(user_id)
}
