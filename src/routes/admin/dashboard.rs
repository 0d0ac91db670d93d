use actix_web::{HttpResponse, http::header::ContentType, web};
use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

use crate::activity::recent_activities;
use crate::authentication::UserId;
use crate::routes::helpers::{e500, render_template};

#[derive(serde::Serialize)]
struct ActivityView {
    kind: String,
    title: String,
    description: String,
    logged_at: String,
}

pub async fn admin_dashboard(
    user_id: web::ReqData<UserId>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, actix_web::Error> {
    let email = get_user_email(**user_id, &pool).await.map_err(e500)?;

    let subscriber_count = count(&pool, "SELECT COUNT(*) FROM users WHERE user_type IN ('free_user', 'paid_user')")
        .await
        .map_err(e500)?;
    let article_count = count(&pool, "SELECT COUNT(*) FROM articles")
        .await
        .map_err(e500)?;
    let newsletter_count = count(&pool, "SELECT COUNT(*) FROM newsletters")
        .await
        .map_err(e500)?;
    let delivered_count = count(
        &pool,
        "SELECT COUNT(*) FROM newsletter_sends WHERE status = 'sent'",
    )
    .await
    .map_err(e500)?;

    let activities: Vec<ActivityView> = recent_activities(&pool, 10)
        .await
        .map_err(e500)?
        .into_iter()
        .map(|a| ActivityView {
            kind: a.kind,
            title: a.title,
            description: a.description.unwrap_or_default(),
            logged_at: a.created_at.format("%b %e, %Y %H:%M").to_string(),
        })
        .collect();

    let mut ctx = tera::Context::new();
    ctx.insert("email", &email);
    ctx.insert("subscriber_count", &subscriber_count);
    ctx.insert("article_count", &article_count);
    ctx.insert("newsletter_count", &newsletter_count);
    ctx.insert("delivered_count", &delivered_count);
    ctx.insert("activities", &activities);

    let page = render_template(ctx, "admin/dashboard.html");
    Ok(HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(page))
}

async fn count(pool: &PgPool, query: &str) -> Result<i64, sqlx::Error> {
    let (value,): (i64,) = sqlx::query_as(query).fetch_one(pool).await?;
    Ok(value)
}

#[tracing::instrument(name = "Get user email", skip(pool))]
pub async fn get_user_email(user_id: Uuid, pool: &PgPool) -> Result<String, anyhow::Error> {
    let (email,): (String,) = sqlx::query_as(
        r#"
        SELECT email
        FROM users
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
    .context("Failed to perform a query to retrieve the user's email.")?;

    Ok(email)
}
