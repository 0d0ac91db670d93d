use actix_web::{HttpResponse, http::header::ContentType, web};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::UserType;
use crate::routes::helpers::{e400, e500, render_template};

#[derive(serde::Deserialize)]
pub struct Filter {
    #[serde(rename = "type")]
    user_type: Option<String>,
}

#[derive(sqlx::FromRow, serde::Serialize)]
struct SubscriberRow {
    user_id: Uuid,
    email: String,
    user_type: String,
    newsletter_subscribed: bool,
    receive_free_newsletters: bool,
    receive_paid_newsletters: bool,
    registered_on: String,
}

pub async fn admin_subscribers(
    filter: web::Query<Filter>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, actix_web::Error> {
    let filter = match filter.0.user_type.as_deref() {
        None | Some("all") => None,
        Some(raw) => Some(UserType::parse(raw).map_err(e400)?),
    };

    let subscribers = list_subscribers(&pool, filter).await.map_err(e500)?;

    let mut ctx = tera::Context::new();
    ctx.insert("subscribers", &subscribers);
    ctx.insert(
        "filter",
        &filter.map(|t| t.as_str().to_owned()).unwrap_or_default(),
    );

    let page = render_template(ctx, "admin/subscribers.html");
    Ok(HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(page))
}

#[tracing::instrument(name = "List subscribers", skip(pool))]
async fn list_subscribers(
    pool: &PgPool,
    filter: Option<UserType>,
) -> Result<Vec<SubscriberRow>, sqlx::Error> {
    match filter {
        None => {
            sqlx::query_as::<_, SubscriberRow>(
                r#"
                SELECT user_id, email, user_type, newsletter_subscribed,
                       receive_free_newsletters, receive_paid_newsletters,
                       to_char(created_at, 'FMMonth DD, YYYY') AS registered_on
                FROM users
                WHERE user_type IN ('free_user', 'paid_user')
                ORDER BY created_at DESC
                "#,
            )
            .fetch_all(pool)
            .await
        }
        Some(user_type) => {
            sqlx::query_as::<_, SubscriberRow>(
                r#"
                SELECT user_id, email, user_type, newsletter_subscribed,
                       receive_free_newsletters, receive_paid_newsletters,
                       to_char(created_at, 'FMMonth DD, YYYY') AS registered_on
                FROM users
                WHERE user_type = $1
                ORDER BY created_at DESC
                "#,
            )
            .bind(user_type.as_str())
            .fetch_all(pool)
            .await
        }
    }
}
