use actix_web::{HttpResponse, http::header::ContentType, web};
use sqlx::PgPool;
use uuid::Uuid;

use crate::routes::helpers::{e500, render_template};
use crate::session_state::TypedSession;

#[derive(sqlx::FromRow, serde::Serialize)]
pub struct ArticleCard {
    pub id: Uuid,
    pub title: String,
    pub summary: String,
    pub image_url: Option<String>,
    pub access_tier: String,
    pub published_on: String,
}

pub async fn home(
    session: TypedSession,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, actix_web::Error> {
    let articles = recent_articles(&pool, 6).await.map_err(e500)?;
    let logged_in = session.get_user_id().map_err(e500)?.is_some();

    let mut ctx = tera::Context::new();
    ctx.insert("featured", &articles.first());
    ctx.insert("articles", &articles.get(1..).unwrap_or_default());
    ctx.insert("logged_in", &logged_in);

    let page = render_template(ctx, "home.html");
    Ok(HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(page))
}

#[tracing::instrument(name = "Get recent articles", skip(pool))]
pub async fn recent_articles(pool: &PgPool, limit: i64) -> Result<Vec<ArticleCard>, sqlx::Error> {
    sqlx::query_as::<_, ArticleCard>(
        r#"
        SELECT id, title, abstract AS summary, image_url, access_tier,
               to_char(created_at, 'FMMonth DD, YYYY') AS published_on
        FROM articles
        ORDER BY created_at DESC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}
