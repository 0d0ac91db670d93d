use actix_web::{HttpResponse, ResponseError, http::StatusCode, http::header::ContentType, web};
use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{AccessTier, UserType};
use crate::routes::helpers::{e500, error_chain_fmt, render_template};
use crate::session_state::TypedSession;

use super::home::{ArticleCard, recent_articles};

#[derive(thiserror::Error)]
pub enum ArticleError {
    #[error("There is no article with id {0}.")]
    NotFound(Uuid),
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl std::fmt::Debug for ArticleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for ArticleError {
    fn status_code(&self) -> StatusCode {
        match self {
            ArticleError::NotFound(_) => StatusCode::NOT_FOUND,
            ArticleError::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(sqlx::FromRow, serde::Serialize)]
struct ArticleRecord {
    id: Uuid,
    title: String,
    summary: String,
    body_html: String,
    image_url: Option<String>,
    access_tier: String,
    ai_generated_percent: i16,
    ai_generated_ai_refined_percent: i16,
    human_written_ai_refined_percent: i16,
    human_written_percent: i16,
    author_email: Option<String>,
    published_on: String,
}

pub async fn articles_index(
    session: TypedSession,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, actix_web::Error> {
    let articles: Vec<ArticleCard> = recent_articles(&pool, 50).await.map_err(e500)?;
    let logged_in = session.get_user_id().map_err(e500)?.is_some();

    let mut ctx = tera::Context::new();
    ctx.insert("articles", &articles);
    ctx.insert("logged_in", &logged_in);

    let page = render_template(ctx, "articles.html");
    Ok(HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(page))
}

#[tracing::instrument(name = "Render article page", skip(session, pool))]
pub async fn article_page(
    id: web::Path<Uuid>,
    session: TypedSession,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, ArticleError> {
    let article_id = id.into_inner();
    let mut article = get_article(&pool, article_id)
        .await
        .context("Failed to fetch the article from the database.")?
        .ok_or(ArticleError::NotFound(article_id))?;

    let tier = AccessTier::parse(&article.access_tier)
        .map_err(|e| anyhow::anyhow!("Invalid stored access tier: {e}"))?;
    let viewer = session
        .get_user_type()
        .unwrap_or(None)
        .unwrap_or(UserType::Free);
    let locked = tier == AccessTier::Paid && !viewer.has_paid_access();

    // The body never reaches the template context for a locked view.
    let body_html = std::mem::take(&mut article.body_html);

    let mut ctx = tera::Context::new();
    ctx.insert("article", &article);
    ctx.insert("locked", &locked);
    ctx.insert("body_html", if locked { "" } else { body_html.as_str() });

    let page = render_template(ctx, "article.html");
    Ok(HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(page))
}

#[tracing::instrument(name = "Get article", skip(pool))]
async fn get_article(pool: &PgPool, id: Uuid) -> Result<Option<ArticleRecord>, sqlx::Error> {
    sqlx::query_as::<_, ArticleRecord>(
        r#"
        SELECT a.id, a.title, a.abstract AS summary, a.body_html, a.image_url, a.access_tier,
               a.ai_generated_percent, a.ai_generated_ai_refined_percent,
               a.human_written_ai_refined_percent, a.human_written_percent,
               u.email AS author_email,
               to_char(a.created_at, 'FMMonth DD, YYYY') AS published_on
        FROM articles a
        LEFT JOIN users u ON u.user_id = a.author_id
        WHERE a.id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}
