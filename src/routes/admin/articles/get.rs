use actix_web::{HttpResponse, http::header::ContentType, web};
use actix_web_flash_messages::IncomingFlashMessages;
use sqlx::PgPool;
use uuid::Uuid;

use crate::routes::helpers::{e500, get_message, render_template};

#[derive(sqlx::FromRow, serde::Serialize)]
pub struct ArticleRow {
    pub id: Uuid,
    pub title: String,
    pub summary: String,
    pub body_html: String,
    pub image_url: Option<String>,
    pub access_tier: String,
    pub ai_generated_percent: i16,
    pub ai_generated_ai_refined_percent: i16,
    pub human_written_ai_refined_percent: i16,
    pub human_written_percent: i16,
    pub published_on: String,
}

pub async fn admin_articles(
    pool: web::Data<PgPool>,
    flash_messages: IncomingFlashMessages,
) -> Result<HttpResponse, actix_web::Error> {
    let articles = list_articles(&pool).await.map_err(e500)?;

    let mut ctx = tera::Context::new();
    ctx.insert("articles", &articles);
    ctx.insert("message", &get_message(&flash_messages, None));

    let page = render_template(ctx, "admin/articles.html");
    Ok(HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(page))
}

pub async fn article_form(
    flash_messages: IncomingFlashMessages,
) -> Result<HttpResponse, actix_web::Error> {
    let mut ctx = tera::Context::new();
    ctx.insert("action", "/admin/articles");
    ctx.insert("message", &get_message(&flash_messages, None));

    let page = render_template(ctx, "admin/article_form.html");
    Ok(HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(page))
}

pub async fn edit_article_form(
    id: web::Path<Uuid>,
    pool: web::Data<PgPool>,
    flash_messages: IncomingFlashMessages,
) -> Result<HttpResponse, actix_web::Error> {
    let article_id = id.into_inner();
    let article = get_article(&pool, article_id)
        .await
        .map_err(e500)?
        .ok_or_else(|| actix_web::error::ErrorNotFound("Unknown article."))?;

    let mut ctx = tera::Context::new();
    ctx.insert("action", &format!("/admin/articles/{article_id}"));
    ctx.insert("article", &article);
    ctx.insert("message", &get_message(&flash_messages, None));

    let page = render_template(ctx, "admin/article_form.html");
    Ok(HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(page))
}

#[tracing::instrument(name = "List articles for the back office", skip(pool))]
async fn list_articles(pool: &PgPool) -> Result<Vec<ArticleRow>, sqlx::Error> {
    sqlx::query_as::<_, ArticleRow>(
        r#"
        SELECT id, title, abstract AS summary, body_html, image_url, access_tier,
               ai_generated_percent, ai_generated_ai_refined_percent,
               human_written_ai_refined_percent, human_written_percent,
               to_char(created_at, 'FMMonth DD, YYYY') AS published_on
        FROM articles
        ORDER BY created_at DESC
        "#,
    )
    .fetch_all(pool)
    .await
}

#[tracing::instrument(name = "Get article for editing", skip(pool))]
async fn get_article(pool: &PgPool, id: Uuid) -> Result<Option<ArticleRow>, sqlx::Error> {
    sqlx::query_as::<_, ArticleRow>(
        r#"
        SELECT id, title, abstract AS summary, body_html, image_url, access_tier,
               ai_generated_percent, ai_generated_ai_refined_percent,
               human_written_ai_refined_percent, human_written_percent,
               to_char(created_at, 'FMMonth DD, YYYY') AS published_on
        FROM articles
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}
