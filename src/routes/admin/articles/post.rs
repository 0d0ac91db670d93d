use actix_web::{HttpResponse, web};
use actix_web_flash_messages::FlashMessage;
use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

use crate::activity::{ActivityKind, log_activity};
use crate::authentication::UserId;
use crate::domain::{AccessTier, AiAttribution};
use crate::routes::helpers::{e500, see_other};

#[derive(serde::Deserialize)]
pub struct FormData {
    title: String,
    #[serde(rename = "abstract")]
    summary: String,
    body_html: String,
    image_url: Option<String>,
    access_tier: AccessTier,
    ai_generated_percent: i16,
    ai_generated_ai_refined_percent: i16,
    human_written_ai_refined_percent: i16,
    human_written_percent: i16,
}

impl FormData {
    fn attribution(&self) -> Result<AiAttribution, String> {
        AiAttribution::parse(
            self.ai_generated_percent,
            self.ai_generated_ai_refined_percent,
            self.human_written_ai_refined_percent,
            self.human_written_percent,
        )
    }

    fn image_url(&self) -> Option<&str> {
        self.image_url.as_deref().filter(|url| !url.trim().is_empty())
    }
}

#[tracing::instrument(
    name = "Create article",
    skip(form, pool, user_id),
    fields(title = %form.title)
)]
pub async fn create_article(
    form: web::Form<FormData>,
    pool: web::Data<PgPool>,
    user_id: web::ReqData<UserId>,
) -> Result<HttpResponse, actix_web::Error> {
    let attribution = match form.attribution() {
        Ok(attribution) => attribution,
        Err(e) => {
            FlashMessage::error(e).send();
            return Ok(see_other("/admin/articles/new"));
        }
    };

    let article_id = insert_article(&pool, &form, attribution, **user_id)
        .await
        .context("Failed to insert a new article in the database.")
        .map_err(e500)?;

    log_activity(
        &pool,
        ActivityKind::ArticlePublished,
        &format!("Article published: {}", form.title),
        None,
        Some(**user_id),
    )
    .await
    .map_err(|e| tracing::warn!(error = %e, "Failed to record article activity."))
    .ok();

    tracing::info!(%article_id, "A new article has been published.");
    FlashMessage::info("The article has been published.").send();
    Ok(see_other("/admin/articles"))
}

#[tracing::instrument(
    name = "Update article",
    skip(form, pool),
    fields(title = %form.title)
)]
pub async fn update_article(
    id: web::Path<Uuid>,
    form: web::Form<FormData>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, actix_web::Error> {
    let article_id = id.into_inner();

    let attribution = match form.attribution() {
        Ok(attribution) => attribution,
        Err(e) => {
            FlashMessage::error(e).send();
            return Ok(see_other(&format!("/admin/articles/{article_id}/edit")));
        }
    };

    let updated = sqlx::query(
        r#"
        UPDATE articles
        SET title = $1, abstract = $2, body_html = $3, image_url = $4, access_tier = $5,
            ai_generated_percent = $6, ai_generated_ai_refined_percent = $7,
            human_written_ai_refined_percent = $8, human_written_percent = $9,
            updated_at = now()
        WHERE id = $10
        "#,
    )
    .bind(&form.title)
    .bind(&form.summary)
    .bind(&form.body_html)
    .bind(form.image_url())
    .bind(form.access_tier.as_str())
    .bind(attribution.ai_generated())
    .bind(attribution.ai_generated_ai_refined())
    .bind(attribution.human_written_ai_refined())
    .bind(attribution.human_written())
    .bind(article_id)
    .execute(pool.get_ref())
    .await
    .map_err(e500)?;

    if updated.rows_affected() == 0 {
        return Err(actix_web::error::ErrorNotFound("Unknown article."));
    }

    FlashMessage::info("The article has been updated.").send();
    Ok(see_other("/admin/articles"))
}

#[tracing::instrument(name = "Delete article", skip(pool))]
pub async fn delete_article(
    id: web::Path<Uuid>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, actix_web::Error> {
    sqlx::query("DELETE FROM articles WHERE id = $1")
        .bind(id.into_inner())
        .execute(pool.get_ref())
        .await
        .map_err(e500)?;

    FlashMessage::info("The article has been deleted.").send();
    Ok(see_other("/admin/articles"))
}

async fn insert_article(
    pool: &PgPool,
    form: &FormData,
    attribution: AiAttribution,
    author_id: Uuid,
) -> Result<Uuid, sqlx::Error> {
    let article_id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO articles
            (id, title, abstract, body_html, image_url, access_tier,
             ai_generated_percent, ai_generated_ai_refined_percent,
             human_written_ai_refined_percent, human_written_percent,
             author_id, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, now(), now())
        "#,
    )
    .bind(article_id)
    .bind(&form.title)
    .bind(&form.summary)
    .bind(&form.body_html)
    .bind(form.image_url())
    .bind(form.access_tier.as_str())
    .bind(attribution.ai_generated())
    .bind(attribution.ai_generated_ai_refined())
    .bind(attribution.human_written_ai_refined())
    .bind(attribution.human_written())
    .bind(author_id)
    .execute(pool)
    .await?;

    Ok(article_id)
}
