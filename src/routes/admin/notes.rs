use actix_web::{HttpResponse, http::header::ContentType, web};
use actix_web_flash_messages::{FlashMessage, IncomingFlashMessages};
use sqlx::PgPool;
use uuid::Uuid;

use crate::routes::helpers::{e500, get_message, render_template, see_other};

#[derive(sqlx::FromRow, serde::Serialize)]
struct NoteRow {
    id: Uuid,
    title: String,
    content: String,
    written_on: String,
}

pub async fn admin_notes(
    pool: web::Data<PgPool>,
    flash_messages: IncomingFlashMessages,
) -> Result<HttpResponse, actix_web::Error> {
    let notes = sqlx::query_as::<_, NoteRow>(
        r#"
        SELECT id, title, content,
               to_char(created_at, 'FMMonth DD, YYYY') AS written_on
        FROM notes
        ORDER BY created_at DESC
        "#,
    )
    .fetch_all(pool.get_ref())
    .await
    .map_err(e500)?;

    let mut ctx = tera::Context::new();
    ctx.insert("notes", &notes);
    ctx.insert("message", &get_message(&flash_messages, None));

    let page = render_template(ctx, "admin/notes.html");
    Ok(HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(page))
}

#[derive(serde::Deserialize)]
pub struct FormData {
    title: String,
    content: String,
}

#[tracing::instrument(name = "Create note", skip(form, pool), fields(title = %form.title))]
pub async fn create_note(
    form: web::Form<FormData>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, actix_web::Error> {
    sqlx::query(
        r#"
        INSERT INTO notes (id, title, content, created_at, updated_at)
        VALUES ($1, $2, $3, now(), now())
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&form.title)
    .bind(&form.content)
    .execute(pool.get_ref())
    .await
    .map_err(e500)?;

    FlashMessage::info("The note has been saved.").send();
    Ok(see_other("/admin/notes"))
}

#[tracing::instrument(name = "Delete note", skip(pool))]
pub async fn delete_note(
    id: web::Path<Uuid>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, actix_web::Error> {
    sqlx::query("DELETE FROM notes WHERE id = $1")
        .bind(id.into_inner())
        .execute(pool.get_ref())
        .await
        .map_err(e500)?;

    FlashMessage::info("The note has been deleted.").send();
    Ok(see_other("/admin/notes"))
}
