use sqlx::PgPool;
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
    UserRegistered,
    UserUnsubscribed,
    ArticlePublished,
    NewsletterSent,
}

impl ActivityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserRegistered => "user_registered",
            Self::UserUnsubscribed => "user_unsubscribed",
            Self::ArticlePublished => "article_published",
            Self::NewsletterSent => "newsletter_sent",
        }
    }
}

impl std::fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct Activity {
    pub kind: String,
    pub title: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[tracing::instrument(name = "Log activity", skip(pool, description))]
pub async fn log_activity(
    pool: &PgPool,
    kind: ActivityKind,
    title: &str,
    description: Option<&str>,
    user_id: Option<Uuid>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO activity_log (id, kind, title, description, user_id, created_at)
        VALUES ($1, $2, $3, $4, $5, now())
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(kind.as_str())
    .bind(title)
    .bind(description)
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(())
}

#[tracing::instrument(name = "Get recent activities", skip(pool))]
pub async fn recent_activities(pool: &PgPool, limit: i64) -> Result<Vec<Activity>, sqlx::Error> {
    sqlx::query_as::<_, Activity>(
        r#"
        SELECT kind, title, description, created_at
        FROM activity_log
        ORDER BY created_at DESC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}
