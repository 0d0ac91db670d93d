use uuid::Uuid;
use wiremock::ResponseTemplate;

use dgcg::delivery::{ExecutionOutcome, try_deliver_due_newsletter};

use crate::helpers::{
    TestApp, assert_is_redirect_to, email_accepted_response, spawn_app, when_sending_an_email,
};

fn newsletter_body(access_tier: &str) -> serde_json::Value {
    serde_json::json!({
        "title": "Issue #1",
        "subject": "Our first issue",
        "body_html": "<p>Newsletter body as HTML</p>",
        "body_text": "Newsletter body as plain text",
        "access_tier": access_tier,
        "scheduled_at": ""
    })
}

async fn save_newsletter(app: &TestApp, access_tier: &str) -> Uuid {
    let response = app
        .post_form("/admin/newsletters", &newsletter_body(access_tier))
        .await;
    assert_is_redirect_to(&response, "/admin/newsletters");

    let (id,): (Uuid,) =
        sqlx::query_as("SELECT id FROM newsletters ORDER BY created_at DESC LIMIT 1")
            .fetch_one(&app.db_pool)
            .await
            .expect("Failed to fetch the saved newsletter.");
    id
}

#[tokio::test]
async fn you_must_be_logged_in_to_manage_newsletters() {
    let app = spawn_app().await;

    let response = app.get("/admin/newsletters").await;
    assert_is_redirect_to(&response, "/login");

    let response = app
        .post_form("/admin/newsletters", &newsletter_body("free"))
        .await;
    assert_is_redirect_to(&response, "/login");
}

#[tokio::test]
async fn a_newsletter_is_saved_as_a_draft_without_a_schedule() {
    let app = spawn_app().await;
    app.login_test_user().await;

    save_newsletter(&app, "free").await;

    let (status,): (String,) = sqlx::query_as("SELECT status FROM newsletters")
        .fetch_one(&app.db_pool)
        .await
        .unwrap();
    assert_eq!(status, "draft");

    let html_page = app.get_html("/admin/newsletters").await;
    assert!(html_page.contains("The newsletter draft has been saved."));
    assert!(html_page.contains("Issue #1"));
}

#[tokio::test]
async fn a_newsletter_with_a_schedule_is_marked_scheduled() {
    let app = spawn_app().await;
    app.login_test_user().await;

    let mut body = newsletter_body("free");
    body["scheduled_at"] = serde_json::json!("2027-01-01T09:00");
    let response = app.post_form("/admin/newsletters", &body).await;
    assert_is_redirect_to(&response, "/admin/newsletters");

    let (status,): (String,) = sqlx::query_as("SELECT status FROM newsletters")
        .fetch_one(&app.db_pool)
        .await
        .unwrap();
    assert_eq!(status, "scheduled");
}

#[tokio::test]
async fn sending_a_free_newsletter_reaches_free_and_paid_subscribers() {
    let app = spawn_app().await;
    app.create_subscriber("free_user").await;
    app.create_subscriber("paid_user").await;
    app.login_test_user().await;
    let id = save_newsletter(&app, "free").await;

    when_sending_an_email()
        .respond_with(email_accepted_response())
        .expect(1)
        .mount(&app.email_server)
        .await;

    let response = app
        .post_form(
            &format!("/admin/newsletters/{id}/send"),
            &serde_json::json!({}),
        )
        .await;
    assert_is_redirect_to(&response, "/admin/newsletters");

    let body = app.last_email_body().await;
    let to = &body["to"];
    assert_eq!(to.split(", ").count(), 2);

    let (status, recipient_count): (String, i32) =
        sqlx::query_as("SELECT status, recipient_count FROM newsletters WHERE id = $1")
            .bind(id)
            .fetch_one(&app.db_pool)
            .await
            .unwrap();
    assert_eq!(status, "sent");
    assert_eq!(recipient_count, 2);

    let (send_count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM newsletter_sends WHERE newsletter_id = $1 AND status = 'sent'",
    )
    .bind(id)
    .fetch_one(&app.db_pool)
    .await
    .unwrap();
    assert_eq!(send_count, 2);
}

#[tokio::test]
async fn a_paid_newsletter_only_reaches_paid_subscribers() {
    let app = spawn_app().await;
    app.create_subscriber("free_user").await;
    let (_, paid_email) = app.create_subscriber("paid_user").await;
    app.login_test_user().await;
    let id = save_newsletter(&app, "paid").await;

    when_sending_an_email()
        .respond_with(email_accepted_response())
        .expect(1)
        .mount(&app.email_server)
        .await;

    app.post_form(
        &format!("/admin/newsletters/{id}/send"),
        &serde_json::json!({}),
    )
    .await;

    let body = app.last_email_body().await;
    assert_eq!(body["to"], paid_email);
}

#[tokio::test]
async fn an_unsubscribed_user_does_not_get_the_newsletter() {
    let app = spawn_app().await;
    let (unsubscribed_id, _) = app.create_subscriber("free_user").await;
    let (_, subscribed_email) = app.create_subscriber("free_user").await;
    sqlx::query("UPDATE users SET newsletter_subscribed = FALSE WHERE user_id = $1")
        .bind(unsubscribed_id)
        .execute(&app.db_pool)
        .await
        .unwrap();
    app.login_test_user().await;
    let id = save_newsletter(&app, "free").await;

    when_sending_an_email()
        .respond_with(email_accepted_response())
        .expect(1)
        .mount(&app.email_server)
        .await;

    app.post_form(
        &format!("/admin/newsletters/{id}/send"),
        &serde_json::json!({}),
    )
    .await;

    let body = app.last_email_body().await;
    assert_eq!(body["to"], subscribed_email);
}

#[tokio::test]
async fn a_preference_opt_out_is_honored_per_tier() {
    let app = spawn_app().await;
    let (opted_out_id, _) = app.create_subscriber("paid_user").await;
    let (_, reachable_email) = app.create_subscriber("paid_user").await;
    sqlx::query("UPDATE users SET receive_paid_newsletters = FALSE WHERE user_id = $1")
        .bind(opted_out_id)
        .execute(&app.db_pool)
        .await
        .unwrap();
    app.login_test_user().await;
    let id = save_newsletter(&app, "paid").await;

    when_sending_an_email()
        .respond_with(email_accepted_response())
        .expect(1)
        .mount(&app.email_server)
        .await;

    app.post_form(
        &format!("/admin/newsletters/{id}/send"),
        &serde_json::json!({}),
    )
    .await;

    let body = app.last_email_body().await;
    assert_eq!(body["to"], reachable_email);
}

#[tokio::test]
async fn sending_without_eligible_subscribers_is_an_error() {
    let app = spawn_app().await;
    app.login_test_user().await;
    let id = save_newsletter(&app, "free").await;

    let response = app
        .post_form(
            &format!("/admin/newsletters/{id}/send"),
            &serde_json::json!({}),
        )
        .await;
    assert_is_redirect_to(&response, "/admin/newsletters");

    let html_page = app.get_html("/admin/newsletters").await;
    assert!(html_page.contains("No eligible subscribers found."));

    let (status,): (String,) = sqlx::query_as("SELECT status FROM newsletters WHERE id = $1")
        .bind(id)
        .fetch_one(&app.db_pool)
        .await
        .unwrap();
    assert_eq!(status, "draft");
}

#[tokio::test]
async fn a_sent_newsletter_cannot_be_sent_twice() {
    let app = spawn_app().await;
    app.create_subscriber("free_user").await;
    app.login_test_user().await;
    let id = save_newsletter(&app, "free").await;

    when_sending_an_email()
        .respond_with(email_accepted_response())
        .expect(1)
        .mount(&app.email_server)
        .await;

    app.post_form(
        &format!("/admin/newsletters/{id}/send"),
        &serde_json::json!({}),
    )
    .await;
    let response = app
        .post_form(
            &format!("/admin/newsletters/{id}/send"),
            &serde_json::json!({}),
        )
        .await;
    assert_is_redirect_to(&response, "/admin/newsletters");

    let html_page = app.get_html("/admin/newsletters").await;
    assert!(html_page.contains("already been sent"));
}

#[tokio::test]
async fn a_failed_batch_is_recorded_per_recipient() {
    let app = spawn_app().await;
    app.create_subscriber("free_user").await;
    app.login_test_user().await;
    let id = save_newsletter(&app, "free").await;

    when_sending_an_email()
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&app.email_server)
        .await;

    let response = app
        .post_form(
            &format!("/admin/newsletters/{id}/send"),
            &serde_json::json!({}),
        )
        .await;
    assert_is_redirect_to(&response, "/admin/newsletters");

    let (send_status, error_message): (String, Option<String>) = sqlx::query_as(
        "SELECT status, error_message FROM newsletter_sends WHERE newsletter_id = $1",
    )
    .bind(id)
    .fetch_one(&app.db_pool)
    .await
    .unwrap();
    assert_eq!(send_status, "failed");
    assert!(error_message.is_some());

    // Delivery is best effort: the campaign still completes, with
    // nothing counted as delivered.
    let (status, recipient_count): (String, i32) =
        sqlx::query_as("SELECT status, recipient_count FROM newsletters WHERE id = $1")
            .bind(id)
            .fetch_one(&app.db_pool)
            .await
            .unwrap();
    assert_eq!(status, "sent");
    assert_eq!(recipient_count, 0);
}

#[tokio::test]
async fn sending_a_newsletter_records_an_activity_entry() {
    let app = spawn_app().await;
    app.create_subscriber("free_user").await;
    app.login_test_user().await;
    let id = save_newsletter(&app, "free").await;

    when_sending_an_email()
        .respond_with(email_accepted_response())
        .expect(1)
        .mount(&app.email_server)
        .await;

    app.post_form(
        &format!("/admin/newsletters/{id}/send"),
        &serde_json::json!({}),
    )
    .await;

    let (kind, title): (String, String) = sqlx::query_as(
        "SELECT kind, title FROM activity_log ORDER BY created_at DESC LIMIT 1",
    )
    .fetch_one(&app.db_pool)
    .await
    .unwrap();
    assert_eq!(kind, "newsletter_sent");
    assert!(title.contains("Issue #1"));
}

#[tokio::test]
async fn the_email_carries_a_personalized_unsubscribe_footer() {
    let app = spawn_app().await;
    app.create_subscriber("free_user").await;
    app.login_test_user().await;
    let id = save_newsletter(&app, "free").await;

    when_sending_an_email()
        .respond_with(email_accepted_response())
        .expect(1)
        .mount(&app.email_server)
        .await;

    app.post_form(
        &format!("/admin/newsletters/{id}/send"),
        &serde_json::json!({}),
    )
    .await;

    let body = app.last_email_body().await;
    let link = app.get_unsubscribe_link(&body["html"]);
    assert!(link.contains("%recipient.email%"));
    assert!(link.contains("%recipient.user_id%"));
    assert!(body.contains_key("recipient-variables"));
    assert_eq!(body["v:newsletter_id"], id.to_string());
}

#[tokio::test]
async fn a_test_email_goes_to_the_supplied_address_only() {
    let app = spawn_app().await;
    app.create_subscriber("free_user").await;
    app.login_test_user().await;
    let id = save_newsletter(&app, "free").await;

    when_sending_an_email()
        .respond_with(email_accepted_response())
        .expect(1)
        .mount(&app.email_server)
        .await;

    let response = app
        .post_form(
            &format!("/admin/newsletters/{id}/test"),
            &serde_json::json!({ "test_email": "preview@domain.com" }),
        )
        .await;
    assert_is_redirect_to(&response, &format!("/admin/newsletters/{id}/edit"));

    let body = app.last_email_body().await;
    assert_eq!(body["to"], "preview@domain.com");
    assert!(body["subject"].starts_with("[TEST] "));

    // The campaign itself is untouched.
    let (status,): (String,) = sqlx::query_as("SELECT status FROM newsletters WHERE id = $1")
        .bind(id)
        .fetch_one(&app.db_pool)
        .await
        .unwrap();
    assert_eq!(status, "draft");
}

#[tokio::test]
async fn a_draft_newsletter_can_be_cancelled() {
    let app = spawn_app().await;
    app.login_test_user().await;
    let id = save_newsletter(&app, "free").await;

    let response = app
        .post_form(
            &format!("/admin/newsletters/{id}/cancel"),
            &serde_json::json!({}),
        )
        .await;
    assert_is_redirect_to(&response, "/admin/newsletters");

    let (status,): (String,) = sqlx::query_as("SELECT status FROM newsletters WHERE id = $1")
        .bind(id)
        .fetch_one(&app.db_pool)
        .await
        .unwrap();
    assert_eq!(status, "cancelled");
}

#[tokio::test]
async fn the_worker_delivers_a_due_scheduled_newsletter() {
    let app = spawn_app().await;
    app.create_subscriber("free_user").await;
    app.login_test_user().await;
    let id = save_newsletter(&app, "free").await;
    sqlx::query(
        "UPDATE newsletters SET status = 'scheduled', scheduled_at = now() - interval '1 minute' \
         WHERE id = $1",
    )
    .bind(id)
    .execute(&app.db_pool)
    .await
    .unwrap();

    when_sending_an_email()
        .respond_with(email_accepted_response())
        .expect(1)
        .mount(&app.email_server)
        .await;

    let outcome = try_deliver_due_newsletter(&app.db_pool, &app.email_client, &app.base_url)
        .await
        .expect("The worker run failed.");
    assert!(matches!(outcome, ExecutionOutcome::TaskCompleted));

    let (status,): (String,) = sqlx::query_as("SELECT status FROM newsletters WHERE id = $1")
        .bind(id)
        .fetch_one(&app.db_pool)
        .await
        .unwrap();
    assert_eq!(status, "sent");

    // A second run finds nothing to do.
    let outcome = try_deliver_due_newsletter(&app.db_pool, &app.email_client, &app.base_url)
        .await
        .expect("The worker run failed.");
    assert!(matches!(outcome, ExecutionOutcome::EmptyQueue));
}
