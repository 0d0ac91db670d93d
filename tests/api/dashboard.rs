use crate::helpers::{assert_is_redirect_to, spawn_app};

#[tokio::test]
async fn you_must_be_logged_in_to_see_the_dashboard() {
    let app = spawn_app().await;

    let response = app.get_admin_dashboard().await;

    assert_is_redirect_to(&response, "/login");
}

#[tokio::test]
async fn the_dashboard_shows_counts_and_recent_activity() {
    let app = spawn_app().await;
    app.create_subscriber("free_user").await;
    app.create_subscriber("paid_user").await;
    app.login_test_user().await;

    let html_page = app.get_admin_dashboard_html().await;

    assert!(html_page.contains(&format!("Welcome, {}", app.test_user.email)));
    // The admin account does not count as a subscriber.
    assert!(html_page.contains(r#"<span class="stat-value">2</span> subscribers"#));
    assert!(html_page.contains(r#"<span class="stat-value">0</span> articles"#));
    assert!(html_page.contains("user_registered"));
}

#[tokio::test]
async fn logging_out_clears_the_session() {
    let app = spawn_app().await;
    app.login_test_user().await;

    let response = app.post_logout().await;
    assert_is_redirect_to(&response, "/login");

    let html_page = app.get_login_html().await;
    assert!(html_page.contains("You have successfully logged out."));

    let response = app.get_admin_dashboard().await;
    assert_is_redirect_to(&response, "/login");
}
