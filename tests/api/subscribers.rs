use crate::helpers::{assert_is_redirect_to, spawn_app};

#[tokio::test]
async fn you_must_be_logged_in_to_see_the_subscriber_list() {
    let app = spawn_app().await;

    let response = app.get("/admin/subscribers").await;

    assert_is_redirect_to(&response, "/login");
}

#[tokio::test]
async fn the_subscriber_list_shows_profiles_but_not_the_admin() {
    let app = spawn_app().await;
    let (_, free_email) = app.create_subscriber("free_user").await;
    let (_, paid_email) = app.create_subscriber("paid_user").await;
    app.login_test_user().await;

    let html_page = app.get_html("/admin/subscribers").await;

    assert!(html_page.contains(&free_email));
    assert!(html_page.contains(&paid_email));
    assert!(!html_page.contains(&app.test_user.email));
}

#[tokio::test]
async fn the_subscriber_list_can_be_filtered_by_type() {
    let app = spawn_app().await;
    let (_, free_email) = app.create_subscriber("free_user").await;
    let (_, paid_email) = app.create_subscriber("paid_user").await;
    app.login_test_user().await;

    let html_page = app.get_html("/admin/subscribers?type=paid_user").await;

    assert!(html_page.contains(&paid_email));
    assert!(!html_page.contains(&free_email));
}

#[tokio::test]
async fn an_unknown_filter_is_a_bad_request() {
    let app = spawn_app().await;
    app.login_test_user().await;

    let response = app.get("/admin/subscribers?type=vip").await;

    assert_eq!(response.status().as_u16(), 400);
}
