mod articles;
mod dashboard;
mod logout;
mod newsletters;
mod notes;
mod password;
mod subscribers;

pub use articles::{
    admin_articles, article_form, create_article, delete_article, edit_article_form,
    update_article,
};
pub use dashboard::{admin_dashboard, get_user_email};
pub use logout::logout;
pub use newsletters::{
    admin_newsletters, cancel_newsletter, create_newsletter, edit_newsletter_form,
    newsletter_form, send_newsletter, send_test_newsletter, update_newsletter,
};
pub use notes::{admin_notes, create_note, delete_note};
pub use password::{change_password, change_password_form};
pub use subscribers::admin_subscribers;
