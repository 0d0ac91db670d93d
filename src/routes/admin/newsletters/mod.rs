mod get;
mod post;
mod send;

pub use get::{admin_newsletters, edit_newsletter_form, newsletter_form};
pub use post::{cancel_newsletter, create_newsletter, update_newsletter};
pub use send::{send_newsletter, send_test_newsletter};
