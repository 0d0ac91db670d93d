mod get;
mod post;

pub use get::{admin_articles, article_form, edit_article_form};
pub use post::{create_article, delete_article, update_article};
