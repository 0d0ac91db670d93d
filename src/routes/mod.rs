pub mod admin;
mod articles;
mod health_check;
pub mod helpers;
mod home;
mod login;
mod pages;
mod register;
mod unsubscribe;

pub use articles::{article_page, articles_index};
pub use health_check::health_check;
pub use helpers::{e400, e500, see_other};
pub use home::home;
pub use login::{login, login_form};
pub use pages::{consulting, pricing};
pub use register::{register, register_form};
pub use unsubscribe::{unsubscribe, unsubscribe_form};
