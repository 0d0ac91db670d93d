mod access_tier;
mod ai_attribution;
mod newsletter_status;
mod subscriber_email;
mod user_type;

pub use access_tier::AccessTier;
pub use ai_attribution::AiAttribution;
pub use newsletter_status::NewsletterStatus;
pub use subscriber_email::SubscriberEmail;
pub use user_type::UserType;
