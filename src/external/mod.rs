pub mod mailer;
pub mod stripe;

pub use mailer::{MailerService, PlanNotifier};
pub use stripe::StripeService;
