pub mod plan;
pub mod subscription;

pub use plan::plan_config;
pub use subscription::subscription_config;
