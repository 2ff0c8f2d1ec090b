pub mod admins;
pub mod issuers;
pub mod subscription_allocations;
pub mod subscription_ledgers;
pub mod subscription_plans;

pub use admins as admin_entity;
pub use issuers as issuer_entity;
pub use subscription_allocations as allocation_entity;
pub use subscription_ledgers as ledger_entity;
pub use subscription_plans as plan_entity;
