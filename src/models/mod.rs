mod identity;
mod usage;

pub use identity::UserIdentity;
pub use usage::UsageRecord;
