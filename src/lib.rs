pub mod bridge;
pub mod clock;
pub mod config;
pub mod entitlement;
pub mod identity;
pub mod instance;
pub mod launch;
pub mod ledger;
pub mod models;
pub mod navigation;
pub mod remote;
pub mod session;
pub mod store;
pub mod utils;

#[cfg(feature = "desktop")]
mod desktop;

#[cfg(test)]
mod test_support;

#[cfg(feature = "desktop")]
pub use desktop::run;
