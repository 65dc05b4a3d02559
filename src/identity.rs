use anyhow::Result;
use log::warn;

use crate::{models::UserIdentity, store::JsonStore};

const IDENTITY_KEY: &str = "identity";

/// Signed-in user record. Its presence is what enables remote sync and the
/// remote entitlement lookup.
#[derive(Clone)]
pub struct IdentityStore {
    store: JsonStore,
}

impl IdentityStore {
    pub fn new(store: JsonStore) -> Self {
        Self { store }
    }

    /// Unreadable records are treated as signed out.
    pub fn load(&self) -> Option<UserIdentity> {
        match self.store.read::<UserIdentity>(IDENTITY_KEY) {
            Ok(identity) => identity.filter(|id| !id.uid.is_empty()),
            Err(err) => {
                warn!("Identity record unreadable, treating as signed out: {err:#}");
                None
            }
        }
    }

    pub fn save(&self, identity: &UserIdentity) -> Result<()> {
        self.store.write(IDENTITY_KEY, identity)
    }

    pub fn clear(&self) -> Result<()> {
        self.store.remove(IDENTITY_KEY)
    }
}
