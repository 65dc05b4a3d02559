use std::{sync::Arc, time::Duration};

use log::{info, warn};
use serde::Serialize;

use crate::{
    identity::IdentityStore,
    ledger::UsageLedger,
    remote::{RemoteError, RemoteService},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum VerdictSource {
    Local,
    Remote,
}

/// How much viewing time is left. Recomputed on demand, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Entitlement {
    Unlimited,
    Remaining { seconds: u64, source: VerdictSource },
}

impl Entitlement {
    pub fn allows_viewing(&self) -> bool {
        match self {
            Entitlement::Unlimited => true,
            Entitlement::Remaining { seconds, .. } => *seconds > 0,
        }
    }

    pub fn remaining_seconds(&self) -> Option<u64> {
        match self {
            Entitlement::Unlimited => None,
            Entitlement::Remaining { seconds, .. } => Some(*seconds),
        }
    }
}

pub struct EntitlementResolver {
    identity: IdentityStore,
    ledger: Arc<UsageLedger>,
    remote: Arc<dyn RemoteService>,
    daily_limit_secs: u64,
    remote_timeout: Duration,
}

impl EntitlementResolver {
    pub fn new(
        identity: IdentityStore,
        ledger: Arc<UsageLedger>,
        remote: Arc<dyn RemoteService>,
        daily_limit_secs: u64,
        remote_timeout: Duration,
    ) -> Self {
        Self {
            identity,
            ledger,
            remote,
            daily_limit_secs,
            remote_timeout,
        }
    }

    /// Signed out: local ledger only. Signed in: the remote answer wins
    /// when it arrives in time, otherwise the local ledger decides.
    pub async fn resolve(&self) -> Entitlement {
        let Some(identity) = self.identity.load() else {
            return self.local();
        };

        match self.query_remote(&identity.uid).await {
            Ok(verdict) => verdict,
            Err(err) => {
                warn!(
                    "Entitlement lookup failed for {}, using local ledger: {err}",
                    identity.uid
                );
                self.local()
            }
        }
    }

    async fn query_remote(&self, uid: &str) -> Result<Entitlement, RemoteError> {
        let response = tokio::time::timeout(self.remote_timeout, self.remote.get_entitlement(uid))
            .await
            .map_err(|_| RemoteError::Timeout)??;

        if response.is_premium {
            info!("Entitlement for {uid}: premium");
            return Ok(Entitlement::Unlimited);
        }

        match response.trial_seconds_remaining {
            Some(seconds) => Ok(Entitlement::Remaining {
                seconds: seconds.max(0) as u64,
                source: VerdictSource::Remote,
            }),
            None => Err(RemoteError::Decode(
                "neither premium flag nor trial seconds present".into(),
            )),
        }
    }

    pub fn local(&self) -> Entitlement {
        let used = self.ledger.snapshot().daily_seconds_used;
        Entitlement::Remaining {
            seconds: self.daily_limit_secs.saturating_sub(used),
            source: VerdictSource::Local,
        }
    }
}
