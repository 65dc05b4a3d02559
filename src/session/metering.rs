use std::{sync::Arc, time::Duration};

use tokio::{task::JoinHandle, time};

use crate::ledger::UsageLedger;
use crate::log_debug;

use super::{SessionHandle, SessionMessage};

const ENABLE_LOGS: bool = true;

/// Runs the usage ledger while a document is showing. The ticker task only
/// posts `Tick` into the control loop; the ledger is touched there, never
/// from the ticker itself.
pub struct Metering {
    ledger: Arc<UsageLedger>,
    ticker: Option<JoinHandle<()>>,
    interval: Duration,
}

impl Metering {
    pub fn new(ledger: Arc<UsageLedger>, interval: Duration) -> Self {
        Self {
            ledger,
            ticker: None,
            interval,
        }
    }

    pub fn is_running(&self) -> bool {
        self.ticker.is_some()
    }

    pub fn start(&mut self, session: &SessionHandle) {
        self.ledger.start();
        self.spawn_ticker(session.clone());
    }

    pub fn tick(&self) -> u64 {
        let added = self.ledger.tick();
        log_debug!("Usage tick accounted {added}s");
        added
    }

    pub fn stop(&mut self) -> u64 {
        self.cancel_ticker();
        let added = self.ledger.stop();
        log_debug!("Usage metering stopped after {added}s");
        added
    }

    fn spawn_ticker(&mut self, session: SessionHandle) {
        self.cancel_ticker();

        let period = self.interval;
        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if !session.post(SessionMessage::Tick) {
                    break;
                }
            }
        });

        self.ticker = Some(handle);
    }

    fn cancel_ticker(&mut self) {
        if let Some(handle) = self.ticker.take() {
            handle.abort();
        }
    }
}

impl Drop for Metering {
    fn drop(&mut self) {
        self.cancel_ticker();
    }
}
