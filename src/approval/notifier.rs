use crate::errors::LedgerResult;
use crate::ledger::BuyerId;

/// Out-of-band delivery of approval codes to buyers (SMS gateway, push service, ...).
pub trait Notifier: Send + Sync {
    fn deliver(&self, destination: &BuyerId, code: &str) -> LedgerResult<()>;
}

/// Stand-in channel for a single device: the code is shown locally rather than sent.
///
/// The code itself is only emitted at `debug`, so default logging never records it.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalNotifier;

impl Notifier for LocalNotifier {
    fn deliver(&self, destination: &BuyerId, code: &str) -> LedgerResult<()> {
        tracing::info!(buyer = %destination, "approval code issued");
        tracing::debug!(buyer = %destination, code, "approval code ready for local display");
        Ok(())
    }
}
