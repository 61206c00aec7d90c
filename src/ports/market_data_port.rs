//! Market data access port.

use crate::domain::bar::TradeBar;
use crate::domain::error::AlphaledgerError;
use crate::domain::instrument::Instrument;

/// Historical data and subscription lifecycle for one feed.
///
/// `fetch_history` backfills indicator warm-up when an instrument enters the
/// universe; `release` frees whatever subscription or consolidation resource
/// the feed holds for an instrument leaving it.
pub trait MarketDataPort {
    /// Up to `bars` bars immediately preceding the live stream, oldest
    /// first. Fewer (or none) is acceptable: readiness gating covers the
    /// shortfall.
    fn fetch_history(
        &self,
        instrument: &Instrument,
        bars: usize,
    ) -> Result<Vec<TradeBar>, AlphaledgerError>;

    fn release(&self, instrument: &Instrument);
}
