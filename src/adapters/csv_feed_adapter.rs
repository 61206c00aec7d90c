//! CSV file market-data adapter.
//!
//! Reads one `SYMBOL.csv` per instrument from a base directory, with a
//! `date,open,high,low,close,volume` header row and daily rows in
//! `YYYY-MM-DD` format. A configured session start date splits each file:
//! rows before it serve as warm-up history, rows on or after it form the
//! replay stream.

use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

use crate::domain::bar::TradeBar;
use crate::domain::error::AlphaledgerError;
use crate::domain::instrument::Instrument;
use crate::ports::market_data_port::MarketDataPort;

pub struct CsvFeedAdapter {
    base_path: PathBuf,
    session_start: Option<NaiveDate>,
}

impl CsvFeedAdapter {
    pub fn new(base_path: PathBuf, session_start: Option<NaiveDate>) -> Self {
        Self {
            base_path,
            session_start,
        }
    }

    fn csv_path(&self, instrument: &Instrument) -> PathBuf {
        self.base_path.join(format!("{}.csv", instrument))
    }

    fn read_bars(&self, instrument: &Instrument) -> Result<Vec<TradeBar>, AlphaledgerError> {
        let path = self.csv_path(instrument);
        let content = fs::read_to_string(&path).map_err(|e| AlphaledgerError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| AlphaledgerError::Data {
                reason: format!("CSV parse error in {}: {}", path.display(), e),
            })?;

            let date_str = record.get(0).ok_or_else(|| AlphaledgerError::Data {
                reason: "missing date column".into(),
            })?;
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
                AlphaledgerError::Data {
                    reason: format!("invalid date format: {}", e),
                }
            })?;

            let field = |index: usize, name: &str| -> Result<f64, AlphaledgerError> {
                record
                    .get(index)
                    .ok_or_else(|| AlphaledgerError::Data {
                        reason: format!("missing {name} column"),
                    })?
                    .parse()
                    .map_err(|e| AlphaledgerError::Data {
                        reason: format!("invalid {name} value: {e}"),
                    })
            };

            let open = field(1, "open")?;
            let high = field(2, "high")?;
            let low = field(3, "low")?;
            let close = field(4, "close")?;
            let volume: i64 = record
                .get(5)
                .ok_or_else(|| AlphaledgerError::Data {
                    reason: "missing volume column".into(),
                })?
                .parse()
                .map_err(|e| AlphaledgerError::Data {
                    reason: format!("invalid volume value: {e}"),
                })?;

            bars.push(TradeBar {
                instrument: instrument.clone(),
                timestamp: date.and_time(chrono::NaiveTime::MIN),
                open,
                high,
                low,
                close,
                volume,
            });
        }

        bars.sort_by_key(|bar| bar.timestamp);
        Ok(bars)
    }

    /// All replay bars (on/after the session start) for the given
    /// instruments, sorted by timestamp then instrument so cycles group
    /// naturally.
    pub fn replay_bars(
        &self,
        instruments: &[Instrument],
    ) -> Result<Vec<TradeBar>, AlphaledgerError> {
        let mut all = Vec::new();
        for instrument in instruments {
            let bars = self.read_bars(instrument)?;
            if bars.is_empty() {
                return Err(AlphaledgerError::NoData {
                    instrument: instrument.to_string(),
                });
            }
            all.extend(bars.into_iter().filter(|bar| {
                self.session_start
                    .is_none_or(|start| bar.timestamp.date() >= start)
            }));
        }
        all.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.instrument.cmp(&b.instrument))
        });
        Ok(all)
    }

    /// Date range and bar count for one instrument's file.
    pub fn data_range(
        &self,
        instrument: &Instrument,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, AlphaledgerError> {
        let bars = self.read_bars(instrument)?;
        Ok(match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => Some((
                first.timestamp.date(),
                last.timestamp.date(),
                bars.len(),
            )),
            _ => None,
        })
    }
}

impl MarketDataPort for CsvFeedAdapter {
    fn fetch_history(
        &self,
        instrument: &Instrument,
        bars: usize,
    ) -> Result<Vec<TradeBar>, AlphaledgerError> {
        let Some(start) = self.session_start else {
            return Ok(Vec::new());
        };
        let mut history: Vec<TradeBar> = self
            .read_bars(instrument)?
            .into_iter()
            .filter(|bar| bar.timestamp.date() < start)
            .collect();
        if history.len() > bars {
            history.drain(..history.len() - bars);
        }
        Ok(history)
    }

    fn release(&self, _instrument: &Instrument) {
        // file-backed feeds hold no per-instrument resource
    }
}
