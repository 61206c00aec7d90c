//! Configuration validation.
//!
//! Validates every config field up front so a session never starts on a
//! half-usable file.

use crate::domain::error::AlphaledgerError;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub const STRATEGY_SECTIONS: [&str; 3] =
    ["momentum_rank", "channel_breakout", "new_high_breakout"];

pub fn validate_session_config(config: &dyn ConfigPort) -> Result<(), AlphaledgerError> {
    validate_initial_cash(config)?;
    let instruments = validate_instruments(config)?;
    validate_start_date(config)?;

    let enabled: Vec<&str> = STRATEGY_SECTIONS
        .iter()
        .copied()
        .filter(|section| config.get_bool(section, "enabled", false))
        .collect();
    if enabled.is_empty() {
        return Err(AlphaledgerError::ConfigInvalid {
            section: "session".to_string(),
            key: "strategies".to_string(),
            reason: "at least one strategy section must set enabled = true".to_string(),
        });
    }

    for section in &enabled {
        match *section {
            "momentum_rank" => {
                validate_risk_fraction(config, section)?;
                validate_positive_int(config, section, "top_n", 5)?;
            }
            "channel_breakout" => {
                validate_risk_fraction(config, section)?;
                validate_positive_int(config, section, "entry_lookback", 40)?;
                validate_positive_int(config, section, "exit_lookback", 20)?;
            }
            "new_high_breakout" => {
                validate_allocation_fraction(config)?;
                validate_benchmark(config, &instruments)?;
            }
            _ => unreachable!(),
        }
    }
    Ok(())
}

fn validate_initial_cash(config: &dyn ConfigPort) -> Result<(), AlphaledgerError> {
    let value = config.get_double("session", "initial_cash", 0.0);
    if value <= 0.0 {
        return Err(AlphaledgerError::ConfigInvalid {
            section: "session".to_string(),
            key: "initial_cash".to_string(),
            reason: "initial_cash must be positive".to_string(),
        });
    }
    Ok(())
}

fn validate_instruments(config: &dyn ConfigPort) -> Result<Vec<String>, AlphaledgerError> {
    match config.get_string("session", "instruments") {
        Some(raw) if !raw.trim().is_empty() => parse_instruments(&raw),
        _ => Err(AlphaledgerError::ConfigMissing {
            section: "session".to_string(),
            key: "instruments".to_string(),
        }),
    }
}

/// Parse a comma-separated symbol list: trimmed, uppercased, no empties, no
/// duplicates.
pub fn parse_instruments(input: &str) -> Result<Vec<String>, AlphaledgerError> {
    let mut symbols = Vec::new();
    for token in input.split(',') {
        let symbol = token.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(AlphaledgerError::ConfigInvalid {
                section: "session".to_string(),
                key: "instruments".to_string(),
                reason: "empty symbol in instrument list".to_string(),
            });
        }
        if symbols.contains(&symbol) {
            return Err(AlphaledgerError::ConfigInvalid {
                section: "session".to_string(),
                key: "instruments".to_string(),
                reason: format!("duplicate symbol {symbol}"),
            });
        }
        symbols.push(symbol);
    }
    Ok(symbols)
}

fn validate_start_date(config: &dyn ConfigPort) -> Result<(), AlphaledgerError> {
    if let Some(raw) = config.get_string("session", "start_date") {
        NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|_| {
            AlphaledgerError::ConfigInvalid {
                section: "session".to_string(),
                key: "start_date".to_string(),
                reason: "invalid start_date format, expected YYYY-MM-DD".to_string(),
            }
        })?;
    }
    Ok(())
}

fn validate_risk_fraction(config: &dyn ConfigPort, section: &str) -> Result<(), AlphaledgerError> {
    let value = config.get_double(section, "risk_fraction", 0.0);
    if value <= 0.0 || value >= 1.0 {
        return Err(AlphaledgerError::ConfigInvalid {
            section: section.to_string(),
            key: "risk_fraction".to_string(),
            reason: "risk_fraction must be between 0 and 1 exclusive".to_string(),
        });
    }
    Ok(())
}

fn validate_allocation_fraction(config: &dyn ConfigPort) -> Result<(), AlphaledgerError> {
    let value = config.get_double(
        "new_high_breakout",
        "allocation_fraction",
        crate::domain::strategy::new_high_breakout::NewHighBreakout::DEFAULT_ALLOCATION_FRACTION,
    );
    if value <= 0.0 || value > 1.0 {
        return Err(AlphaledgerError::ConfigInvalid {
            section: "new_high_breakout".to_string(),
            key: "allocation_fraction".to_string(),
            reason: "allocation_fraction must be in (0, 1]".to_string(),
        });
    }
    Ok(())
}

fn validate_positive_int(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
) -> Result<(), AlphaledgerError> {
    let value = config.get_int(section, key, default);
    if value < 1 {
        return Err(AlphaledgerError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: format!("{key} must be at least 1"),
        });
    }
    Ok(())
}

fn validate_benchmark(
    config: &dyn ConfigPort,
    instruments: &[String],
) -> Result<(), AlphaledgerError> {
    match config.get_string("session", "benchmark") {
        Some(symbol) if !symbol.trim().is_empty() => {
            let symbol = symbol.trim().to_uppercase();
            if !instruments.contains(&symbol) {
                return Err(AlphaledgerError::ConfigInvalid {
                    section: "session".to_string(),
                    key: "benchmark".to_string(),
                    reason: format!("benchmark {symbol} is not in the instrument list"),
                });
            }
            Ok(())
        }
        _ => Err(AlphaledgerError::ConfigMissing {
            section: "session".to_string(),
            key: "benchmark".to_string(),
        }),
    }
}
