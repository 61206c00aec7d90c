//! Bar-cycle session engine.
//!
//! Drives one continuous run: universe events forward to the instrument
//! registry with the union of every strategy's indicator specs, and each bar
//! cycle proceeds in fixed phases: all instrument updates, then every
//! strategy's evaluation in declaration order, then reconciliation and
//! intent submission in that same order, then manual-indicator advancement,
//! then settlement of drained execution reports. A strategy that fails to
//! evaluate is skipped for that bar only; the rest of the cycle continues.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDateTime;
use tracing::{debug, info, warn};

use super::bar::TradeBar;
use super::error::AlphaledgerError;
use super::instrument::Instrument;
use super::ledger::{PositionLedger, StrategyId};
use super::reconciler::reconcile;
use super::registry::InstrumentRegistry;
use super::signal::Signal;
use super::strategy::StrategyRule;
use crate::ports::execution_port::{ExecutionOutcome, ExecutionPort};
use crate::ports::market_data_port::MarketDataPort;
use crate::ports::portfolio_port::PortfolioPort;

struct StrategySlot {
    rule: Box<dyn StrategyRule>,
    risk_fraction: f64,
}

/// Counters for one processed cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub intents_submitted: usize,
    pub fills: usize,
    pub rejections: usize,
    pub failed_strategies: usize,
}

#[derive(Default)]
pub struct Session {
    registry: InstrumentRegistry,
    ledger: PositionLedger,
    strategies: Vec<StrategySlot>,
    /// Exit intents in flight: their ledger records are already gone, so
    /// their acknowledgments settle here instead of against the ledger.
    pending_exits: HashSet<(StrategyId, Instrument)>,
}

impl Session {
    pub fn new() -> Self {
        Session {
            registry: InstrumentRegistry::new(),
            ledger: PositionLedger::new(),
            strategies: Vec::new(),
            pending_exits: HashSet::new(),
        }
    }

    /// Register a strategy. Declaration order is evaluation order and must
    /// be stable run-to-run.
    pub fn add_strategy(&mut self, rule: Box<dyn StrategyRule>, risk_fraction: f64) {
        self.strategies.push(StrategySlot {
            rule,
            risk_fraction,
        });
    }

    pub fn on_instrument_added(
        &mut self,
        instrument: &Instrument,
        data: &dyn MarketDataPort,
    ) -> Result<(), AlphaledgerError> {
        let specs: Vec<_> = self
            .strategies
            .iter()
            .flat_map(|slot| slot.rule.required_indicators())
            .collect();
        self.registry.on_instrument_added(instrument, &specs, data)
    }

    pub fn on_instrument_removed(&mut self, instrument: &Instrument, data: &dyn MarketDataPort) {
        self.registry.on_instrument_removed(instrument, data);
    }

    /// Process one cycle of bars plus any execution reports that have
    /// arrived since the previous cycle.
    pub fn run_cycle<B: ExecutionPort + PortfolioPort>(
        &mut self,
        bars: &[TradeBar],
        broker: &mut B,
    ) -> Result<CycleSummary, AlphaledgerError> {
        let mut summary = CycleSummary::default();

        for bar in bars {
            self.registry.on_bar(bar);
        }
        let bar_map: HashMap<Instrument, TradeBar> = bars
            .iter()
            .map(|bar| (bar.instrument.clone(), bar.clone()))
            .collect();

        if let Some(ts) = bars.iter().map(|bar| bar.timestamp).max() {
            self.evaluate_and_submit(&bar_map, ts, broker, &mut summary)?;
            for slot in &self.strategies {
                slot.rule.advance_manual(&mut self.registry, &bar_map);
            }
        }

        self.settle_reports(broker, &mut summary)?;
        Ok(summary)
    }

    fn evaluate_and_submit<B: ExecutionPort + PortfolioPort>(
        &mut self,
        bar_map: &HashMap<Instrument, TradeBar>,
        ts: NaiveDateTime,
        broker: &mut B,
        summary: &mut CycleSummary,
    ) -> Result<(), AlphaledgerError> {
        let portfolio = broker.snapshot();
        let ready = self.registry.ready_instruments();

        // evaluation completes for every strategy before any intent is
        // emitted; a faulty rule is isolated to its own signals
        let mut evaluated: Vec<(StrategyId, Vec<Signal>)> = Vec::new();
        for slot in &self.strategies {
            let ctx = super::strategy::EvalContext::new(
                &ready,
                bar_map,
                portfolio,
                slot.risk_fraction,
                &self.registry,
                &self.ledger,
                slot.rule.id(),
            );
            match slot.rule.evaluate(&ctx) {
                Ok(signals) => evaluated.push((slot.rule.id().clone(), signals)),
                Err(err) => {
                    warn!(strategy = %slot.rule.id(), error = %err, "evaluation failed; strategy skipped this bar");
                    summary.failed_strategies += 1;
                }
            }
        }

        for (strategy, signals) in evaluated {
            let intents = reconcile(&mut self.ledger, &strategy, &signals, ts)?;
            for intent in &intents {
                if self.ledger.read(&strategy, &intent.instrument).is_none() {
                    self.pending_exits
                        .insert((strategy.clone(), intent.instrument.clone()));
                }
                info!(
                    strategy = %strategy,
                    instrument = %intent.instrument,
                    delta = intent.delta,
                    "intent submitted"
                );
                broker.submit(&strategy, intent)?;
            }
            summary.intents_submitted += intents.len();
        }
        Ok(())
    }

    fn settle_reports<B: ExecutionPort>(
        &mut self,
        broker: &mut B,
        summary: &mut CycleSummary,
    ) -> Result<(), AlphaledgerError> {
        for report in broker.drain_reports() {
            let key = (report.strategy.clone(), report.instrument.clone());
            if self.pending_exits.remove(&key) {
                // the exit's record was liquidated at reconcile time
                match report.outcome {
                    ExecutionOutcome::Filled => summary.fills += 1,
                    ExecutionOutcome::Rejected { reason } => {
                        warn!(
                            strategy = %report.strategy,
                            instrument = %report.instrument,
                            reason = %reason,
                            "exit order rejected after liquidation"
                        );
                        summary.rejections += 1;
                    }
                }
                continue;
            }

            match report.outcome {
                ExecutionOutcome::Filled => {
                    self.ledger.confirm(&report.strategy, &report.instrument)?;
                    debug!(strategy = %report.strategy, instrument = %report.instrument, "fill confirmed");
                    summary.fills += 1;
                }
                ExecutionOutcome::Rejected { reason } => {
                    warn!(
                        strategy = %report.strategy,
                        instrument = %report.instrument,
                        reason = %reason,
                        "order rejected; proposal rolled back"
                    );
                    self.ledger.reject(&report.strategy, &report.instrument)?;
                    summary.rejections += 1;
                }
            }
        }
        Ok(())
    }

    pub fn registry(&self) -> &InstrumentRegistry {
        &self.registry
    }

    pub fn ledger(&self) -> &PositionLedger {
        &self.ledger
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::{IndicatorKind, IndicatorSpec};
    use crate::domain::ledger::ConfirmationState;
    use crate::domain::signal::{Direction, OrderIntent};
    use crate::domain::sizer::SizingError;
    use crate::domain::strategy::{EvalContext, StrategyError};
    use crate::ports::execution_port::ExecutionReport;
    use crate::ports::portfolio_port::PortfolioSnapshot;
    use chrono::NaiveDate;

    struct NoHistory;

    impl MarketDataPort for NoHistory {
        fn fetch_history(
            &self,
            _instrument: &Instrument,
            _bars: usize,
        ) -> Result<Vec<TradeBar>, AlphaledgerError> {
            Ok(Vec::new())
        }
        fn release(&self, _instrument: &Instrument) {}
    }

    /// Broker stub: fills or rejects everything, reporting immediately.
    struct StubBroker {
        reject_all: bool,
        reports: Vec<ExecutionReport>,
        submitted: Vec<(StrategyId, OrderIntent)>,
    }

    impl StubBroker {
        fn filling() -> Self {
            StubBroker {
                reject_all: false,
                reports: Vec::new(),
                submitted: Vec::new(),
            }
        }

        fn rejecting() -> Self {
            StubBroker {
                reject_all: true,
                reports: Vec::new(),
                submitted: Vec::new(),
            }
        }
    }

    impl ExecutionPort for StubBroker {
        fn submit(
            &mut self,
            strategy: &StrategyId,
            intent: &OrderIntent,
        ) -> Result<(), AlphaledgerError> {
            self.submitted.push((strategy.clone(), intent.clone()));
            self.reports.push(ExecutionReport {
                strategy: strategy.clone(),
                instrument: intent.instrument.clone(),
                outcome: if self.reject_all {
                    ExecutionOutcome::Rejected {
                        reason: "scripted rejection".into(),
                    }
                } else {
                    ExecutionOutcome::Filled
                },
            });
            Ok(())
        }

        fn drain_reports(&mut self) -> Vec<ExecutionReport> {
            std::mem::take(&mut self.reports)
        }
    }

    impl PortfolioPort for StubBroker {
        fn snapshot(&self) -> PortfolioSnapshot {
            PortfolioSnapshot {
                total_value: 100_000.0,
                available_cash: 100_000.0,
            }
        }
    }

    /// Rule stub: wants one short SMA and emits a fixed target for every
    /// ready instrument, or an exit when `target` is zero.
    struct FixedRule {
        id: StrategyId,
        target: i64,
    }

    impl FixedRule {
        fn new(name: &str, target: i64) -> Self {
            FixedRule {
                id: StrategyId::new(name),
                target,
            }
        }
    }

    impl StrategyRule for FixedRule {
        fn id(&self) -> &StrategyId {
            &self.id
        }

        fn required_indicators(&self) -> Vec<IndicatorSpec> {
            vec![IndicatorSpec::auto("sma_2", IndicatorKind::Sma(2))]
        }

        fn evaluate(&self, ctx: &EvalContext) -> Result<Vec<Signal>, StrategyError> {
            Ok(ctx
                .ready
                .iter()
                .map(|instrument| {
                    if self.target == 0 {
                        Signal::exit(instrument.clone())
                    } else {
                        Signal::entry(instrument.clone(), Direction::Long, self.target)
                    }
                })
                .collect())
        }
    }

    /// Rule stub that always fails to evaluate.
    struct FaultyRule {
        id: StrategyId,
    }

    impl StrategyRule for FaultyRule {
        fn id(&self) -> &StrategyId {
            &self.id
        }

        fn required_indicators(&self) -> Vec<IndicatorSpec> {
            Vec::new()
        }

        fn evaluate(&self, _ctx: &EvalContext) -> Result<Vec<Signal>, StrategyError> {
            Err(StrategyError::Sizing(SizingError::InvalidVolatility {
                volatility: 0.0,
            }))
        }
    }

    fn bar(symbol: &str, day: u32, close: f64) -> TradeBar {
        TradeBar {
            instrument: Instrument::new(symbol),
            timestamp: NaiveDate::from_ymd_opt(2024, 1, day)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1000,
        }
    }

    fn xle() -> Instrument {
        Instrument::new("XLE")
    }

    fn warmed_session(rule: Box<dyn StrategyRule>) -> (Session, StubBroker) {
        let mut session = Session::new();
        session.add_strategy(rule, 0.01);
        session.on_instrument_added(&xle(), &NoHistory).unwrap();
        let mut broker = StubBroker::filling();
        session
            .run_cycle(&[bar("XLE", 1, 100.0)], &mut broker)
            .unwrap();
        (session, broker)
    }

    #[test]
    fn entry_is_proposed_then_confirmed_by_fill() {
        let (mut session, mut broker) = warmed_session(Box::new(FixedRule::new("fixed", 50)));

        let summary = session
            .run_cycle(&[bar("XLE", 2, 101.0)], &mut broker)
            .unwrap();
        assert_eq!(summary.intents_submitted, 1);
        assert_eq!(summary.fills, 1);

        let record = session
            .ledger()
            .read(&StrategyId::new("fixed"), &xle())
            .unwrap();
        assert_eq!(record.target, 50);
        assert_eq!(record.state, ConfirmationState::Confirmed);
    }

    #[test]
    fn repeated_cycle_does_not_resubmit() {
        let (mut session, mut broker) = warmed_session(Box::new(FixedRule::new("fixed", 50)));
        session
            .run_cycle(&[bar("XLE", 2, 101.0)], &mut broker)
            .unwrap();

        let summary = session
            .run_cycle(&[bar("XLE", 3, 101.0)], &mut broker)
            .unwrap();
        assert_eq!(summary.intents_submitted, 0);
        assert_eq!(broker.submitted.len(), 1);
    }

    #[test]
    fn rejection_rolls_back_to_none() {
        let mut session = Session::new();
        session.add_strategy(Box::new(FixedRule::new("fixed", 50)), 0.01);
        session.on_instrument_added(&xle(), &NoHistory).unwrap();
        let mut broker = StubBroker::rejecting();
        session
            .run_cycle(&[bar("XLE", 1, 100.0)], &mut broker)
            .unwrap();

        let summary = session
            .run_cycle(&[bar("XLE", 2, 101.0)], &mut broker)
            .unwrap();
        assert_eq!(summary.intents_submitted, 1);
        assert_eq!(summary.rejections, 1);
        assert!(
            session
                .ledger()
                .read(&StrategyId::new("fixed"), &xle())
                .is_none()
        );
    }

    #[test]
    fn faulty_strategy_is_isolated() {
        let mut session = Session::new();
        session.add_strategy(
            Box::new(FaultyRule {
                id: StrategyId::new("faulty"),
            }),
            0.01,
        );
        session.add_strategy(Box::new(FixedRule::new("fixed", 50)), 0.01);
        session.on_instrument_added(&xle(), &NoHistory).unwrap();
        let mut broker = StubBroker::filling();
        session
            .run_cycle(&[bar("XLE", 1, 100.0)], &mut broker)
            .unwrap();

        let summary = session
            .run_cycle(&[bar("XLE", 2, 101.0)], &mut broker)
            .unwrap();
        assert_eq!(summary.failed_strategies, 1);
        assert_eq!(summary.intents_submitted, 1);
        assert!(
            session
                .ledger()
                .read(&StrategyId::new("fixed"), &xle())
                .is_some()
        );
    }

    #[test]
    fn exit_fill_settles_without_touching_ledger() {
        let (mut session, mut broker) = warmed_session(Box::new(FixedRule::new("fixed", 50)));
        session
            .run_cycle(&[bar("XLE", 2, 101.0)], &mut broker)
            .unwrap();

        // swap the warmed registry and ledger into a session whose rule
        // (same id) now wants a flat book
        let mut exit_session = Session::new();
        exit_session.add_strategy(Box::new(FixedRule::new("fixed", 0)), 0.01);
        std::mem::swap(&mut exit_session.registry, &mut session.registry);
        std::mem::swap(&mut exit_session.ledger, &mut session.ledger);

        let summary = exit_session
            .run_cycle(&[bar("XLE", 3, 102.0)], &mut broker)
            .unwrap();
        assert_eq!(summary.intents_submitted, 1);
        assert_eq!(summary.fills, 1);
        assert!(exit_session.ledger().is_empty());
    }

    #[test]
    fn two_strategies_share_an_instrument_without_interference() {
        let mut session = Session::new();
        session.add_strategy(Box::new(FixedRule::new("alpha", 50)), 0.01);
        session.add_strategy(Box::new(FixedRule::new("beta", 70)), 0.02);
        session.on_instrument_added(&xle(), &NoHistory).unwrap();
        let mut broker = StubBroker::filling();
        session
            .run_cycle(&[bar("XLE", 1, 100.0)], &mut broker)
            .unwrap();

        let summary = session
            .run_cycle(&[bar("XLE", 2, 101.0)], &mut broker)
            .unwrap();
        assert_eq!(summary.intents_submitted, 2);

        let alpha = session
            .ledger()
            .read(&StrategyId::new("alpha"), &xle())
            .unwrap();
        let beta = session
            .ledger()
            .read(&StrategyId::new("beta"), &xle())
            .unwrap();
        assert_eq!(alpha.target, 50);
        assert_eq!(beta.target, 70);
    }

    #[test]
    fn empty_cycle_only_settles_reports() {
        let (mut session, mut broker) = warmed_session(Box::new(FixedRule::new("fixed", 50)));
        let summary = session.run_cycle(&[], &mut broker).unwrap();
        assert_eq!(summary, CycleSummary::default());
    }
}
