use serde::Serialize;

use common::{Trade, STARTING_BALANCE};

/// How many trades the dashboard lists as "recent".
pub const RECENT_TRADES: usize = 5;

/// Performance figures derived from the trade log.
/// Only executed trades are counted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceStats {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub total_pnl: f64,
    /// Percentage, 0–100.
    pub win_rate: f64,
    /// Sum of price × size over executed trades.
    pub volume: f64,
    /// Gross wins over gross losses; `None` when nothing was lost.
    pub profit_factor: Option<f64>,
    pub balance: f64,
}

impl Default for PerformanceStats {
    fn default() -> Self {
        Self {
            total_trades: 0,
            winning_trades: 0,
            losing_trades: 0,
            total_pnl: 0.0,
            win_rate: 0.0,
            volume: 0.0,
            profit_factor: None,
            balance: STARTING_BALANCE,
        }
    }
}

impl PerformanceStats {
    pub fn from_trades(trades: &[Trade]) -> Self {
        let executed: Vec<&Trade> = trades.iter().filter(|t| t.is_executed()).collect();
        if executed.is_empty() {
            return Self::default();
        }

        let gross_win: f64 = executed.iter().filter(|t| t.pnl > 0.0).map(|t| t.pnl).sum();
        let gross_loss: f64 = executed
            .iter()
            .filter(|t| t.pnl < 0.0)
            .map(|t| t.pnl)
            .sum::<f64>()
            .abs();
        let winning_trades = executed.iter().filter(|t| t.pnl > 0.0).count();
        let losing_trades = executed.iter().filter(|t| t.pnl < 0.0).count();
        let total_pnl: f64 = executed.iter().map(|t| t.pnl).sum();

        Self {
            total_trades: executed.len(),
            winning_trades,
            losing_trades,
            total_pnl,
            win_rate: winning_trades as f64 / executed.len() as f64 * 100.0,
            volume: executed.iter().map(|t| t.capital_used()).sum(),
            profit_factor: (gross_loss > 0.0).then(|| gross_win / gross_loss),
            balance: STARTING_BALANCE + total_pnl,
        }
    }
}

/// The `n` most recent trades, newest first.
pub fn latest_trades(trades: &[Trade], n: usize) -> Vec<Trade> {
    let mut sorted = trades.to_vec();
    sorted.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    sorted.truncate(n);
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use common::{TradeSide, TradeStatus};

    fn trade(minute: i64, pnl: f64, status: TradeStatus) -> Trade {
        Trade {
            id: None,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minute),
            symbol: "BTC/USDT".into(),
            side: TradeSide::Buy,
            price: 100.0,
            size: 2.0,
            pnl,
            status,
            stop_loss: None,
            take_profit: None,
        }
    }

    #[test]
    fn empty_log_gives_starting_balance() {
        let stats = PerformanceStats::from_trades(&[]);
        assert_eq!(stats, PerformanceStats::default());
        assert_eq!(stats.balance, STARTING_BALANCE);
    }

    #[test]
    fn only_executed_trades_count() {
        let trades = vec![
            trade(0, 30.0, TradeStatus::Executed),
            trade(1, -10.0, TradeStatus::Executed),
            trade(2, 50.0, TradeStatus::Executed),
            trade(3, 999.0, TradeStatus::Open),
        ];
        let stats = PerformanceStats::from_trades(&trades);
        assert_eq!(stats.total_trades, 3);
        assert_eq!(stats.winning_trades, 2);
        assert_eq!(stats.losing_trades, 1);
        assert!((stats.total_pnl - 70.0).abs() < 1e-9);
        assert!((stats.win_rate - 200.0 / 3.0).abs() < 1e-9);
        assert!((stats.volume - 600.0).abs() < 1e-9);
        assert_eq!(stats.profit_factor, Some(8.0));
        assert!((stats.balance - 10_070.0).abs() < 1e-9);
    }

    #[test]
    fn profit_factor_absent_without_losses() {
        let stats = PerformanceStats::from_trades(&[trade(0, 5.0, TradeStatus::Executed)]);
        assert_eq!(stats.profit_factor, None);
        assert_eq!(stats.win_rate, 100.0);
    }

    #[test]
    fn latest_trades_newest_first() {
        let trades: Vec<Trade> = (0..8).map(|m| trade(m, 0.0, TradeStatus::Executed)).collect();
        let latest = latest_trades(&trades, RECENT_TRADES);
        assert_eq!(latest.len(), 5);
        assert_eq!(latest[0].timestamp, trades[7].timestamp);
        assert_eq!(latest[4].timestamp, trades[3].timestamp);
    }
}
