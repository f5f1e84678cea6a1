use std::fmt::Write;

use common::{BacktestSummary, ConnectionProbe, TradingConfig};
use control::Mode;
use poller::{DataSource, LiveView};
use series::{latest_trades, RECENT_TRADES};

/// Chart rows printed by `chart`; older points are elided.
const CHART_ROWS: usize = 15;

pub fn config(cfg: &TradingConfig) -> String {
    let mode = Mode::of(cfg);
    let mut out = String::new();
    let _ = writeln!(out, "Mode:        {mode}");
    let _ = writeln!(out, "Symbol:      {}", cfg.symbol);
    if cfg.multi_pair_mode {
        let _ = writeln!(out, "Pairs ({}):   {}", cfg.symbols.len(), cfg.symbols.join(", "));
    }
    let _ = writeln!(
        out,
        "Risk:        {}%   stop loss {}%   take profit {}%",
        cfg.risk, cfg.stop_loss, cfg.take_profit
    );
    let _ = writeln!(
        out,
        "Trade:       {} USDT   kill switch after {} losses",
        cfg.trade_amount, cfg.kill_switch_threshold
    );
    let _ = writeln!(
        out,
        "Strategy:    {}   {} {}x on {}{}",
        cfg.strategy_type,
        cfg.trading_mode,
        cfg.leverage,
        cfg.exchange,
        if cfg.real_mode { "   REAL MONEY" } else { "" }
    );
    let _ = writeln!(
        out,
        "Credentials: {}",
        if cfg.has_credentials() { "set" } else { "not set" }
    );
    for note in mode.parameter_band().advisories(cfg) {
        let _ = writeln!(out, "  note: {note}");
    }
    out
}

pub fn status(view: &LiveView) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Engine:  {}",
        if view.running { "RUNNING" } else { "STOPPED" }
    );
    match view.mode {
        Some(mode) => {
            let _ = writeln!(out, "Polling: {mode}");
        }
        None => {
            let _ = writeln!(out, "Polling: stopped");
        }
    }
    match &view.balance {
        Some(b) => {
            let _ = writeln!(out, "Balance: {:.2} USDT", b.balance);
        }
        None => {
            let _ = writeln!(out, "Balance: unknown");
        }
    }
    if let Some(err) = &view.last_error {
        let _ = writeln!(out, "Last error: {err}");
    }
    out
}

pub fn chart(view: &LiveView) -> String {
    let mut out = String::new();
    let source = match &view.chart_source {
        DataSource::Live => "live".to_string(),
        DataSource::Synthetic { reason } => format!("synthetic, {reason}"),
    };
    let _ = writeln!(out, "{} ({source})", view.chart_symbol);
    if let Some(quote) = &view.current_price {
        let _ = writeln!(out, "Current: ${:.4}", quote.price);
    }
    if view.chart.points.is_empty() {
        let _ = writeln!(out, "  not enough candles for both moving averages yet");
        return out;
    }

    let skip = view.chart.points.len().saturating_sub(CHART_ROWS);
    let _ = writeln!(out, "  time        price     fast MA     slow MA");
    for point in &view.chart.points[skip..] {
        let marks: Vec<String> = view
            .chart
            .markers
            .iter()
            .filter(|m| m.chart_index == point.index)
            .map(|m| format!("{} @ {:.4}", m.side, m.price))
            .collect();
        let _ = writeln!(
            out,
            "  {}  {:>10.4}  {:>10.4}  {:>10.4}  {}",
            point.time_label,
            point.price,
            point.fast_ma,
            point.slow_ma,
            marks.join(", ")
        );
    }
    out
}

pub fn stats(view: &LiveView) -> String {
    let s = &view.stats;
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Trades:   {} ({} won, {} lost)",
        s.total_trades, s.winning_trades, s.losing_trades
    );
    let _ = writeln!(out, "Win rate: {:.1}%", s.win_rate);
    let _ = writeln!(out, "P&L:      {:+.2} USDT", s.total_pnl);
    let _ = writeln!(out, "Volume:   {:.2} USDT", s.volume);
    match s.profit_factor {
        Some(pf) => {
            let _ = writeln!(out, "Profit factor: {pf:.2}");
        }
        None => {
            let _ = writeln!(out, "Profit factor: n/a");
        }
    }
    let _ = writeln!(out, "Balance:  {:.2} USDT", s.balance);
    if let Some(perf) = &view.performance {
        if let Some(losses) = perf.consecutive_losses {
            let _ = writeln!(out, "Consecutive losses: {losses}");
        }
        if perf.kill_switch_active == Some(true) {
            let _ = writeln!(out, "KILL SWITCH ACTIVE");
        }
    }
    out
}

pub fn trades(view: &LiveView) -> String {
    let recent = latest_trades(&view.trades, RECENT_TRADES);
    if recent.is_empty() {
        return "No trades yet\n".to_string();
    }
    let mut out = String::new();
    for t in recent {
        let _ = writeln!(
            out,
            "{}  {:<10} {:<4} {:>12.4} x {:<10} pnl {:+.2} ({:+.2}%)  {}",
            t.timestamp.format("%Y-%m-%d %H:%M:%S"),
            t.symbol,
            t.side,
            t.price,
            t.size,
            t.pnl,
            t.roi_pct(),
            t.status
        );
    }
    out
}

pub fn backtest(summary: &BacktestSummary) -> String {
    let mut out = String::new();
    if let Some(message) = &summary.message {
        let _ = writeln!(out, "{message}");
    }
    for (key, value) in &summary.details {
        let _ = writeln!(out, "  {key}: {value}");
    }
    out
}

pub fn probe(probe: &ConnectionProbe) -> String {
    let mut out = String::from(if probe.success {
        "Connection OK"
    } else {
        "Connection failed"
    });
    if let Some(balance) = probe.balance {
        let _ = write!(out, ", balance {balance:.2} USDT");
    }
    if let Some(message) = &probe.message {
        let _ = write!(out, " ({message})");
    }
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_never_prints_credentials() {
        let cfg = TradingConfig {
            api_key: "AKIA-visible".into(),
            api_secret: "hunter2".into(),
            ..TradingConfig::default()
        };
        let text = config(&cfg);
        assert!(!text.contains("AKIA-visible"));
        assert!(!text.contains("hunter2"));
        assert!(text.contains("Credentials: set"));
    }

    #[test]
    fn empty_chart_says_why() {
        let view = LiveView {
            chart_symbol: "BTC/USDT".into(),
            chart_source: DataSource::Synthetic {
                reason: "engine returned no candles".into(),
            },
            ..LiveView::default()
        };
        let text = chart(&view);
        assert!(text.starts_with("BTC/USDT (synthetic, engine returned no candles)"));
        assert!(text.contains("not enough candles"));
    }

    #[test]
    fn chart_header_shows_current_price() {
        let view = LiveView {
            chart_symbol: "ETH/USDT".into(),
            current_price: Some(common::PriceQuote {
                symbol: "ETH/USDT".into(),
                price: 3150.5,
                timestamp: chrono::Utc::now(),
            }),
            ..LiveView::default()
        };
        let text = chart(&view);
        assert!(text.starts_with("ETH/USDT (live)\nCurrent: $3150.5000\n"));
    }

    #[test]
    fn no_trades_message() {
        assert_eq!(trades(&LiveView::default()), "No trades yet\n");
    }
}
