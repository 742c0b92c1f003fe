//! HTML dashboard rendering

use crate::market::Sentiment;
use crate::services::{DashboardSnapshot, IndexReport};
use crate::state::RefreshError;
use chrono_tz::Asia::Kolkata;
use std::fmt::Write;

/// Escape text for HTML element content and attribute values
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Everything the page needs besides the snapshot itself
pub struct PageContext<'a> {
    pub snapshot: Option<&'a DashboardSnapshot>,
    pub last_error: Option<&'a RefreshError>,
    pub stale: bool,
    pub refresh_secs: u64,
}

fn sentiment_class(sentiment: Sentiment) -> &'static str {
    if sentiment.is_bullish() {
        "bull"
    } else if sentiment.is_bearish() {
        "bear"
    } else {
        "flat"
    }
}

fn signed_class(value: f64) -> &'static str {
    if value > 0.0 {
        "up"
    } else if value < 0.0 {
        "down"
    } else {
        ""
    }
}

fn status_badge(ctx: &PageContext<'_>) -> (&'static str, &'static str) {
    match ctx.snapshot {
        Some(snapshot) if !snapshot.live => ("SAMPLE", "badge-sample"),
        Some(_) if !ctx.stale => ("LIVE", "badge-live"),
        _ => ("OFFLINE", "badge-offline"),
    }
}

fn render_card(report: &IndexReport) -> String {
    let r = &report.result;
    let mut rows = String::new();
    for row in &report.constituents {
        let price = row
            .last_price
            .map(|p| format!("&#8377;{:.2}", p))
            .unwrap_or_else(|| "-".to_string());
        let pcr = row
            .quote
            .pcr
            .map(|p| format!("{:.2}", p))
            .unwrap_or_else(|| "-".to_string());
        let _ = write!(
            rows,
            "<tr><td>{symbol}</td><td>{weight:.2}%</td><td class=\"{cls}\">{change:+.2}%</td>\
             <td>{oi:.0}</td><td>{pcr}</td><td class=\"{cls}\">{impact:+.4}</td><td>{price}</td></tr>",
            symbol = escape_html(&row.quote.symbol),
            weight = row.quote.weight,
            cls = signed_class(row.quote.percent_change),
            change = row.quote.percent_change,
            oi = row.quote.oi_change,
            pcr = pcr,
            impact = row.impact,
            price = price,
        );
    }
    if rows.is_empty() {
        rows.push_str(
            "<tr><td colspan=\"7\" class=\"muted\">No constituents in this cycle's movers</td></tr>",
        );
    }

    format!(
        r#"<section class="card">
<div class="card-head"><h2>{name}</h2><span class="label {label_cls}">{label}</span></div>
<div class="metrics">
<div><span class="muted">Net impact</span><b class="{net_cls}">{net:+.3}</b></div>
<div><span class="muted">Gainers / Losers</span><b>{gainers:.3} / {losers:.3}</b></div>
<div><span class="muted">Weighted PCR</span><b>{pcr:.2}</b></div>
<div><span class="muted">Coverage</span><b>{coverage:.2}% ({matched})</b></div>
<div><span class="muted">Advancing / Declining</span><b>{adv} / {dec}</b></div>
<div><span class="muted">OI factor / PCR factor</span><b>{oi_factor} / {pcr_factor}</b></div>
</div>
<table>
<thead><tr><th>Symbol</th><th>Weight</th><th>Change</th><th>OI chg</th><th>PCR</th><th>Impact</th><th>Price</th></tr></thead>
<tbody>{rows}</tbody>
</table>
</section>"#,
        name = escape_html(&report.index),
        label_cls = sentiment_class(r.sentiment),
        label = escape_html(r.sentiment.label()),
        net_cls = signed_class(r.net_impact),
        net = r.net_impact,
        gainers = r.gainers_impact,
        losers = r.losers_impact,
        pcr = r.weighted_pcr,
        coverage = r.coverage,
        matched = r.matched,
        adv = r.advancing,
        dec = r.declining,
        oi_factor = r.oi_sentiment.label(),
        pcr_factor = r.pcr_sentiment.label(),
        rows = rows,
    )
}

/// Render the full dashboard page
pub fn render_dashboard(ctx: &PageContext<'_>) -> String {
    let (badge, badge_cls) = status_badge(ctx);

    let banner = match (ctx.last_error, ctx.stale) {
        (Some(err), true) => format!(
            "<div class=\"banner\">Last refresh failed at {} IST: {}{}</div>",
            err.at.with_timezone(&Kolkata).format("%H:%M:%S"),
            escape_html(&err.message),
            if ctx.snapshot.is_some() { " (showing previous data)" } else { "" }
        ),
        _ => String::new(),
    };

    let (source, updated, cards) = match ctx.snapshot {
        Some(snapshot) => (
            escape_html(&snapshot.data_source),
            snapshot
                .generated_at
                .with_timezone(&Kolkata)
                .format("%d %b %Y %H:%M:%S IST")
                .to_string(),
            snapshot.reports.iter().map(render_card).collect::<String>(),
        ),
        None => (
            "-".to_string(),
            "never".to_string(),
            "<p class=\"muted\">Waiting for the first market data refresh.</p>".to_string(),
        ),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<meta http-equiv="refresh" content="{refresh}">
<title>Index Sentiment</title>
<style>
body {{ font-family: system-ui, sans-serif; background: #0f172a; color: #e2e8f0; margin: 0; padding: 16px; }}
header {{ display: flex; flex-wrap: wrap; gap: 12px; align-items: center; justify-content: space-between; }}
h1 {{ font-size: 1.4rem; margin: 0; }}
.badge {{ padding: 2px 10px; border-radius: 10px; font-size: 0.8rem; font-weight: 600; }}
.badge-live {{ background: #16a34a; }}
.badge-sample {{ background: #ca8a04; }}
.badge-offline {{ background: #dc2626; }}
.banner {{ background: #7f1d1d; padding: 8px 12px; border-radius: 6px; margin: 12px 0; }}
.grid {{ display: grid; grid-template-columns: repeat(auto-fit, minmax(420px, 1fr)); gap: 16px; margin-top: 16px; }}
.card {{ background: #1e293b; border-radius: 8px; padding: 12px; overflow-x: auto; }}
.card-head {{ display: flex; justify-content: space-between; align-items: center; }}
.card-head h2 {{ font-size: 1.1rem; margin: 0; }}
.label {{ padding: 4px 10px; border-radius: 6px; font-weight: 700; }}
.bull {{ background: #166534; }}
.bear {{ background: #991b1b; }}
.flat {{ background: #475569; }}
.metrics {{ display: grid; grid-template-columns: repeat(3, 1fr); gap: 8px; margin: 12px 0; }}
.metrics div {{ display: flex; flex-direction: column; }}
table {{ width: 100%; border-collapse: collapse; font-size: 0.85rem; }}
th, td {{ text-align: right; padding: 4px 6px; border-bottom: 1px solid #334155; }}
th:first-child, td:first-child {{ text-align: left; }}
.up {{ color: #4ade80; }}
.down {{ color: #f87171; }}
.muted {{ color: #94a3b8; font-size: 0.8rem; }}
</style>
</head>
<body>
<header>
<h1>Index Sentiment</h1>
<div><span class="badge {badge_cls}">{badge}</span> <span class="muted">{source} &middot; updated {updated} &middot; every {refresh}s</span></div>
</header>
{banner}
<div class="grid">
{cards}
</div>
</body>
</html>"#,
        refresh = ctx.refresh_secs,
        badge_cls = badge_cls,
        badge = badge,
        source = source,
        updated = updated,
        banner = banner,
        cards = cards,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::{ConstituentTable, RawQuote};
    use crate::services::SentimentService;
    use chrono::Utc;

    fn snapshot(live: bool) -> DashboardSnapshot {
        let report = SentimentService::evaluate(
            &ConstituentTable::nifty_50(),
            &[RawQuote::new("M&M25JAN24FUT", 1.5, 10.0).with_pcr(0.7)],
        );
        DashboardSnapshot {
            reports: vec![report],
            data_source: if live { "Live Market Data" } else { "Sample Data" }.to_string(),
            broker: "Test".to_string(),
            live,
            priced: 0,
            generated_at: Utc::now(),
        }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<script>alert("x&y")</script>"#),
            "&lt;script&gt;alert(&quot;x&amp;y&quot;)&lt;/script&gt;"
        );
        assert_eq!(escape_html("O'Neil"), "O&#39;Neil");
    }

    #[test]
    fn test_page_shows_cards_and_escapes_symbols() {
        let snapshot = snapshot(true);
        let html = render_dashboard(&PageContext {
            snapshot: Some(&snapshot),
            last_error: None,
            stale: false,
            refresh_secs: 30,
        });
        assert!(html.contains("http-equiv=\"refresh\" content=\"30\""));
        assert!(html.contains("NIFTY 50"));
        assert!(html.contains("M&amp;M"));
        assert!(html.contains("Very Bullish"));
        assert!(html.contains(">LIVE<"));
        assert!(!html.contains("class=\"banner\""));
    }

    #[test]
    fn test_sample_badge() {
        let snapshot = snapshot(false);
        let html = render_dashboard(&PageContext {
            snapshot: Some(&snapshot),
            last_error: None,
            stale: false,
            refresh_secs: 30,
        });
        assert!(html.contains(">SAMPLE<"));
        assert!(html.contains("Sample Data"));
    }

    #[test]
    fn test_stale_banner() {
        let snapshot = snapshot(true);
        let error = RefreshError {
            code: "BROKER_ERROR",
            message: "gainersLosers <timeout>".to_string(),
            at: Utc::now(),
        };
        let html = render_dashboard(&PageContext {
            snapshot: Some(&snapshot),
            last_error: Some(&error),
            stale: true,
            refresh_secs: 30,
        });
        assert!(html.contains(">OFFLINE<"));
        assert!(html.contains("gainersLosers &lt;timeout&gt;"));
        assert!(html.contains("showing previous data"));
    }

    #[test]
    fn test_empty_page() {
        let html = render_dashboard(&PageContext {
            snapshot: None,
            last_error: None,
            stale: true,
            refresh_secs: 15,
        });
        assert!(html.contains("Waiting for the first market data refresh"));
        assert!(html.contains(">OFFLINE<"));
    }
}
