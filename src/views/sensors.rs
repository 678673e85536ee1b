use std::fmt::Write;

use super::{escape_html, json_script, layout, or_dash};
use crate::bridge::{HistoricalEntry, LiveStatus, LiveView};
use crate::context::RequestContext;
use crate::evaluation::{Evaluation, StatusTier};
use crate::reports::SensorLatest;

fn tier_class(tier: StatusTier) -> &'static str {
    match tier {
        StatusTier::Optimal => "tier-optimal",
        StatusTier::High | StatusTier::Low => "tier-warning",
        StatusTier::CriticalHigh | StatusTier::CriticalLow => "tier-critical",
    }
}

#[must_use]
pub fn sensors_page(
    ctx: &RequestContext,
    live: &LiveView,
    latest: &[(SensorLatest, Option<Evaluation>)],
    history: &[HistoricalEntry],
) -> String {
    let mut body = String::new();
    let _ = writeln!(
        body,
        "<h1>Sensors</h1>\n<p class=\"report-user\">Signed in as {}</p>",
        escape_html(&ctx.username)
    );

    body.push_str(&live_cards(live));
    body.push_str(&latest_table(latest));
    body.push_str(&json_script("bridge-history", &history));

    layout("Sensors", &body)
}

fn live_cards(live: &LiveView) -> String {
    let status_class = match live.status {
        LiveStatus::Live => "bridge-online",
        LiveStatus::Stale => "bridge-stale",
        LiveStatus::Offline => "bridge-offline",
    };
    let mut html = format!(
        "<section class=\"live\">\n<p class=\"bridge-status {status_class}\">Sensor bridge: {}",
        live.status.label()
    );
    if let Some(at) = live.fetched_at {
        let _ = write!(html, " <small>as of {}</small>", at.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    html.push_str("</p>\n");

    if live.readings.is_empty() {
        html.push_str("<p class=\"no-data\">No live readings available.</p>\n");
    }

    for reading in &live.readings {
        let value = reading
            .value
            .map_or_else(|| "N/A".to_string(), |v| format!("{v:.1}{}", reading.unit));
        let (class, tier, remark) = reading.evaluation.as_ref().map_or(
            ("tier-unknown", "Unknown", String::new()),
            |e| (tier_class(e.tier), e.tier.label(), escape_html(&e.remark)),
        );
        let _ = writeln!(
            html,
            "<div class=\"live-card {class}\" data-sensor=\"{}\">\
             <h2>{}</h2><p class=\"value\">{}</p><p class=\"tier\">{tier}</p>\
             <p class=\"remark\">{remark}</p><small>{}</small></div>",
            reading.sensor_type,
            reading.sensor_type.label(),
            escape_html(&value),
            or_dash(reading.timestamp.as_deref())
        );
    }
    html.push_str("</section>\n");
    html
}

fn latest_table(latest: &[(SensorLatest, Option<Evaluation>)]) -> String {
    if latest.is_empty() {
        return "<p class=\"no-data\">No sensors registered.</p>\n".to_string();
    }

    let mut html = String::from(
        "<table class=\"sensor-table\">\n<thead><tr><th>Sensor</th><th>Type</th><th>Location</th>\
         <th>Latest</th><th>Status</th><th>Last Reading</th></tr></thead>\n<tbody>\n",
    );
    for (sensor, evaluation) in latest {
        let value = sensor.latest_value.map_or_else(
            || "-".to_string(),
            |v| format!("{v:.1}{}", sensor.unit.as_deref().unwrap_or("")),
        );
        let (class, tier) = evaluation
            .as_ref()
            .map_or(("tier-unknown", "-"), |e| (tier_class(e.tier), e.tier.label()));
        let _ = writeln!(
            html,
            "<tr class=\"{class}\"><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{tier}</td><td>{}</td></tr>",
            escape_html(&sensor.sensor_name),
            escape_html(&sensor.sensor_type),
            or_dash(sensor.location.as_deref()),
            escape_html(&value),
            sensor
                .last_reading
                .map_or_else(|| "Never".to_string(), |t| t.format("%Y-%m-%d %H:%M").to_string()),
        );
    }
    html.push_str("</tbody>\n</table>\n");
    html
}
