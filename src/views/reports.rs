use std::fmt::Write;

use super::{escape_html, flash_banner, json_script, layout, or_dash};
use crate::context::RequestContext;
use crate::domain::{DateRange, ExportFormat, ReportKind};
use crate::reports::{Report, ReportRows, ReportSummary};

/// Link to the report page, optionally requesting an export.
#[must_use]
pub fn report_href(kind: ReportKind, range: &DateRange, export: Option<ExportFormat>) -> String {
    let mut href = format!(
        "/reports?report_type={kind}&start_date={}&end_date={}",
        range.start.format("%Y-%m-%d"),
        range.end.format("%Y-%m-%d")
    );
    if let Some(format) = export {
        let _ = write!(href, "&export={format}");
    }
    href
}

#[must_use]
pub fn report_page(ctx: &RequestContext, report: &Report, flash: Option<&str>) -> String {
    let mut body = String::new();

    body.push_str(&flash_banner(flash));
    let _ = writeln!(
        body,
        "<h1>{} Report</h1>\n<p class=\"report-user\">Signed in as {} ({})</p>",
        report.kind.label(),
        escape_html(&ctx.username),
        ctx.role
    );

    body.push_str(&filters(report));
    body.push_str(&export_links(ctx, report));
    body.push_str(&summary_cards(report.kind, &report.summary));
    body.push_str(&json_script("chart-data", &report.chart));
    body.push_str(&table(&report.rows));

    layout(&format!("{} Report", report.kind.label()), &body)
}

fn filters(report: &Report) -> String {
    let mut html = String::from("<form class=\"report-filters\" method=\"get\" action=\"/reports\">\n");
    html.push_str("<select name=\"report_type\">\n");
    for kind in [ReportKind::Sensor, ReportKind::Pest] {
        let selected = if kind == report.kind { " selected" } else { "" };
        let _ = writeln!(
            html,
            "<option value=\"{kind}\"{selected}>{} data</option>",
            kind.label()
        );
    }
    html.push_str("</select>\n");
    let _ = writeln!(
        html,
        "<input type=\"date\" name=\"start_date\" value=\"{}\">\n\
         <input type=\"date\" name=\"end_date\" value=\"{}\">\n\
         <button type=\"submit\">Generate</button>\n</form>",
        report.range.start, report.range.end
    );
    html
}

fn export_links(ctx: &RequestContext, report: &Report) -> String {
    let mut html = String::from("<div class=\"report-export\">\n");
    for format in [ExportFormat::Csv, ExportFormat::Pdf] {
        if !ctx.role.can_export(format) {
            continue;
        }
        let label = match format {
            ExportFormat::Csv => "Export CSV",
            ExportFormat::Pdf => "Export PDF",
        };
        let _ = writeln!(
            html,
            "<a class=\"export-{format}\" href=\"{}\">{label}</a>",
            escape_html(&report_href(report.kind, &report.range, Some(format)))
        );
    }
    html.push_str("</div>\n");
    html
}

fn summary_cards(kind: ReportKind, summary: &ReportSummary) -> String {
    let cards: Vec<(&str, String)> = match kind {
        ReportKind::Sensor => vec![
            ("Total Sensors", summary.total_sensors.to_string()),
            ("Total Readings", summary.total_readings.to_string()),
            ("Active Days", summary.active_days.to_string()),
            ("Date Range", format!("{} days", summary.span_days)),
        ],
        ReportKind::Pest => vec![
            ("Total Alerts", summary.total_alerts.to_string()),
            ("Critical", summary.critical_alerts.to_string()),
            ("High", summary.high_alerts.to_string()),
            ("Resolved", summary.resolved_alerts.to_string()),
            ("New", summary.new_alerts.to_string()),
            ("Pest Types", summary.unique_pests.to_string()),
            (
                "Avg Confidence",
                summary
                    .avg_confidence
                    .map_or_else(|| "-".to_string(), |c| format!("{c:.1}%")),
            ),
            ("Date Range", format!("{} days", summary.span_days)),
        ],
    };

    let mut html = String::from("<div class=\"summary-cards\">\n");
    for (label, value) in cards {
        let _ = writeln!(
            html,
            "<div class=\"card\"><span class=\"card-label\">{label}</span> <span class=\"card-value\">{}</span></div>",
            escape_html(&value)
        );
    }
    html.push_str("</div>\n");
    html
}

fn table(rows: &ReportRows) -> String {
    if rows.is_empty() {
        return "<p class=\"no-data\">No data found for the selected date range.</p>\n".to_string();
    }

    let mut html = String::from("<table class=\"report-table\">\n<thead><tr>");
    match rows {
        ReportRows::Sensor(rows) => {
            for h in ["Date", "Sensor", "Type", "Location", "Average", "Min", "Max", "Readings"] {
                let _ = write!(html, "<th>{h}</th>");
            }
            html.push_str("</tr></thead>\n<tbody>\n");
            for r in rows {
                let unit = escape_html(r.unit.as_deref().unwrap_or(""));
                let sensor_type = r
                    .sensor_kind()
                    .map_or_else(|| escape_html(&r.sensor_type), |t| t.label().to_string());
                let _ = writeln!(
                    html,
                    "<tr><td>{}</td><td>{}</td><td>{sensor_type}</td><td>{}</td>\
                     <td>{:.2}{unit}</td><td>{:.2}{unit}</td><td>{:.2}{unit}</td><td>{}</td></tr>",
                    r.day,
                    escape_html(&r.sensor_name),
                    or_dash(r.location.as_deref()),
                    r.avg_value,
                    r.min_value,
                    r.max_value,
                    r.reading_count
                );
            }
        }
        ReportRows::Pest(rows) => {
            for h in ["Detected", "Pest", "Location", "Severity", "Status", "Confidence", "Description"] {
                let _ = write!(html, "<th>{h}</th>");
            }
            html.push_str("</tr></thead>\n<tbody>\n");
            for r in rows {
                let _ = writeln!(
                    html,
                    "<tr class=\"severity-{sev}\"><td>{}</td><td>{} <small>({} in range)</small></td><td>{}</td>\
                     <td>{sev}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                    r.detected_at.format("%Y-%m-%d %H:%M"),
                    escape_html(&r.pest_type),
                    r.type_count,
                    or_dash(r.location.as_deref()),
                    escape_html(&r.status),
                    r.confidence_score
                        .map_or_else(|| "-".to_string(), |c| format!("{c:.1}%")),
                    or_dash(r.description.as_deref()),
                    sev = escape_html(&r.severity),
                );
            }
        }
    }
    html.push_str("</tbody>\n</table>\n");
    html
}
