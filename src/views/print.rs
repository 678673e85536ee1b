use std::fmt::Write;

use super::{escape_html, or_dash};
use crate::export::ExportDocument;
use crate::domain::ReportKind;
use crate::reports::{analysis, ReportRows};

/// Rows shown in the print table. The CSV export carries the rest.
pub const PRINT_TABLE_ROWS: usize = 50;

const DESCRIPTION_PREVIEW_CHARS: usize = 60;

/// Self-contained document meant to be printed or saved as PDF from the browser.
#[must_use]
pub fn print_document(doc: &ExportDocument) -> String {
    let report = &doc.report;
    let title = format!("{} Report", report.kind.label());

    let mut html = String::new();
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n\
         <style>@media print {{ .no-print {{ display: none !important; }} }} \
         table {{ border-collapse: collapse; width: 100%; }} th, td {{ border: 1px solid #ccc; padding: 4px; }}</style>\n\
         </head>\n<body>\n",
        escape_html(&title)
    );
    html.push_str(
        "<div class=\"no-print\"><button onclick=\"window.print()\">Print / Save as PDF</button></div>\n",
    );
    let _ = writeln!(
        html,
        "<h1>IoT Farm Monitoring System</h1>\n<h2>{}</h2>\n<p>{} - {}</p>",
        escape_html(&title),
        report.range.start.format("%b %-d, %Y"),
        report.range.end.format("%b %-d, %Y")
    );

    html.push_str("<h3>Summary</h3>\n<dl class=\"summary\">\n");
    for (label, value) in summary_stats(doc) {
        let _ = writeln!(html, "<dt>{label}</dt><dd>{}</dd>", escape_html(&value));
    }
    html.push_str("</dl>\n");

    html.push_str("<h3>Data Records</h3>\n");
    if doc.truncated {
        let _ = writeln!(
            html,
            "<p class=\"note\">Export limited to the first {} records.</p>",
            doc.row_cap
        );
    }
    if report.rows.len() > PRINT_TABLE_ROWS {
        let _ = writeln!(
            html,
            "<p class=\"note\">Showing first {PRINT_TABLE_ROWS} records of {} total records. \
             For complete data, please use the CSV export option.</p>",
            report.rows.len()
        );
    }
    html.push_str(&records_table(&report.rows));

    let _ = writeln!(
        html,
        "<h3>Analysis</h3>\n<p class=\"analysis\">{}</p>",
        escape_html(&analysis(report))
    );
    let _ = writeln!(
        html,
        "<footer><p>Generated {} by {}.</p></footer>\n</body>\n</html>",
        doc.generated_at.format("%b %-d, %Y at %H:%M UTC"),
        escape_html(&doc.generated_by)
    );
    html
}

fn summary_stats(doc: &ExportDocument) -> Vec<(&'static str, String)> {
    let report = &doc.report;
    let summary = &report.summary;
    let mut stats = vec![
        ("Report Type", report.kind.label().to_string()),
        ("Total Records", report.rows.len().to_string()),
        ("Days Covered", summary.span_days.to_string()),
    ];

    match report.kind {
        ReportKind::Sensor => {
            let avg_per_row = if report.rows.is_empty() {
                0.0
            } else {
                summary.total_readings as f64 / report.rows.len() as f64
            };
            stats.extend([
                ("Unique Sensors", summary.total_sensors.to_string()),
                ("Total Readings", summary.total_readings.to_string()),
                ("Avg Readings/Day", format!("{avg_per_row:.1}")),
            ]);
        }
        ReportKind::Pest => {
            let active = summary.total_alerts - summary.resolved_alerts;
            stats.extend([
                ("Critical Alerts", summary.critical_alerts.to_string()),
                ("High Severity", summary.high_alerts.to_string()),
                ("Resolved", summary.resolved_alerts.to_string()),
                ("Active", active.to_string()),
            ]);
        }
    }
    stats
}

fn records_table(rows: &ReportRows) -> String {
    if rows.is_empty() {
        return "<p class=\"note\">No data available for the selected date range.</p>\n".to_string();
    }

    let mut html = String::from("<table class=\"data-table\">\n");
    match rows {
        ReportRows::Sensor(rows) => {
            html.push_str(
                "<thead><tr><th>Date</th><th>Sensor</th><th>Type</th><th>Location</th>\
                 <th>Avg</th><th>Range</th><th>Count</th></tr></thead>\n<tbody>\n",
            );
            for r in rows.iter().take(PRINT_TABLE_ROWS) {
                let unit = escape_html(r.unit.as_deref().unwrap_or(""));
                let sensor_type = r
                    .sensor_kind()
                    .map_or_else(|| escape_html(&r.sensor_type), |t| t.label().to_string());
                let _ = writeln!(
                    html,
                    "<tr><td>{}</td><td>{}</td><td>{sensor_type}</td><td>{}</td>\
                     <td><strong>{:.1}{unit}</strong></td><td>{:.1} - {:.1}{unit}</td><td>{}</td></tr>",
                    r.day.format("%b %-d"),
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
            html.push_str(
                "<thead><tr><th>Date</th><th>Pest</th><th>Location</th><th>Severity</th>\
                 <th>Status</th><th>Description</th></tr></thead>\n<tbody>\n",
            );
            for r in rows.iter().take(PRINT_TABLE_ROWS) {
                let description = r.description.as_deref().unwrap_or("");
                let mut preview: String = description.chars().take(DESCRIPTION_PREVIEW_CHARS).collect();
                if description.chars().count() > DESCRIPTION_PREVIEW_CHARS {
                    preview.push_str("...");
                }
                let _ = writeln!(
                    html,
                    "<tr><td>{}</td><td>{}</td><td>{}</td><td class=\"severity-{sev}\">{sev}</td>\
                     <td>{}</td><td>{}</td></tr>",
                    r.day().format("%b %-d"),
                    escape_html(&r.pest_type),
                    or_dash(r.location.as_deref()),
                    escape_html(&r.status),
                    escape_html(&preview),
                    sev = escape_html(&r.severity),
                );
            }
        }
    }
    html.push_str("</tbody>\n</table>\n");
    html
}
