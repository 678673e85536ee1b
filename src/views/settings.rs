use std::fmt::Write;

use super::{escape_html, flash_banner, layout};
use crate::context::RequestContext;
use crate::domain::SensorType;
use crate::evaluation::{optimal_range_text, ThresholdSet};

#[must_use]
pub fn settings_page(
    ctx: &RequestContext,
    thresholds: &ThresholdSet,
    logging_interval_minutes: f64,
    flash: Option<&str>,
) -> String {
    let editable = ctx.role.can_manage_settings();
    let disabled = if editable { "" } else { " disabled" };

    let mut body = String::new();
    body.push_str(&flash_banner(flash));
    body.push_str("<h1>Settings</h1>\n");
    if !editable {
        let _ = writeln!(
            body,
            "<p class=\"read-only\">Your role ({}) can view but not change these settings.</p>",
            ctx.role
        );
    }

    body.push_str("<section class=\"thresholds\">\n<h2>Threshold bands</h2>\n");
    for sensor_type in SensorType::ALL {
        let band = thresholds.get(sensor_type);
        let _ = writeln!(
            body,
            "<form method=\"post\" action=\"/settings/thresholds\">\
             <input type=\"hidden\" name=\"sensor_type\" value=\"{sensor_type}\">\
             <label>{} ({})</label>\
             <input type=\"number\" step=\"any\" name=\"min\" value=\"{}\"{disabled}>\
             <input type=\"number\" step=\"any\" name=\"max\" value=\"{}\"{disabled}>\
             <small>Classification range: {}</small>\
             <button type=\"submit\"{disabled}>Save</button></form>",
            sensor_type.label(),
            escape_html(sensor_type.default_unit()),
            band.min(),
            band.max(),
            escape_html(&optimal_range_text(sensor_type, &band)),
        );
    }
    body.push_str("</section>\n");

    let _ = writeln!(
        body,
        "<section class=\"logging-interval\">\n<h2>Sensor logging interval</h2>\n\
         <form method=\"post\" action=\"/settings/logging-interval\">\
         <input type=\"number\" step=\"0.1\" min=\"0.1\" max=\"1440\" name=\"minutes\" value=\"{logging_interval_minutes}\"{disabled}> minutes\
         <button type=\"submit\"{disabled}>Save</button></form>\n</section>"
    );

    layout("Settings", &body)
}
