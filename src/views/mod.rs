//! Server-rendered HTML. Every function here is pure: plain data in, markup out.
//!
//! Styling and navigation chrome live outside this service; pages only carry
//! the structure and data hooks the front end needs.

pub mod print;
pub mod reports;
pub mod sensors;
pub mod settings;

use std::fmt::Write;

pub use print::print_document;
pub use reports::report_page;
pub use sensors::sensors_page;
pub use settings::settings_page;

/// Escape text for HTML element content and quoted attribute values.
#[must_use]
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
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

/// Serialize data for an inline `<script type="application/json">` block.
#[must_use]
pub fn json_script(id: &str, value: &impl serde::Serialize) -> String {
    let json = serde_json::to_string(value).unwrap_or_else(|_| "null".to_string());
    format!(
        r#"<script type="application/json" id="{}">{}</script>"#,
        escape_html(id),
        json.replace("</", "<\\/")
    )
}

fn layout(title: &str, body: &str) -> String {
    let mut html = String::new();
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{} - IoT Farm Monitoring</title>\n</head>\n<body>\n{body}\n</body>\n</html>\n",
        escape_html(title)
    );
    html
}

fn flash_banner(flash: Option<&str>) -> String {
    flash.map_or_else(String::new, |msg| {
        format!(
            "<div class=\"flash flash-error\" role=\"alert\">{}</div>\n",
            escape_html(msg)
        )
    })
}

fn or_dash(value: Option<&str>) -> String {
    value.map_or_else(|| "-".to_string(), escape_html)
}
