use axum::body::Body;
use std::io::{self, Write};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use super::{ExportDocument, ExportError};
use crate::reports::{data_quality, risk_level, ReportRows};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Bytes buffered before a chunk is handed to the response stream.
const CHUNK_SIZE: usize = 16 * 1024;

pub const SENSOR_HEADERS: [&str; 10] = [
    "Date",
    "Sensor Name",
    "Sensor Type",
    "Location",
    "Average Value",
    "Minimum Value",
    "Maximum Value",
    "Unit",
    "Reading Count",
    "Data Quality",
];

pub const PEST_HEADERS: [&str; 9] = [
    "Date",
    "Pest Type",
    "Location",
    "Severity",
    "Status",
    "Confidence",
    "Description",
    "Detection Time",
    "Risk Level",
];

/// Write the export as CSV: BOM, `#` metadata lines, header, rows, `#` footer.
///
/// # Errors
///
/// Returns `ExportError::Write` if the underlying writer fails.
pub fn write_csv<W: Write>(mut out: W, doc: &ExportDocument) -> Result<W, ExportError> {
    out.write_all(UTF8_BOM).map_err(write_err)?;

    let report = &doc.report;
    let mut meta = vec![
        "# IoT Farm Monitoring System Export".to_string(),
        format!("# Report Type: {}", report.kind.label()),
        format!("# Date Range: {} to {}", report.range.start, report.range.end),
        format!(
            "# Generated: {} by {}",
            doc.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
            doc.generated_by
        ),
        format!("# Total Records: {}", report.rows.len()),
    ];
    if doc.truncated {
        meta.push(format!(
            "# Truncated: only the first {} rows are included",
            doc.row_cap
        ));
    }
    for line in &meta {
        writeln!(out, "{line}").map_err(write_err)?;
    }
    out.write_all(b"\n").map_err(write_err)?;

    // Only the header and data rows go through the CSV encoder
    let mut wtr = ::csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(out);

    match &report.rows {
        ReportRows::Sensor(rows) => {
            wtr.write_record(SENSOR_HEADERS).map_err(write_err)?;
            for row in rows {
                let sensor_type = row
                    .sensor_kind()
                    .map_or_else(|| row.sensor_type.replace('_', " "), |t| t.label().to_string());
                wtr.write_record([
                    row.day.to_string(),
                    row.sensor_name.clone(),
                    sensor_type,
                    row.location.clone().unwrap_or_default(),
                    format!("{:.2}", row.avg_value),
                    format!("{:.2}", row.min_value),
                    format!("{:.2}", row.max_value),
                    row.unit.clone().unwrap_or_default(),
                    row.reading_count.to_string(),
                    data_quality(row.reading_count).to_string(),
                ])
                .map_err(write_err)?;
            }
        }
        ReportRows::Pest(rows) => {
            wtr.write_record(PEST_HEADERS).map_err(write_err)?;
            for row in rows {
                wtr.write_record([
                    row.day().to_string(),
                    row.pest_type.clone(),
                    row.location.clone().unwrap_or_default(),
                    capitalize(&row.severity),
                    capitalize(&row.status),
                    row.confidence_score
                        .map(|c| format!("{c:.2}"))
                        .unwrap_or_default(),
                    row.description.clone().unwrap_or_default(),
                    row.detected_at.format("%H:%M:%S").to_string(),
                    risk_level(&row.severity, &row.status).to_string(),
                ])
                .map_err(write_err)?;
            }
        }
    }

    let mut out = wtr
        .into_inner()
        .map_err(|e| ExportError::Write(e.error().to_string()))?;
    out.write_all(b"\n# Export completed successfully\n")
        .map_err(write_err)?;
    Ok(out)
}

/// Stream the CSV body while it is being written.
#[must_use]
pub fn stream_csv(doc: ExportDocument) -> Body {
    let (tx, rx) = mpsc::channel::<Result<Vec<u8>, io::Error>>(16);

    tokio::task::spawn_blocking(move || {
        let writer = ChunkWriter {
            tx,
            buf: Vec::with_capacity(CHUNK_SIZE),
        };
        match write_csv(writer, &doc) {
            Ok(mut writer) => {
                if let Err(e) = writer.flush() {
                    tracing::debug!(error = %e, "CSV stream closed early");
                }
            }
            Err(e) => tracing::error!(error = %e, "CSV export stream failed"),
        }
    });

    Body::from_stream(ReceiverStream::new(rx))
}

/// `io::Write` adapter feeding a response body channel in fixed-size chunks.
struct ChunkWriter {
    tx: mpsc::Sender<Result<Vec<u8>, io::Error>>,
    buf: Vec<u8>,
}

impl Write for ChunkWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        if self.buf.len() >= CHUNK_SIZE {
            self.flush()?;
        }
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let chunk = std::mem::replace(&mut self.buf, Vec::with_capacity(CHUNK_SIZE));
        self.tx
            .blocking_send(Ok(chunk))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "client disconnected"))
    }
}

fn write_err(e: impl std::fmt::Display) -> ExportError {
    ExportError::Write(e.to_string())
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
