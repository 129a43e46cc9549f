// SPDX-License-Identifier: MIT

use std::io::Write;

use super::{Chart, ChartRow, ChartType, Metric};

/// Failure while exporting chart data or the chart image.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("No data to export.")]
    NoData,
    #[error("Failed to write the export: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to encode CSV: {0}")]
    Csv(#[from] csv::Error),
}

/// Writes the chart rows as CSV, one column per metric.
///
/// Missing values become empty cells.
pub fn export_csv<W: Write>(rows: &[ChartRow], writer: W) -> Result<(), ExportError> {
    if rows.is_empty() {
        return Err(ExportError::NoData);
    }

    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(std::iter::once("timestamp").chain(Metric::ALL.map(Metric::label)))?;

    for row in rows {
        let values = Metric::ALL.map(|metric| row.value(metric).map(|value| value.to_string()).unwrap_or_default());
        csv_writer.write_record(std::iter::once(row.label.as_str()).chain(values.iter().map(String::as_str)))?;
    }

    csv_writer.flush()?;
    Ok(())
}

/// Writes the chart as a standalone SVG image.
pub fn export_svg<W: Write>(chart: &Chart, width: u32, height: u32, mut writer: W) -> Result<(), ExportError> {
    if chart.is_empty() {
        return Err(ExportError::NoData);
    }

    let size = Chart::VIEWBOX;
    writeln!(
        writer,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {size} {size}" preserveAspectRatio="none">"#
    )?;
    writeln!(writer, r#"  <rect width="{size}" height="{size}" fill="white"/>"#)?;

    for series in &chart.series {
        let color = format!("#{:06x}", series.metric.color());
        for bar in &series.bars {
            writeln!(
                writer,
                r#"  <rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="{color}"/>"#,
                bar.x, bar.y, bar.width, bar.height
            )?;
        }
        if !series.commands.is_empty() {
            let fill = match chart.chart_type {
                ChartType::Area => format!(r#"fill="{color}" fill-opacity="0.4""#),
                _ => r#"fill="none""#.to_string(),
            };
            writeln!(
                writer,
                r#"  <path d="{}" {fill} stroke="{color}" stroke-width="2" vector-effect="non-scaling-stroke"><title>{}</title></path>"#,
                series.commands,
                series.metric.label()
            )?;
        }
    }

    writeln!(writer, "</svg>")?;
    Ok(())
}
