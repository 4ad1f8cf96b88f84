//! Human-readable rendering of aggregated reports

use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use invest_stock::{AggregatedReport, Metric, MetricValue};

const MISSING: &str = "-";

fn cell(value: Option<&MetricValue>) -> String {
    value.map_or_else(|| MISSING.to_string(), ToString::to_string)
}

/// One row per metric: merged value followed by each source's mapped value
pub fn report_table(report: &AggregatedReport) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    let mut header = vec!["metric".to_string(), "merged".to_string()];
    header.extend(report.sources.keys().cloned());
    table.set_header(header);

    for metric in Metric::ALL {
        let mut row = vec![
            metric.as_str().to_string(),
            cell(report.fundamentals.get(metric)),
        ];
        row.extend(
            report
                .sources
                .values()
                .map(|result| cell(result.data().and_then(|data| data.mapped.get(metric)))),
        );
        table.add_row(row);
    }

    table
}

/// Source errors, discrepancies and price metrics as plain lines
pub fn report_notes(report: &AggregatedReport) -> Vec<String> {
    let mut lines = Vec::new();

    for (name, result) in &report.sources {
        if let Some(error) = result.error() {
            lines.push(format!("source {name} failed: {error}"));
        }
    }

    for (metric, discrepancy) in &report.discrepancies {
        lines.push(format!(
            "discrepancy {metric}: {}={} {}={} (delta {})",
            discrepancy.source_a,
            discrepancy.value_a,
            discrepancy.source_b,
            discrepancy.value_b,
            discrepancy.abs_delta
        ));
    }

    if let Some(price) = &report.price_metrics {
        let volatility = price
            .annualized_volatility
            .map_or_else(|| MISSING.to_string(), |v| format!("{:.2}%", v * 100.0));
        lines.push(format!(
            "{} return {:.2}%, annualized volatility {volatility}",
            price.period,
            price.total_return * 100.0
        ));
    }

    lines
}
