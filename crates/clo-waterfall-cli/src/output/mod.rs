pub mod csv_out;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// Pretty-printed, with amounts at full precision.
fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("JSON serialization error: {e}"),
    }
}

/// Decimal amounts are serialized as full-precision strings; show them
/// to the cent in human-facing formats. Other strings pass through.
pub(crate) fn display_amount(s: &str) -> String {
    match Decimal::from_str(s) {
        Ok(d) if d.scale() > 2 => d.round_dp(2).normalize().to_string(),
        _ => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_amount_rounds_to_cents() {
        assert_eq!(display_amount("17500.123456"), "17500.12");
        assert_eq!(display_amount("42.5"), "42.5");
        assert_eq!(display_amount("fee/must_pay"), "fee/must_pay");
    }
}
