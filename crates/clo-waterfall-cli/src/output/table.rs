use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::display_amount;

/// Columns of the per-period breakdown, as paths into each period object.
const PERIOD_COLUMNS: [(&str, &[&str]); 9] = [
    ("period", &["period"]),
    ("phase", &["phase"]),
    ("rate", &["rate"]),
    ("defaults", &["default_amount"]),
    ("prepayment", &["prepayment"]),
    ("balloon", &["balloon"]),
    ("interest", &["interest", "interest_collected"]),
    ("reserves", &["interest", "reserve_sweep"]),
    ("collateral", &["ending_collateral_value"]),
];

/// Format output as a table using the tabled crate.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(result) = map.get("result") {
                print_result_table(result, map);
            } else {
                print_flat_object(map);
            }
        }
        Value::Array(arr) => print_array_table(arr),
        _ => println!("{}", value),
    }
}

fn print_result_table(result: &Value, envelope: &Map<String, Value>) {
    if let Value::Object(res_map) = result {
        print_flat_object(res_map);
        if let Some(Value::Array(periods)) = res_map.get("periods") {
            println!();
            print_periods(periods);
        }
    } else {
        print_flat_object(envelope);
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {}", w);
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

/// Scalar fields as a two-column table; nested arrays are left out.
fn print_flat_object(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in map {
        if val.is_array() {
            continue;
        }
        builder.push_record([key.as_str(), &format_value(val)]);
    }
    println!("{}", Table::from(builder));
}

fn print_periods(periods: &[Value]) {
    let mut builder = Builder::default();
    builder.push_record(PERIOD_COLUMNS.iter().map(|(name, _)| name.to_string()));
    for period in periods {
        let row: Vec<String> = PERIOD_COLUMNS
            .iter()
            .map(|(_, path)| {
                path.iter()
                    .try_fold(period, |v, key| v.get(*key))
                    .map(format_value)
                    .unwrap_or_default()
            })
            .collect();
        builder.push_record(row);
    }
    println!("{}", Table::from(builder));
}

fn print_array_table(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<String> = first.keys().cloned().collect();
        let mut builder = Builder::default();
        builder.push_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(h.as_str()).map(format_value).unwrap_or_default())
                    .collect();
                builder.push_record(row);
            }
        }

        println!("{}", Table::from(builder));
    } else {
        for item in arr {
            println!("{}", format_value(item));
        }
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => display_amount(s),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "-".to_string(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(format_value).collect();
            items.join(", ")
        }
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
