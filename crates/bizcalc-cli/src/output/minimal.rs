use serde_json::Value;

/// Priority list of key output fields, one per calculator.
const PRIORITY_KEYS: [&str; 5] = [
    "monthly_payment",
    "affordable_property_value",
    "npv",
    "roi_percent",
    "total_value",
];

/// Print just the key answer value from the output.
///
/// Heuristic: look for well-known result fields in order of priority (also
/// inside a nested `summary`), then fall back to the first field in the
/// result object.
pub fn print_minimal(value: &Value) {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    if let Value::Object(map) = result_obj {
        let summary = map.get("summary").and_then(Value::as_object);
        for key in &PRIORITY_KEYS {
            let found = map
                .get(*key)
                .or_else(|| summary.and_then(|s| s.get(*key)));
            if let Some(val) = found {
                if !val.is_null() {
                    println!("{}", format_minimal(val));
                    return;
                }
            }
        }

        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, format_minimal(val));
            return;
        }
    }

    println!("{}", format_minimal(result_obj));
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
