//! Human-readable durations for CLI output.

const UNITS: [(u64, &str); 4] = [(86_400, "d"), (3_600, "h"), (60, "m"), (1, "s")];

/// Render `secs` with its two most significant units, e.g. `4m 59s`.
pub fn format_duration(secs: u64) -> String {
    let Some(lead) = UNITS.iter().position(|(size, _)| secs >= *size) else {
        return "0s".to_string();
    };
    let (size, unit) = UNITS[lead];
    let mut out = format!("{}{}", secs / size, unit);
    if let Some((next_size, next_unit)) = UNITS.get(lead + 1) {
        let rest = (secs % size) / next_size;
        if rest > 0 {
            out.push_str(&format!(" {}{}", rest, next_unit));
        }
    }
    out
}
