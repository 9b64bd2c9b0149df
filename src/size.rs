//! Human-readable byte sizes.

const KB: u64 = 1024;
const MB: u64 = KB * 1024;
const GB: u64 = MB * 1024;
const TB: u64 = GB * 1024;

pub fn format_size(bytes: u64) -> String {
    if bytes >= TB {
        format!("{:.1} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Parse sizes like "500", "10K", "1.5MB" or "2 gb" into bytes (powers of 1024).
pub fn parse_size(input: &str) -> Result<u64, String> {
    let trimmed = input.trim();
    let split = trimmed
        .find(|c: char| c.is_ascii_alphabetic())
        .unwrap_or(trimmed.len());
    let (num_str, unit) = trimmed.split_at(split);

    let value: f64 = num_str
        .trim()
        .parse()
        .map_err(|_| format!("invalid size: {input:?}"))?;
    if !value.is_finite() || value < 0.0 {
        return Err(format!("invalid size: {input:?}"));
    }

    let multiplier = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "b" => 1,
        "k" | "kb" => KB,
        "m" | "mb" => MB,
        "g" | "gb" => GB,
        "t" | "tb" => TB,
        other => return Err(format!("unknown size unit {other:?} (use B, K, M, G or T)")),
    };

    Ok((value * multiplier as f64).round() as u64)
}
