use std::io::{self, Write};

use serde::Serialize;

pub struct JsonOutput;

impl JsonOutput {
    pub fn print<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

/// Formats a pace in minutes per km as `M:SS`, "N/A" when undefined.
pub fn format_pace(pace_min_km: Option<f64>) -> String {
    match pace_min_km {
        Some(pace) if pace > 0.0 => {
            let minutes = pace.trunc() as u64;
            let seconds = ((pace - pace.trunc()) * 60.0).round() as u64;
            // Carry 59.6+ seconds into the next minute.
            if seconds >= 60 {
                format!("{}:00", minutes + 1)
            } else {
                format!("{minutes}:{seconds:02}")
            }
        }
        _ => "N/A".to_string(),
    }
}

/// Formats a duration in minutes as `H:MM:SS`.
pub fn format_duration(total_min: f64) -> String {
    if !total_min.is_finite() || total_min <= 0.0 {
        return "0:00:00".to_string();
    }
    let total_seconds = (total_min * 60.0).round() as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{hours}:{minutes:02}:{seconds:02}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pace_formats_minutes_and_seconds() {
        assert_eq!(format_pace(Some(6.0)), "6:00");
        assert_eq!(format_pace(Some(5.5)), "5:30");
        assert_eq!(format_pace(None), "N/A");
        assert_eq!(format_pace(Some(0.0)), "N/A");
    }

    #[test]
    fn duration_formats_hms() {
        assert_eq!(format_duration(90.0), "1:30:00");
        assert_eq!(format_duration(0.5), "0:00:30");
        assert_eq!(format_duration(0.0), "0:00:00");
    }
}
