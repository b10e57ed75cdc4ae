//! Exports intended for internal use only.
//!
//! These need to be exported for access from the main CLI and the `devtools`
//! binaries, but they are not intended for use by external code. This
//! module's API may change without semantic versioning!

pub mod report {
    use std::fmt::Write;

    use crate::ConversionInfo;
    use crate::sport::SportCodes;

    /// Formats a human-readable summary of a conversion.
    pub fn conversion_report(info: &ConversionInfo) -> Result<String, std::fmt::Error> {
        let mut r = String::new();
        match &info.name {
            Some(name) => writeln!(&mut r, "Converted activity \"{name}\"")?,
            None => writeln!(&mut r, "Converted unnamed activity")?,
        }
        writeln!(
            &mut r,
            "Sport: {} ({})",
            info.sport.sport, info.sport.sub_sport
        )?;
        writeln!(
            &mut r,
            "Distance: {:.2} km",
            info.total_distance.0 / 1000.0
        )?;
        writeln!(&mut r, "Elapsed time: {}", format_duration(info.elapsed.0))?;
        writeln!(
            &mut r,
            "Wrote {} records in {} laps ({} bytes)",
            info.num_records, info.num_laps, info.num_bytes
        )?;
        let skipped = info.num_points.saturating_sub(info.num_records);
        if skipped > 0 {
            writeln!(&mut r, "Skipped {skipped} trackpoints without a time")?;
        }
        Ok(r)
    }

    /// Formats the table of recognized activity labels.
    pub fn sports_report(labels: &[(&str, SportCodes)]) -> Result<String, std::fmt::Error> {
        let width = labels.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
        let mut r = String::new();
        for (label, codes) in labels {
            let (sport, sub_sport) = codes.codes();
            writeln!(
                &mut r,
                "{label:<width$}  {sport:>2} {sub_sport:>2}  {} / {}",
                codes.sport, codes.sub_sport
            )?;
        }
        Ok(r)
    }

    fn format_duration(millis: i64) -> String {
        let seconds = millis / 1000;
        format!(
            "{}:{:02}:{:02}",
            seconds / 3600,
            (seconds / 60) % 60,
            seconds % 60
        )
    }

}
