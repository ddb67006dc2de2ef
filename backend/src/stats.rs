//! Summary statistics over a flight data CSV.
//!
//! The CSV carries one sample per row with at least the `temperatura`,
//! `presion`, `altura` and `timestamp` columns. Other columns are ignored.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];
const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("failed to read CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("row {row}: unrecognized timestamp {value:?}")]
    Timestamp { row: usize, value: String },
    #[error("the file has no samples")]
    Empty,
}

/// Converts the sensor's relative altitude to meters above sea level.
#[derive(Clone, Copy, Debug)]
pub struct AltitudeOffset {
    pub city_altitude_msnm: f64,
    pub sensor_zero_altitude: f64,
}

impl AltitudeOffset {
    fn above_sea_level(&self, altura: f64) -> f64 {
        altura - self.sensor_zero_altitude + self.city_altitude_msnm
    }
}

#[derive(Deserialize)]
struct Sample {
    temperatura: f64,
    presion: f64,
    altura: f64,
    timestamp: String,
}

/// Count, mean, sample standard deviation, min, quartiles and max.
#[derive(Serialize, Debug, PartialEq)]
pub struct Describe {
    pub count: usize,
    pub mean: f64,
    /// Absent with fewer than two samples.
    pub std: Option<f64>,
    pub min: f64,
    #[serde(rename = "25%")]
    pub p25: f64,
    #[serde(rename = "50%")]
    pub p50: f64,
    #[serde(rename = "75%")]
    pub p75: f64,
    pub max: f64,
}

impl Describe {
    /// `values` must not be empty.
    fn of(mut values: Vec<f64>) -> Self {
        values.sort_by(f64::total_cmp);
        let count = values.len();
        let mean = values.iter().sum::<f64>() / count as f64;
        let std = (count > 1).then(|| {
            let squares = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>();
            (squares / (count - 1) as f64).sqrt()
        });
        Self {
            count,
            mean,
            std,
            min: values[0],
            p25: quantile(&values, 0.25),
            p50: quantile(&values, 0.5),
            p75: quantile(&values, 0.75),
            max: values[count - 1],
        }
    }
}

/// Linear interpolation between the closest ranks of sorted `values`.
fn quantile(values: &[f64], q: f64) -> f64 {
    let position = q * (values.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    values[lower] + (values[upper] - values[lower]) * (position - lower as f64)
}

#[derive(Serialize, Debug)]
pub struct TimeRange {
    pub start: String,
    pub end: String,
}

#[derive(Serialize, Debug)]
pub struct BasicStats {
    pub total_records: usize,
    pub time_range: TimeRange,
    pub duration_seconds: f64,
    pub duration_minutes: f64,
    pub temperature_stats: Describe,
    pub pressure_stats: Describe,
    pub altitude_stats: Describe,
    pub altitude_msnm_stats: Describe,
}

fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
}

pub fn basic_stats(csv: &[u8], offset: AltitudeOffset) -> Result<BasicStats, StatsError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(csv);

    let mut timestamps = Vec::new();
    let mut temperatures = Vec::new();
    let mut pressures = Vec::new();
    let mut altitudes = Vec::new();
    for (index, sample) in reader.deserialize::<Sample>().enumerate() {
        let sample = sample?;
        let timestamp =
            parse_timestamp(&sample.timestamp).ok_or_else(|| StatsError::Timestamp {
                // the header is line 1
                row: index + 2,
                value: sample.timestamp.clone(),
            })?;
        timestamps.push(timestamp);
        temperatures.push(sample.temperatura);
        pressures.push(sample.presion);
        altitudes.push(sample.altura);
    }

    let (Some(start), Some(end)) = (timestamps.iter().min(), timestamps.iter().max()) else {
        return Err(StatsError::Empty);
    };
    let duration_seconds = (*end - *start).num_milliseconds() as f64 / 1000.0;
    let altitudes_msnm = altitudes
        .iter()
        .map(|altura| offset.above_sea_level(*altura))
        .collect();

    Ok(BasicStats {
        total_records: timestamps.len(),
        time_range: TimeRange {
            start: start.format(DISPLAY_FORMAT).to_string(),
            end: end.format(DISPLAY_FORMAT).to_string(),
        },
        duration_seconds,
        duration_minutes: duration_seconds / 60.0,
        temperature_stats: Describe::of(temperatures),
        pressure_stats: Describe::of(pressures),
        altitude_stats: Describe::of(altitudes),
        altitude_msnm_stats: Describe::of(altitudes_msnm),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const OFFSET: AltitudeOffset = AltitudeOffset {
        city_altitude_msnm: 1737.0,
        sensor_zero_altitude: 163.0,
    };

    const FLIGHT: &str = "\
id,temperatura,presion,altura,timestamp
1,22.0,81.43,163.0,2025-11-26 14:30:00.050
2,21.0,81.40,173.0,2025-11-26 14:30:00.100
3,20.0,81.38,183.0,2025-11-26 14:30:00.150
4,19.0,81.35,193.0,2025-11-26 14:30:00.000
";

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn summarizes_a_flight() {
        let stats = basic_stats(FLIGHT.as_bytes(), OFFSET).unwrap();

        assert_eq!(stats.total_records, 4);
        assert_eq!(stats.time_range.start, "2025-11-26 14:30:00.000");
        assert_eq!(stats.time_range.end, "2025-11-26 14:30:00.150");
        assert!(close(stats.duration_seconds, 0.15));
        assert!(close(stats.duration_minutes, 0.0025));

        let temperature = &stats.temperature_stats;
        assert_eq!(temperature.count, 4);
        assert!(close(temperature.mean, 20.5));
        assert!(close(temperature.std.unwrap(), (5.0f64 / 3.0).sqrt()));
        assert!(close(temperature.min, 19.0));
        assert!(close(temperature.p25, 19.75));
        assert!(close(temperature.p50, 20.5));
        assert!(close(temperature.p75, 21.25));
        assert!(close(temperature.max, 22.0));
    }

    #[test]
    fn altitude_is_shifted_to_sea_level() {
        let stats = basic_stats(FLIGHT.as_bytes(), OFFSET).unwrap();
        assert!(close(stats.altitude_stats.mean, 178.0));
        assert!(close(stats.altitude_msnm_stats.mean, 1752.0));
        assert!(close(stats.altitude_msnm_stats.min, 1737.0));
    }

    #[test]
    fn single_sample_has_no_std() {
        let csv = "temperatura,presion,altura,timestamp\n22,81.4,163,2025-11-26T14:30:00\n";
        let stats = basic_stats(csv.as_bytes(), OFFSET).unwrap();
        assert_eq!(stats.pressure_stats.std, None);
        assert!(close(stats.pressure_stats.p75, 81.4));
        assert!(close(stats.duration_seconds, 0.0));

        let value = serde_json::to_value(&stats.pressure_stats).unwrap();
        assert!(value["std"].is_null());
        assert!(value.get("50%").is_some());
    }

    #[test]
    fn header_only_is_empty() {
        let csv = "temperatura,presion,altura,timestamp\n";
        assert!(matches!(
            basic_stats(csv.as_bytes(), OFFSET),
            Err(StatsError::Empty)
        ));
    }

    #[test]
    fn bad_timestamp_names_its_row() {
        let csv = "temperatura,presion,altura,timestamp\n22,81.4,163,yesterday\n";
        let error = basic_stats(csv.as_bytes(), OFFSET).unwrap_err();
        assert_eq!(
            error.to_string(),
            r#"row 2: unrecognized timestamp "yesterday""#
        );
    }

    #[test]
    fn missing_column_is_a_csv_error() {
        let csv = "temperatura,altura,timestamp\n22,163,2025-11-26 14:30:00\n";
        assert!(matches!(
            basic_stats(csv.as_bytes(), OFFSET),
            Err(StatsError::Csv(_))
        ));
    }
}
