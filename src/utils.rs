use chrono::NaiveDate;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

use crate::services::rows::parse_timestamp_text;

// `0+123.45` station notation: kilometres + metres
static STATION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\+(\d+(?:\.\d+)?)").expect("station pattern is valid"));
static NUMBER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[+-]?\d+(?:\.\d+)?").expect("number pattern is valid"));

const DIRECTION_MARKERS: &[char] = &['发', '进', '出'];

/// Installation chainage split into its comparable parts.
#[derive(Debug, Clone, PartialEq)]
pub struct Chainage {
    pub raw: String,
    pub normalized: String,
    pub value: Option<f64>,
    pub direction: Option<String>,
}

pub fn normalize_chainage(raw: &str) -> Chainage {
    let normalized: String = raw.chars().filter(|c| !c.is_whitespace()).collect();

    let value = match STATION_REGEX.captures(&normalized) {
        Some(caps) => {
            let km = caps[1].parse::<f64>().ok();
            let m = caps[2].parse::<f64>().ok();
            km.zip(m).map(|(km, m)| km * 1000.0 + m)
        }
        None => NUMBER_REGEX
            .find(&normalized)
            .and_then(|m| m.as_str().parse::<f64>().ok()),
    };

    let direction = normalized
        .chars()
        .next()
        .filter(|c| DIRECTION_MARKERS.contains(c))
        .map(String::from);

    Chainage {
        raw: raw.to_string(),
        normalized,
        value,
        direction,
    }
}

/// Lenient float parse for metadata values such as elevations.
pub fn to_float(value: Option<&str>) -> Option<f64> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|f| f.is_finite())
}

pub fn parse_date(value: Option<&str>) -> Option<NaiveDate> {
    value.and_then(parse_timestamp_text).map(|dt| dt.date())
}

/// `path` relative to `root` when it lives underneath it, otherwise unchanged.
pub fn relative_to(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chainage_with_direction_and_station_notation() {
        let c = normalize_chainage("出0+123.45");
        assert_eq!(c.direction.as_deref(), Some("出"));
        assert_eq!(c.value, Some(123.45));
        assert_eq!(c.normalized, "出0+123.45");
    }

    #[test]
    fn chainage_whitespace_is_removed_and_km_scaled() {
        let c = normalize_chainage("进 1 + 020");
        assert_eq!(c.normalized, "进1+020");
        assert_eq!(c.value, Some(1020.0));
        assert_eq!(c.raw, "进 1 + 020");
    }

    #[test]
    fn chainage_without_station_uses_first_number() {
        let c = normalize_chainage("K12.5");
        assert_eq!(c.value, Some(12.5));
        assert_eq!(c.direction, None);
    }

    #[test]
    fn chainage_without_digits_keeps_raw_text() {
        let c = normalize_chainage("洞口附近");
        assert_eq!(c.value, None);
        assert_eq!(c.normalized, "洞口附近");
    }

    #[test]
    fn metadata_number_and_date_helpers() {
        assert_eq!(to_float(Some(" 1520.5 ")), Some(1520.5));
        assert_eq!(to_float(Some("约1520")), None);
        assert_eq!(to_float(None), None);
        assert_eq!(parse_date(Some("2020-05-01")), NaiveDate::from_ymd_opt(2020, 5, 1));
        assert_eq!(parse_date(Some("未知")), None);
    }

    #[test]
    fn relative_paths_under_root() {
        let root = Path::new("/data/root");
        assert_eq!(relative_to(Path::new("/data/root/a/Pf-1.xlsx"), root), "a/Pf-1.xlsx");
        assert_eq!(relative_to(Path::new("/elsewhere/Pf-1.xlsx"), root), "/elsewhere/Pf-1.xlsx");
    }
}
