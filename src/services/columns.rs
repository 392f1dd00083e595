//! Header → canonical metric binding.

use crate::catalog::{MetricKey, MetricRule};
use crate::db::models::data_type;

/// A column bound to a canonical metric. Unbound columns only reach the raw snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnBinding {
    pub column: usize,
    pub header: String,
    pub metric: MetricKey,
    pub unit: Option<&'static str>,
    pub data_type: &'static str,
}

/// Strip whitespace and middle dots, fold full-width parentheses, lower-case.
pub fn normalize_header(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace() && *c != '·')
        .map(|c| match c {
            '（' => '(',
            '）' => ')',
            other => other,
        })
        .collect::<String>()
        .to_lowercase()
}

/// First rule whose keywords hit the header wins; later rules are not consulted.
pub fn match_rule<'a>(rules: &'a [MetricRule], header: &str) -> Option<&'a MetricRule> {
    let normalized = normalize_header(header);
    if normalized.is_empty() {
        return None;
    }
    rules.iter().find(|rule| rule.matches(&normalized))
}

pub fn map_columns(rules: &[MetricRule], headers: &[String]) -> Vec<ColumnBinding> {
    headers
        .iter()
        .enumerate()
        .filter_map(|(column, header)| {
            match_rule(rules, header).map(|rule| ColumnBinding {
                column,
                header: header.clone(),
                metric: rule.metric,
                unit: rule.unit,
                data_type: data_type::NUMBER,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::PrefixCatalog;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn normalization_folds_width_and_case() {
        assert_eq!(normalize_header(" 频率模数 （kHz²） "), "频率模数(khz²)");
        assert_eq!(normalize_header("测点·温度"), "测点温度");
    }

    #[test]
    fn maps_pore_pressure_columns_and_skips_unknown() {
        let catalog = PrefixCatalog::builtin();
        let rules = catalog.metric_rules("Pf-");
        let mapped = map_columns(
            rules,
            &headers(&["序号", "观测日期", "频率模数 (kHz²)", "温度 (℃)", "渗透压力 (kPa)", "备注"]),
        );
        let keys: Vec<(usize, &str)> = mapped.iter().map(|b| (b.column, b.metric.as_str())).collect();
        assert_eq!(
            keys,
            vec![(2, "freq_modulus"), (3, "temperature"), (4, "pore_pressure")]
        );
        assert_eq!(mapped[2].unit, Some("kPa"));
    }

    #[test]
    fn first_matching_rule_wins() {
        let catalog = PrefixCatalog::builtin();
        // "温度电阻" would also satisfy the plain temperature rule further down
        let rule = match_rule(catalog.metric_rules("Nf-"), "温度电阻").expect("matches");
        assert_eq!(rule.metric, MetricKey::TemperatureResistance);

        let rule = match_rule(catalog.metric_rules("M4f-"), "绝对位移(mm)").expect("matches");
        assert_eq!(rule.metric, MetricKey::DisplacementAbs);
        let rule = match_rule(catalog.metric_rules("M4f-"), "位移").expect("matches");
        assert_eq!(rule.metric, MetricKey::Displacement);
    }

    #[test]
    fn unknown_prefix_maps_nothing() {
        let catalog = PrefixCatalog::builtin();
        assert!(map_columns(catalog.metric_rules("Qq-"), &headers(&["温度", "水位"])).is_empty());
    }

    #[test]
    fn blank_header_never_matches() {
        let catalog = PrefixCatalog::builtin();
        assert!(match_rule(catalog.metric_rules("Pf-"), "  ").is_none());
    }
}
