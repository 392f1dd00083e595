//! Instrument prefix catalog.
//!
//! Maps a point-code prefix (`Pf-`, `GBcg-`, ...) to the sensor category it
//! denotes and to the ranked column rules used to recognise that category's
//! measurements in free-text spreadsheet headers. The tables are immutable and
//! shared read-only by every import.

/// Canonical measurement keys every recognised column variant maps onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetricKey {
    FreqModulus,
    Temperature,
    TemperatureMeasured,
    TemperatureResistance,
    WaterLevel,
    PorePressure,
    ResistanceRatio,
    ResistanceSum,
    Resistance,
    Strain,
    Stress,
    Displacement,
    DisplacementAbs,
}

/// Default alarm band assigned to a metric when it is first created.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WarnThresholds {
    pub low: Option<f64>,
    pub high: Option<f64>,
}

impl MetricKey {
    pub fn as_str(self) -> &'static str {
        match self {
            MetricKey::FreqModulus => "freq_modulus",
            MetricKey::Temperature => "temperature",
            MetricKey::TemperatureMeasured => "temperature_measured",
            MetricKey::TemperatureResistance => "temperature_resistance",
            MetricKey::WaterLevel => "water_level",
            MetricKey::PorePressure => "pore_pressure",
            MetricKey::ResistanceRatio => "resistance_ratio",
            MetricKey::ResistanceSum => "resistance_sum",
            MetricKey::Resistance => "resistance",
            MetricKey::Strain => "strain",
            MetricKey::Stress => "stress",
            MetricKey::Displacement => "displacement",
            MetricKey::DisplacementAbs => "displacement_abs",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            MetricKey::FreqModulus => "频率模数",
            MetricKey::Temperature => "温度",
            MetricKey::TemperatureMeasured => "实测温度",
            MetricKey::TemperatureResistance => "温度电阻",
            MetricKey::WaterLevel => "水位",
            MetricKey::PorePressure => "渗透压力",
            MetricKey::ResistanceRatio => "电阻比",
            MetricKey::ResistanceSum => "电阻和",
            MetricKey::Resistance => "电阻",
            MetricKey::Strain => "应变",
            MetricKey::Stress => "应力",
            MetricKey::Displacement => "位移",
            MetricKey::DisplacementAbs => "绝对位移",
        }
    }

    /// Thresholds are stored verbatim on the metric; nothing here evaluates them.
    pub fn warn_thresholds(self) -> WarnThresholds {
        match self {
            MetricKey::PorePressure => WarnThresholds {
                low: None,
                high: Some(80.0),
            },
            MetricKey::Stress => WarnThresholds {
                low: Some(-10.0),
                high: Some(200.0),
            },
            MetricKey::WaterLevel => WarnThresholds {
                low: None,
                high: Some(70.0),
            },
            _ => WarnThresholds::default(),
        }
    }
}

/// One ranked column rule: a header containing any keyword binds to `metric`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricRule {
    pub metric: MetricKey,
    pub unit: Option<&'static str>,
    pub keywords: &'static [&'static str],
}

impl MetricRule {
    const fn new(metric: MetricKey, unit: Option<&'static str>, keywords: &'static [&'static str]) -> Self {
        MetricRule { metric, unit, keywords }
    }

    /// `normalized_header` must already be lower-cased (see `columns::normalize_header`).
    pub fn matches(&self, normalized_header: &str) -> bool {
        self.keywords
            .iter()
            .any(|k| normalized_header.contains(k.to_lowercase().as_str()))
    }
}

use MetricKey as M;

const FREQ: MetricRule = MetricRule::new(M::FreqModulus, Some("KHz^2"), &["频率模数", "kHz"]);
const TEMP: MetricRule = MetricRule::new(M::Temperature, Some("℃"), &["温度"]);
const RES_RATIO: MetricRule = MetricRule::new(M::ResistanceRatio, None, &["电阻比"]);
const RES_SUM: MetricRule = MetricRule::new(M::ResistanceSum, None, &["电阻和"]);
const TEMP_RES: MetricRule = MetricRule::new(M::TemperatureResistance, None, &["温度电阻"]);
const STRAIN: MetricRule = MetricRule::new(M::Strain, Some("10^-6"), &["应变", "应变量"]);
const STRESS: MetricRule = MetricRule::new(M::Stress, Some("MPa"), &["应力"]);
// "绝对位移" also contains "位移", so the absolute variant must rank first.
const DISP_ABS: MetricRule = MetricRule::new(M::DisplacementAbs, Some("mm"), &["绝对位移"]);
const DISP: MetricRule = MetricRule::new(M::Displacement, Some("mm"), &["位移"]);

const WATER_LEVEL_RULES: &[MetricRule] = &[FREQ, TEMP, MetricRule::new(M::WaterLevel, Some("m"), &["水位"])];
const PORE_PRESSURE_RULES: &[MetricRule] = &[
    FREQ,
    TEMP,
    MetricRule::new(M::PorePressure, Some("kPa"), &["渗透压力", "压力"]),
];
const STRAIN_PLATE_RULES: &[MetricRule] = &[RES_RATIO, RES_SUM, STRAIN, TEMP];
const REBAR_STRESS_RULES: &[MetricRule] = &[RES_RATIO, RES_SUM, STRESS, TEMP];
const DISPLACEMENT_RULES: &[MetricRule] = &[RES_RATIO, DISP_ABS, DISP];
const JOINT_METER_RULES: &[MetricRule] = &[
    RES_RATIO,
    MetricRule::new(M::Displacement, Some("mm"), &["位移", "缝宽"]),
];
const THERMOMETER_RULES: &[MetricRule] = &[
    MetricRule::new(M::Resistance, Some("Ω"), &["电阻"]),
    MetricRule::new(M::TemperatureMeasured, Some("℃"), &["实测温度"]),
    MetricRule::new(M::Temperature, Some("℃"), &["测点温度", "温度"]),
];
const STRESS_FREE_RULES: &[MetricRule] = &[RES_RATIO, TEMP_RES, STRAIN, TEMP];
const ANCHOR_STRESS_RULES: &[MetricRule] = &[RES_RATIO, TEMP_RES, STRESS, TEMP];

/// Closed set of instrument categories known to the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorCategory {
    WaterLevel,
    PorePressure,
    StrainPlate,
    RebarStress,
    Displacement4pt,
    Displacement2pt,
    JointMeter,
    Temperature,
    StressFree,
    AnchorStress,
}

impl SensorCategory {
    pub fn code(self) -> &'static str {
        match self {
            SensorCategory::WaterLevel => "water_level",
            SensorCategory::PorePressure => "pore_pressure",
            SensorCategory::StrainPlate => "strain_plate",
            SensorCategory::RebarStress => "rebar_stress",
            SensorCategory::Displacement4pt => "displacement_4pt",
            SensorCategory::Displacement2pt => "displacement_2pt",
            SensorCategory::JointMeter => "joint_meter",
            SensorCategory::Temperature => "temperature",
            SensorCategory::StressFree => "stress_free",
            SensorCategory::AnchorStress => "anchor_stress",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            SensorCategory::WaterLevel => "电测水位计",
            SensorCategory::PorePressure => "渗压计",
            SensorCategory::StrainPlate => "钢板计",
            SensorCategory::RebarStress => "钢筋应力计",
            SensorCategory::Displacement4pt => "四点式变位计",
            SensorCategory::Displacement2pt => "二点式变位计",
            SensorCategory::JointMeter => "测缝计",
            SensorCategory::Temperature => "温度计",
            SensorCategory::StressFree => "无应力计",
            SensorCategory::AnchorStress => "锚杆应力计",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            SensorCategory::WaterLevel => "m",
            SensorCategory::PorePressure => "kPa",
            SensorCategory::StrainPlate | SensorCategory::StressFree => "10^-6",
            SensorCategory::RebarStress | SensorCategory::AnchorStress => "MPa",
            SensorCategory::Displacement4pt | SensorCategory::Displacement2pt | SensorCategory::JointMeter => "mm",
            SensorCategory::Temperature => "℃",
        }
    }

    pub fn rules(self) -> &'static [MetricRule] {
        match self {
            SensorCategory::WaterLevel => WATER_LEVEL_RULES,
            SensorCategory::PorePressure => PORE_PRESSURE_RULES,
            SensorCategory::StrainPlate => STRAIN_PLATE_RULES,
            SensorCategory::RebarStress => REBAR_STRESS_RULES,
            SensorCategory::Displacement4pt | SensorCategory::Displacement2pt => DISPLACEMENT_RULES,
            SensorCategory::JointMeter => JOINT_METER_RULES,
            SensorCategory::Temperature => THERMOMETER_RULES,
            SensorCategory::StressFree => STRESS_FREE_RULES,
            SensorCategory::AnchorStress => ANCHOR_STRESS_RULES,
        }
    }
}

const PREFIXES: &[(&str, SensorCategory)] = &[
    ("Df-", SensorCategory::WaterLevel),
    ("Pcg-", SensorCategory::PorePressure),
    ("Pf-", SensorCategory::PorePressure),
    ("GBcg-", SensorCategory::StrainPlate),
    ("GBf-", SensorCategory::StrainPlate),
    ("Rcg-", SensorCategory::RebarStress),
    ("Rf-", SensorCategory::RebarStress),
    ("M4f-", SensorCategory::Displacement4pt),
    ("M2f-", SensorCategory::Displacement2pt),
    ("Jf-", SensorCategory::JointMeter),
    ("Tf-", SensorCategory::Temperature),
    ("Nf-", SensorCategory::StressFree),
    ("ASf-", SensorCategory::AnchorStress),
];

/// Sensor type resolved for a prefix; unknown prefixes get an identity fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorTypeDef {
    pub code: String,
    pub name: String,
    pub unit: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PrefixCatalog {
    // longest prefix first so `GBcg-` wins over any shorter overlap
    entries: Vec<(&'static str, SensorCategory)>,
}

impl Default for PrefixCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PrefixCatalog {
    pub fn builtin() -> Self {
        let mut entries = PREFIXES.to_vec();
        entries.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        PrefixCatalog { entries }
    }

    pub fn category(&self, prefix: &str) -> Option<SensorCategory> {
        self.entries.iter().find(|(p, _)| *p == prefix).map(|(_, c)| *c)
    }

    /// Longest known prefix that starts either the point code or the file name;
    /// otherwise the point code up to and including its first `-` (or all of it).
    pub fn detect_prefix(&self, point_code: &str, file_name: &str) -> String {
        if let Some((prefix, _)) = self
            .entries
            .iter()
            .find(|(p, _)| point_code.starts_with(p) || file_name.starts_with(p))
        {
            return (*prefix).to_string();
        }
        match point_code.find('-') {
            Some(idx) => point_code[..=idx].to_string(),
            None => point_code.to_string(),
        }
    }

    pub fn sensor_type(&self, prefix: &str) -> SensorTypeDef {
        match self.category(prefix) {
            Some(c) => SensorTypeDef {
                code: c.code().to_string(),
                name: c.display_name().to_string(),
                unit: Some(c.unit().to_string()),
            },
            None => SensorTypeDef {
                code: prefix.to_string(),
                name: prefix.to_string(),
                unit: None,
            },
        }
    }

    /// Ranked rules to test a header against; empty for unknown prefixes.
    pub fn metric_rules(&self, prefix: &str) -> &'static [MetricRule] {
        self.category(prefix).map(SensorCategory::rules).unwrap_or(&[])
    }
}
