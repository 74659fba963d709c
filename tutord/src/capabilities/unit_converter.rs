use std::fmt;

use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Value};

use super::{format_number, format_significant, pattern};
use crate::capability::{string_param, Capability, CapabilityDescriptor, CapabilityError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dimension {
    Length,
    Mass,
    Time,
    Energy,
    Power,
    Temperature,
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Dimension::Length => "length",
            Dimension::Mass => "mass",
            Dimension::Time => "time",
            Dimension::Energy => "energy",
            Dimension::Power => "power",
            Dimension::Temperature => "temperature",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scale {
    Celsius,
    Fahrenheit,
    Kelvin,
}

impl Scale {
    fn label(&self) -> &'static str {
        match self {
            Scale::Celsius => "Celsius",
            Scale::Fahrenheit => "Fahrenheit",
            Scale::Kelvin => "Kelvin",
        }
    }

    fn to_celsius(self, value: f64) -> f64 {
        match self {
            Scale::Celsius => value,
            Scale::Fahrenheit => (value - 32.0) * 5.0 / 9.0,
            Scale::Kelvin => value - 273.15,
        }
    }

    fn from_celsius(self, celsius: f64) -> f64 {
        match self {
            Scale::Celsius => celsius,
            Scale::Fahrenheit => celsius * 9.0 / 5.0 + 32.0,
            Scale::Kelvin => celsius + 273.15,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Unit {
    /// Multiplier to the SI base unit of the dimension
    Linear(Dimension, f64),
    Temperature(Scale),
}

impl Unit {
    fn dimension(&self) -> Dimension {
        match self {
            Unit::Linear(dimension, _) => *dimension,
            Unit::Temperature(_) => Dimension::Temperature,
        }
    }
}

const UNITS: &[(&str, Unit)] = &[
    ("meter", Unit::Linear(Dimension::Length, 1.0)),
    ("metre", Unit::Linear(Dimension::Length, 1.0)),
    ("m", Unit::Linear(Dimension::Length, 1.0)),
    ("kilometer", Unit::Linear(Dimension::Length, 1000.0)),
    ("km", Unit::Linear(Dimension::Length, 1000.0)),
    ("centimeter", Unit::Linear(Dimension::Length, 0.01)),
    ("cm", Unit::Linear(Dimension::Length, 0.01)),
    ("millimeter", Unit::Linear(Dimension::Length, 0.001)),
    ("mm", Unit::Linear(Dimension::Length, 0.001)),
    ("inch", Unit::Linear(Dimension::Length, 0.0254)),
    ("in", Unit::Linear(Dimension::Length, 0.0254)),
    ("foot", Unit::Linear(Dimension::Length, 0.3048)),
    ("ft", Unit::Linear(Dimension::Length, 0.3048)),
    ("yard", Unit::Linear(Dimension::Length, 0.9144)),
    ("yd", Unit::Linear(Dimension::Length, 0.9144)),
    ("mile", Unit::Linear(Dimension::Length, 1609.344)),
    ("kilogram", Unit::Linear(Dimension::Mass, 1.0)),
    ("kg", Unit::Linear(Dimension::Mass, 1.0)),
    ("gram", Unit::Linear(Dimension::Mass, 0.001)),
    ("g", Unit::Linear(Dimension::Mass, 0.001)),
    ("pound", Unit::Linear(Dimension::Mass, 0.453592)),
    ("lb", Unit::Linear(Dimension::Mass, 0.453592)),
    ("ounce", Unit::Linear(Dimension::Mass, 0.0283495)),
    ("oz", Unit::Linear(Dimension::Mass, 0.0283495)),
    ("ton", Unit::Linear(Dimension::Mass, 1000.0)),
    ("second", Unit::Linear(Dimension::Time, 1.0)),
    ("s", Unit::Linear(Dimension::Time, 1.0)),
    ("minute", Unit::Linear(Dimension::Time, 60.0)),
    ("min", Unit::Linear(Dimension::Time, 60.0)),
    ("hour", Unit::Linear(Dimension::Time, 3600.0)),
    ("hr", Unit::Linear(Dimension::Time, 3600.0)),
    ("h", Unit::Linear(Dimension::Time, 3600.0)),
    ("day", Unit::Linear(Dimension::Time, 86400.0)),
    ("year", Unit::Linear(Dimension::Time, 31_557_600.0)),
    ("joule", Unit::Linear(Dimension::Energy, 1.0)),
    ("j", Unit::Linear(Dimension::Energy, 1.0)),
    ("kilojoule", Unit::Linear(Dimension::Energy, 1000.0)),
    ("kj", Unit::Linear(Dimension::Energy, 1000.0)),
    ("calorie", Unit::Linear(Dimension::Energy, 4.184)),
    ("cal", Unit::Linear(Dimension::Energy, 4.184)),
    ("kilocalorie", Unit::Linear(Dimension::Energy, 4184.0)),
    ("kcal", Unit::Linear(Dimension::Energy, 4184.0)),
    ("watt_hour", Unit::Linear(Dimension::Energy, 3600.0)),
    ("wh", Unit::Linear(Dimension::Energy, 3600.0)),
    ("kilowatt_hour", Unit::Linear(Dimension::Energy, 3_600_000.0)),
    ("kwh", Unit::Linear(Dimension::Energy, 3_600_000.0)),
    ("watt", Unit::Linear(Dimension::Power, 1.0)),
    ("w", Unit::Linear(Dimension::Power, 1.0)),
    ("kilowatt", Unit::Linear(Dimension::Power, 1000.0)),
    ("kw", Unit::Linear(Dimension::Power, 1000.0)),
    ("horsepower", Unit::Linear(Dimension::Power, 745.7)),
    ("hp", Unit::Linear(Dimension::Power, 745.7)),
    ("celsius", Unit::Temperature(Scale::Celsius)),
    ("c", Unit::Temperature(Scale::Celsius)),
    ("fahrenheit", Unit::Temperature(Scale::Fahrenheit)),
    ("f", Unit::Temperature(Scale::Fahrenheit)),
    ("kelvin", Unit::Temperature(Scale::Kelvin)),
    ("k", Unit::Temperature(Scale::Kelvin)),
];

/// Irregular plurals; regular ones lose their trailing `s`/`es`
const PLURALS: &[(&str, &str)] = &[("feet", "foot"), ("inches", "inch")];

fn lookup(name: &str) -> Option<Unit> {
    let find = |n: &str| UNITS.iter().find(|(unit, _)| *unit == n).map(|(_, u)| *u);
    if let Some(unit) = find(name) {
        return Some(unit);
    }
    if let Some((_, singular)) = PLURALS.iter().find(|(plural, _)| *plural == name) {
        return find(singular);
    }
    name.strip_suffix('s')
        .filter(|stem| stem.len() > 2)
        .and_then(find)
}

/// Converts between units of length, mass, time, energy, power and temperature
#[derive(Debug)]
pub struct UnitConverter {
    requests: Vec<Regex>,
}

impl Default for UnitConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl UnitConverter {
    pub const NAME: &'static str = "unit_converter";

    pub fn new() -> Self {
        Self {
            requests: [
                r"convert\s+(-?\d*\.?\d+)\s*(\w+)\s+(?:to|into|in)\s+(\w+)",
                r"(-?\d*\.?\d+)\s*(\w+)\s+(?:to|into|in)\s+(\w+)",
                r"(-?\d*\.?\d+)\s*(\w+)\s*=\s*\?\s*(\w+)",
            ]
            .iter()
            .filter_map(|p| pattern(p))
            .collect(),
        }
    }

    fn convert(&self, value: f64, from: &str, to: &str) -> Result<String, CapabilityError> {
        let unknown = |name: &str| CapabilityError::execution(Self::NAME, format!("Unknown unit: {}", name));
        let from_unit = lookup(from).ok_or_else(|| unknown(from))?;
        let to_unit = lookup(to).ok_or_else(|| unknown(to))?;

        match (from_unit, to_unit) {
            (Unit::Temperature(source), Unit::Temperature(target)) => {
                let result = target.from_celsius(source.to_celsius(value));
                Ok(format!(
                    "{}°{} = {:.2}°{}",
                    format_number(value),
                    source.label(),
                    result,
                    target.label()
                ))
            }
            (Unit::Linear(source_dim, source), Unit::Linear(target_dim, target))
                if source_dim == target_dim =>
            {
                let result = value * source / target;
                Ok(format!(
                    "{} {} = {} {}",
                    format_number(value),
                    from,
                    format_significant(result, 6),
                    to
                ))
            }
            _ => Err(CapabilityError::execution(
                Self::NAME,
                format!(
                    "Cannot convert {} ({}) to {} ({})",
                    from,
                    from_unit.dimension(),
                    to,
                    to_unit.dimension()
                ),
            )),
        }
    }
}

#[async_trait]
impl Capability for UnitConverter {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn describe(&self) -> CapabilityDescriptor {
        CapabilityDescriptor {
            name: Self::NAME.to_string(),
            description: "Converts between different units of measurement".to_string(),
            schema: json!({
                "query": {
                    "type": "string",
                    "description": "Conversion request (e.g., 'convert 5 meters to feet', '100 celsius to fahrenheit')"
                }
            }),
        }
    }

    async fn execute(&self, params: &Value) -> Result<String, CapabilityError> {
        let query = string_param(Self::NAME, params, "query")?.to_lowercase();

        for request in &self.requests {
            if let Some(caps) = request.captures(&query) {
                let value: f64 = caps[1].parse().map_err(|_| {
                    CapabilityError::invalid(Self::NAME, format!("'{}' is not a number", &caps[1]))
                })?;
                return self.convert(value, &caps[2], &caps[3]);
            }
        }

        Err(CapabilityError::invalid(
            Self::NAME,
            "Could not parse conversion request. Use format: 'convert 5 meters to feet'",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn convert(query: &str) -> Result<String, CapabilityError> {
        UnitConverter::new().execute(&json!({ "query": query })).await
    }

    #[tokio::test]
    async fn test_length_with_plurals() {
        assert_eq!(
            convert("convert 5 meters to feet").await.unwrap(),
            "5 meters = 16.4042 feet"
        );
        assert_eq!(convert("2 km in miles").await.unwrap(), "2 km = 1.24274 miles");
    }

    #[tokio::test]
    async fn test_other_dimensions() {
        assert_eq!(convert("90 minutes to hours").await.unwrap(), "90 minutes = 1.5 hours");
        assert_eq!(convert("1 kwh = ? joules").await.unwrap(), "1 kwh = 3.6e+06 joules");
        assert_eq!(convert("2 lb to kg").await.unwrap(), "2 lb = 0.907184 kg");
    }

    #[tokio::test]
    async fn test_temperature() {
        assert_eq!(
            convert("100 celsius to fahrenheit").await.unwrap(),
            "100°Celsius = 212.00°Fahrenheit"
        );
        assert_eq!(
            convert("convert -40 f to c").await.unwrap(),
            "-40°Fahrenheit = -40.00°Celsius"
        );
        assert_eq!(convert("0 k to celsius").await.unwrap(), "0°Kelvin = -273.15°Celsius");
    }

    #[tokio::test]
    async fn test_rejections() {
        assert!(matches!(
            convert("5 meters to kilograms").await,
            Err(CapabilityError::Execution { .. })
        ));
        assert!(matches!(
            convert("5 parsecs to meters").await,
            Err(CapabilityError::Execution { .. })
        ));
        assert!(matches!(
            convert("how far is the moon").await,
            Err(CapabilityError::InvalidParameters { .. })
        ));
    }
}
