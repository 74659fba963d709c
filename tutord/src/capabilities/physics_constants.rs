use async_trait::async_trait;
use serde_json::{json, Value};

use crate::capability::{string_param, Capability, CapabilityDescriptor, CapabilityError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Constant {
    key: &'static str,
    symbol: &'static str,
    value: &'static str,
    unit: &'static str,
    description: &'static str,
    aliases: &'static [&'static str],
}

impl Constant {
    /// "speed_of_light" -> "Speed Of Light"
    fn title(&self) -> String {
        self.key
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn matches(&self, query: &str) -> bool {
        self.key.replace('_', " ").contains(query)
            || self.description.to_lowercase().contains(query)
            || self.symbol.to_lowercase() == query
            || self.aliases.iter().any(|alias| query.contains(alias))
    }
}

const CONSTANTS: &[Constant] = &[
    Constant {
        key: "speed_of_light",
        symbol: "c",
        value: "299792458",
        unit: "m/s",
        description: "Speed of light in vacuum",
        aliases: &["speed of light", "light speed"],
    },
    Constant {
        key: "planck_constant",
        symbol: "h",
        value: "6.62607015e-34",
        unit: "J⋅s",
        description: "Planck constant",
        aliases: &["planck"],
    },
    Constant {
        key: "reduced_planck",
        symbol: "ℏ",
        value: "1.054571817e-34",
        unit: "J⋅s",
        description: "Reduced Planck constant",
        aliases: &["reduced planck", "h-bar", "hbar"],
    },
    Constant {
        key: "gravitational_constant",
        symbol: "G",
        value: "6.67430e-11",
        unit: "m³⋅kg⁻¹⋅s⁻²",
        description: "Gravitational constant",
        aliases: &["gravitational", "gravity"],
    },
    Constant {
        key: "elementary_charge",
        symbol: "e",
        value: "1.602176634e-19",
        unit: "C",
        description: "Elementary charge",
        aliases: &["elementary charge", "electron charge"],
    },
    Constant {
        key: "electron_mass",
        symbol: "mₑ",
        value: "9.1093837015e-31",
        unit: "kg",
        description: "Electron rest mass",
        aliases: &["electron mass", "mass of an electron", "mass of the electron"],
    },
    Constant {
        key: "proton_mass",
        symbol: "mₚ",
        value: "1.67262192369e-27",
        unit: "kg",
        description: "Proton rest mass",
        aliases: &["proton mass", "mass of a proton", "mass of the proton"],
    },
    Constant {
        key: "neutron_mass",
        symbol: "mₙ",
        value: "1.67492749804e-27",
        unit: "kg",
        description: "Neutron rest mass",
        aliases: &["neutron mass", "mass of a neutron", "mass of the neutron"],
    },
    Constant {
        key: "avogadro_number",
        symbol: "Nₐ",
        value: "6.02214076e23",
        unit: "mol⁻¹",
        description: "Avogadro's number",
        aliases: &["avogadro"],
    },
    Constant {
        key: "boltzmann_constant",
        symbol: "k",
        value: "1.380649e-23",
        unit: "J⋅K⁻¹",
        description: "Boltzmann constant",
        aliases: &["boltzmann"],
    },
    Constant {
        key: "gas_constant",
        symbol: "R",
        value: "8.314462618",
        unit: "J⋅mol⁻¹⋅K⁻¹",
        description: "Universal gas constant",
        aliases: &["gas constant", "ideal gas"],
    },
    Constant {
        key: "permittivity_vacuum",
        symbol: "ε₀",
        value: "8.8541878128e-12",
        unit: "F⋅m⁻¹",
        description: "Vacuum permittivity",
        aliases: &["permittivity"],
    },
    Constant {
        key: "permeability_vacuum",
        symbol: "μ₀",
        value: "1.25663706212e-6",
        unit: "H⋅m⁻¹",
        description: "Vacuum permeability",
        aliases: &["permeability"],
    },
    Constant {
        key: "fine_structure",
        symbol: "α",
        value: "7.2973525693e-3",
        unit: "dimensionless",
        description: "Fine-structure constant",
        aliases: &["fine structure", "fine-structure"],
    },
];

/// Looks up fundamental physical constants by name, symbol or common phrasing
#[derive(Debug, Default)]
pub struct PhysicsConstants;

impl PhysicsConstants {
    pub const NAME: &'static str = "physics_constants";

    pub fn new() -> Self {
        Self
    }

    fn find(query: &str) -> Vec<&'static Constant> {
        let query = query.trim().to_lowercase();
        CONSTANTS.iter().filter(|c| c.matches(&query)).collect()
    }
}

#[async_trait]
impl Capability for PhysicsConstants {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn describe(&self) -> CapabilityDescriptor {
        CapabilityDescriptor {
            name: Self::NAME.to_string(),
            description: "Provides values of fundamental physics constants".to_string(),
            schema: json!({
                "query": {
                    "type": "string",
                    "description": "Constant to look up (e.g., 'speed of light', 'planck', 'G')"
                }
            }),
        }
    }

    async fn execute(&self, params: &Value) -> Result<String, CapabilityError> {
        let query = string_param(Self::NAME, params, "query")?;
        let found = Self::find(query);
        if found.is_empty() {
            return Err(CapabilityError::execution(
                Self::NAME,
                format!("No physics constants found matching '{}'", query.trim()),
            ));
        }

        let mut out = String::from("**Physics Constants Found:**\n\n");
        for constant in found {
            out.push_str(&format!(
                "**{}** ({})\nValue: {}\nUnit: {}\nDescription: {}\n\n",
                constant.title(),
                constant.symbol,
                constant.value,
                constant.unit,
                constant.description
            ));
        }
        Ok(out)
    }
}
