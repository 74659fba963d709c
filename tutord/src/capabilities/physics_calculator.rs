use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Value};

use super::{format_significant, pattern};
use crate::capability::{string_param, Capability, CapabilityDescriptor, CapabilityError};

const STANDARD_GRAVITY: f64 = 9.81;

/// Read the number following `name`, tolerating "mass = 5", "mass: 5", "mass of 5" and "mass is 5"
fn quantity(problem: &str, names: &[&str]) -> Option<f64> {
    names.iter().find_map(|name| {
        let re = pattern(&format!(
            r"(?i)\b{}(?:\s+(?:of|is))?[:=\s]*(-?\d*\.?\d+)",
            regex::escape(name)
        ))?;
        re.captures(problem)?[1].parse().ok()
    })
}

fn show(value: f64) -> String {
    format_significant(value, 6)
}

/// Solves single-formula problems from mechanics, electricity and waves
#[derive(Debug)]
pub struct PhysicsCalculator {
    numbers: Option<Regex>,
}

impl Default for PhysicsCalculator {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsCalculator {
    pub const NAME: &'static str = "physics_calculator";

    pub fn new() -> Self {
        Self {
            numbers: pattern(r"-?\d*\.?\d+"),
        }
    }

    fn force(problem: &str) -> Option<String> {
        let m = quantity(problem, &["mass", "m"])?;
        let a = quantity(problem, &["acceleration", "a"])?;
        Some(format!(
            "Force = mass × acceleration = {} kg × {} m/s² = {} N",
            show(m),
            show(a),
            show(m * a)
        ))
    }

    fn energy(problem: &str, lower: &str) -> Option<String> {
        let m = quantity(problem, &["mass", "m"])?;
        if lower.contains("kinetic") {
            let v = quantity(problem, &["velocity", "speed", "v"])?;
            return Some(format!(
                "Kinetic Energy = ½mv² = ½ × {} kg × ({} m/s)² = {} J",
                show(m),
                show(v),
                show(0.5 * m * v * v)
            ));
        }
        if lower.contains("potential") {
            let h = quantity(problem, &["height", "h"])?;
            return Some(format!(
                "Potential Energy = mgh = {} kg × {} m/s² × {} m = {} J",
                show(m),
                STANDARD_GRAVITY,
                show(h),
                show(m * STANDARD_GRAVITY * h)
            ));
        }
        None
    }

    fn velocity(problem: &str) -> Option<String> {
        let d = quantity(problem, &["distance", "d"])?;
        let t = quantity(problem, &["time", "t"])?;
        if t == 0.0 {
            return None;
        }
        Some(format!(
            "Velocity = distance / time = {} m / {} s = {} m/s",
            show(d),
            show(t),
            show(d / t)
        ))
    }

    fn ohm(problem: &str) -> Option<String> {
        let v = quantity(problem, &["voltage", "v"]);
        let i = quantity(problem, &["current", "i"]);
        let r = quantity(problem, &["resistance", "r"]);
        match (v, i, r) {
            (Some(v), Some(i), _) if i != 0.0 => Some(format!(
                "Resistance = V / I = {} V / {} A = {} Ω\nPower = V × I = {} W",
                show(v),
                show(i),
                show(v / i),
                show(v * i)
            )),
            (Some(v), _, Some(r)) if r != 0.0 => Some(format!(
                "Current = V / R = {} V / {} Ω = {} A",
                show(v),
                show(r),
                show(v / r)
            )),
            (_, Some(i), Some(r)) => Some(format!(
                "Voltage = I × R = {} A × {} Ω = {} V",
                show(i),
                show(r),
                show(i * r)
            )),
            _ => None,
        }
    }

    fn wave(problem: &str) -> Option<String> {
        let f = quantity(problem, &["frequency", "f"])?;
        let lambda = quantity(problem, &["wavelength", "lambda", "λ"])?;
        Some(format!(
            "Wave speed = frequency × wavelength = {} Hz × {} m = {} m/s",
            show(f),
            show(lambda),
            show(f * lambda)
        ))
    }

    fn solve(problem: &str) -> Option<String> {
        let lower = problem.to_lowercase();
        let mentions = |words: &[&str]| words.iter().any(|w| lower.contains(w));

        if mentions(&["force"]) {
            if let Some(answer) = Self::force(problem) {
                return Some(answer);
            }
        }
        // Before velocity: kinetic energy problems also mention a speed
        if mentions(&["energy"]) {
            if let Some(answer) = Self::energy(problem, &lower) {
                return Some(answer);
            }
        }
        if mentions(&["velocity", "speed"]) {
            if let Some(answer) = Self::velocity(problem) {
                return Some(answer);
            }
        }
        if mentions(&["ohm", "voltage", "current", "resistance"]) {
            if let Some(answer) = Self::ohm(problem) {
                return Some(answer);
            }
        }
        if mentions(&["wave", "frequency"]) {
            if let Some(answer) = Self::wave(problem) {
                return Some(answer);
            }
        }
        None
    }
}

#[async_trait]
impl Capability for PhysicsCalculator {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn describe(&self) -> CapabilityDescriptor {
        CapabilityDescriptor {
            name: Self::NAME.to_string(),
            description: "Performs physics calculations using common formulas".to_string(),
            schema: json!({
                "problem": {
                    "type": "string",
                    "description": "Physics problem with named quantities (e.g., 'force with mass 5 and acceleration 2')"
                }
            }),
        }
    }

    async fn execute(&self, params: &Value) -> Result<String, CapabilityError> {
        let problem = string_param(Self::NAME, params, "problem")?;
        if let Some(answer) = Self::solve(problem) {
            return Ok(answer);
        }

        let numbers: Vec<&str> = self
            .numbers
            .as_ref()
            .map(|re| re.find_iter(problem).map(|m| m.as_str()).collect())
            .unwrap_or_default();
        let reason = if numbers.is_empty() {
            "Could not identify a physics formula with enough given values. \
             Name the quantities, e.g. 'force with mass = 5 and acceleration = 2'"
                .to_string()
        } else {
            format!(
                "Found the values {} but could not match them to a formula. \
                 Name the quantities, e.g. 'force with mass = 5 and acceleration = 2'",
                numbers.join(", ")
            )
        };
        Err(CapabilityError::execution(Self::NAME, reason))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn calculate(problem: &str) -> Result<String, CapabilityError> {
        PhysicsCalculator::new()
            .execute(&json!({ "problem": problem }))
            .await
    }

    #[tokio::test]
    async fn test_force() {
        assert_eq!(
            calculate("Calculate the force when mass = 10 and acceleration = 9.8")
                .await
                .unwrap(),
            "Force = mass × acceleration = 10 kg × 9.8 m/s² = 98 N"
        );
        assert!(calculate("force with mass of 2, acceleration is 3")
            .await
            .unwrap()
            .ends_with("= 6 N"));
    }

    #[tokio::test]
    async fn test_energy_before_velocity() {
        let out = calculate("kinetic energy with mass 2 and velocity 3").await.unwrap();
        assert_eq!(
            out,
            "Kinetic Energy = ½mv² = ½ × 2 kg × (3 m/s)² = 9 J"
        );

        let out = calculate("potential energy: mass 1, height 10").await.unwrap();
        assert!(out.ends_with("= 98.1 J"));
    }

    #[tokio::test]
    async fn test_velocity_ohm_and_wave() {
        assert!(calculate("speed for distance 100 and time 20")
            .await
            .unwrap()
            .ends_with("= 5 m/s"));

        let out = calculate("voltage 12 and current 2").await.unwrap();
        assert!(out.contains("= 6 Ω"));
        assert!(out.contains("Power = V × I = 24 W"));
        assert!(calculate("current with voltage 9, resistance 3")
            .await
            .unwrap()
            .contains("Current = V / R = 9 V / 3 Ω = 3 A"));

        assert!(calculate("wave with frequency 50 and wavelength 2")
            .await
            .unwrap()
            .ends_with("= 100 m/s"));
    }

    #[tokio::test]
    async fn test_unsolvable() {
        assert!(matches!(
            calculate("force on a ball").await,
            Err(CapabilityError::Execution { .. })
        ));
        assert!(matches!(
            calculate("what is entropy").await,
            Err(CapabilityError::Execution { .. })
        ));
        let err = calculate("force of 3 and 4").await.unwrap_err();
        assert!(err.user_note().starts_with("Found the values 3, 4"));
    }
}
