//! Subject handlers and the general fallback responder

pub mod general;
pub mod math;
pub mod physics;

pub use general::GeneralTutor;
pub use math::MathHandler;
pub use physics::PhysicsHandler;

use crate::capability::ToolOutcome;

/// Label-prefixed tool result, or the labelled note when the tool failed
fn labelled(outcome: &ToolOutcome, ok_label: &str, err_label: &str) -> String {
    match outcome {
        ToolOutcome::Output(text) => format!("{}{}", ok_label, text),
        ToolOutcome::Note(note) => format!("{}{}", err_label, note),
    }
}
