//! Weight unit conversion.
//!
//! Weights are stored in kilograms. Pound input is converted on the way in
//! (3 decimals) and kilograms are converted back for display (2 decimals),
//! both with the same factor.

use crate::error::{AppError, Result};
use crate::models::Unit;

pub const KG_TO_LB: f64 = 2.20462;

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

pub fn to_kg(lb: f64) -> f64 {
    round_to(lb / KG_TO_LB, 3)
}

pub fn to_lb(kg: f64) -> f64 {
    round_to(kg * KG_TO_LB, 2)
}

pub fn input_to_kg(value: f64, unit: Unit) -> f64 {
    match unit {
        Unit::Kg => value,
        Unit::Lb => to_kg(value),
    }
}

pub fn format_weight(weight_kg: f64, unit: Unit) -> String {
    match unit {
        Unit::Kg => format!("{:.2} kg", weight_kg),
        Unit::Lb => format!("{:.2} lb", to_lb(weight_kg)),
    }
}

/// Parses a user-typed weight. Accepts a decimal comma; must be positive.
pub fn parse_weight(input: &str) -> Result<f64> {
    let text = input.trim().replace(',', ".");
    if text.is_empty() {
        return Err(AppError::Validation("Weight is required".to_string()));
    }

    match text.parse::<f64>() {
        Ok(w) if w.is_finite() && w > 0.0 => Ok(w),
        _ => Err(AppError::Validation(format!("Invalid weight: {}", input.trim()))),
    }
}
