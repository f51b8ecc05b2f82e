//! Fixed-point helpers for stat modifiers.
//!
//! Stat modifiers in the battle are percentages (level bonuses, damage
//! boosts, armor). They are combined in fixed-point so the same inputs give
//! the same rounding on every platform.

use fixed::types::I32F32;

/// Fixed-point number type for all modifier math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
pub type Fixed = I32F32;

/// Scale `value` by `modifier_percent` percent, rounding down.
///
/// The modifier is the total percentage applied, so `100` keeps the value,
/// `150` adds half, `0` or anything negative yields zero.
#[must_use]
pub fn scale(value: u32, modifier_percent: i32) -> u32 {
    if modifier_percent <= 0 {
        return 0;
    }
    // Multiply first so whole results stay exact.
    let scaled = Fixed::saturating_from_num(value).saturating_mul(Fixed::from_num(modifier_percent))
        / Fixed::from_num(100);
    scaled.floor().saturating_to_num::<u32>()
}

/// Take `reduction_percent` percent off `value`, rounding down.
///
/// Reductions are clamped to `0..=100`.
#[must_use]
pub fn reduce(value: u32, reduction_percent: u32) -> u32 {
    let reduction = reduction_percent.min(100);
    scale(value, 100 - reduction as i32)
}
