//! Attack resolution engine.
//!
//! An attack is resolved in two steps. [`check_attack`] decides whether the
//! attacker may hit the chosen target at all and says why not. Only then
//! does [`AttackResolver::resolve`] roll, consult protections, mutate the
//! units, and log what happened in presentation order.

mod legality;
mod resolution;

pub use legality::{can_attack, check_attack, AttackProcessorContext};
pub use resolution::{template_for, AttackResolver};
