//! Status condition helpers.

use crate::crd::Condition;

/// Add or replace a condition of the same type.
///
/// The transition time of an existing condition is kept when neither its
/// status nor its reason changed, so repeated passes do not churn it.
pub fn set_condition(conditions: &mut Vec<Condition>, mut condition: Condition) {
    match conditions
        .iter_mut()
        .find(|c| c.r#type == condition.r#type)
    {
        Some(existing) => {
            if existing.status == condition.status && existing.reason == condition.reason {
                condition.last_transition_time = std::mem::take(&mut existing.last_transition_time);
            }
            *existing = condition;
        }
        None => conditions.push(condition),
    }
}
