use ledger::NewEcoAction;

use crate::error::AppError::{self, Validation};

pub fn require_user_id(user_id: &str) -> Result<&str, AppError> {
    let trimmed = user_id.trim();

    if trimmed.is_empty() {
        return Err(Validation("user_id must not be empty".to_string()));
    }

    Ok(trimmed)
}

pub fn validate_action(action: &NewEcoAction) -> Result<(), AppError> {
    require_user_id(&action.user_id)?;

    if action.name.trim().is_empty() {
        return Err(Validation("name must not be empty".to_string()));
    }

    for (field, value) in action.impact_values() {
        if !value.is_finite() || value < 0.0 {
            return Err(Validation(format!(
                "{field} must be a non-negative number, got {value}"
            )));
        }
    }

    Ok(())
}
