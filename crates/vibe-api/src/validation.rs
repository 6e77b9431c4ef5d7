//! Request validation. Pure functions returning `ApiError::Validation`.

use crate::error::{ApiError, ApiResult};

pub const PHONE_MIN_LEN: usize = 10;
pub const PHONE_MAX_LEN: usize = 14;
pub const PASSWORD_MIN_LEN: usize = 8;
pub const ABOUT_MAX_LEN: usize = 200;
pub const COMMENT_MAX_LEN: usize = 200;
pub const NAME_MAX_LEN: usize = 100;
const USERNAME_MAX_LEN: usize = 150;

/// 10 to 14 characters, all digits apart from an optional leading `+`.
pub fn phone_number(value: &str) -> ApiResult<()> {
    let digits = value.strip_prefix('+').unwrap_or(value);
    let valid = !digits.is_empty()
        && digits.bytes().all(|b| b.is_ascii_digit())
        && (PHONE_MIN_LEN..=PHONE_MAX_LEN).contains(&value.len());

    if valid {
        Ok(())
    } else {
        Err(ApiError::validation(format!("{} is not a valid phone number", value)))
    }
}

/// Exactly four ASCII digits.
pub fn activation_code(value: &str) -> ApiResult<()> {
    if value.len() == vibe_db::activation::CODE_LENGTH && vibe_db::activation::is_numeric_code(value) {
        Ok(())
    } else {
        Err(ApiError::validation("otp must contain 4 digits"))
    }
}

pub fn names(first_name: &str, last_name: &str) -> ApiResult<()> {
    if first_name.trim().is_empty() && last_name.trim().is_empty() {
        return Err(ApiError::validation("At least first name or last name is required."));
    }
    if first_name.len() > USERNAME_MAX_LEN || last_name.len() > USERNAME_MAX_LEN {
        return Err(ApiError::validation("Name is too long"));
    }
    Ok(())
}

pub fn username(value: &str) -> ApiResult<()> {
    let valid = !value.is_empty()
        && value.len() <= USERNAME_MAX_LEN
        && value
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'));
    if valid {
        Ok(())
    } else {
        Err(ApiError::validation(
            "Username may contain only letters, digits and @/./+/-/_",
        ))
    }
}

pub fn password(value: &str) -> ApiResult<()> {
    if value.chars().count() < PASSWORD_MIN_LEN {
        return Err(ApiError::validation(format!(
            "Password must be at least {} characters",
            PASSWORD_MIN_LEN
        )));
    }
    Ok(())
}

pub fn email(value: &str) -> ApiResult<()> {
    let valid = match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    };
    if valid && !value.contains(char::is_whitespace) {
        Ok(())
    } else {
        Err(ApiError::validation("Enter a valid email address."))
    }
}

/// Non-empty after trimming and at most `max` characters.
pub fn bounded_text(field: &str, value: &str, max: usize) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(ApiError::validation(format!("{} may not be blank", field)));
    }
    if value.chars().count() > max {
        return Err(ApiError::validation(format!(
            "{} may be at most {} characters",
            field, max
        )));
    }
    Ok(())
}

pub fn about(value: &str) -> ApiResult<()> {
    if value.chars().count() > ABOUT_MAX_LEN {
        return Err(ApiError::validation(format!(
            "about may be at most {} characters",
            ABOUT_MAX_LEN
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_numbers() {
        assert!(phone_number("0551234567").is_ok());
        assert!(phone_number("+233551234567").is_ok());
        assert!(phone_number("23355123456789").is_ok());

        assert!(phone_number("055123456").is_err());
        assert!(phone_number("233551234567890").is_err());
        assert!(phone_number("055123456a").is_err());

        // Length counts characters, so a leading `+` uses one of the 14.
        assert!(phone_number("+123456789").is_ok());
        assert!(phone_number("+1234567890123").is_ok());
        assert!(phone_number("+12345678901234").is_err());
        assert!(phone_number("+").is_err());
        assert!(phone_number("05512-34567").is_err());
        assert!(phone_number("").is_err());
    }

    #[test]
    fn activation_codes() {
        assert!(activation_code("0042").is_ok());
        assert!(activation_code("042").is_err());
        assert!(activation_code("00421").is_err());
        assert!(activation_code("12a4").is_err());
    }

    #[test]
    fn at_least_one_name() {
        assert!(names("Ama", "").is_ok());
        assert!(names("", "Mensah").is_ok());
        assert!(names(" ", "").is_err());
    }

    #[test]
    fn emails() {
        assert!(email("ama@example.com").is_ok());
        assert!(email("ama@example").is_err());
        assert!(email("@example.com").is_err());
        assert!(email("ama @example.com").is_err());
    }

    #[test]
    fn bounded() {
        assert!(bounded_text("comment", "hi", 200).is_ok());
        assert!(bounded_text("comment", "   ", 200).is_err());
        assert!(bounded_text("comment", &"x".repeat(201), 200).is_err());
    }
}
