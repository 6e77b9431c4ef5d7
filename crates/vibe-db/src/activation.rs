//! Activation code rule applied whenever an account row is written.

use rand::Rng;

use crate::models::AccountRow;

/// Number of digits in an activation code or verification token.
pub const CODE_LENGTH: usize = 4;

/// True for a non-empty string made only of ASCII digits.
pub fn is_numeric_code(code: &str) -> bool {
    !code.is_empty() && code.bytes().all(|b| b.is_ascii_digit())
}

/// An inactive account without a usable numeric code gets a fresh one.
pub fn needs_new_code(is_active: bool, code: &str) -> bool {
    !is_active && !is_numeric_code(code)
}

/// Four digits drawn independently and uniformly from 0-9.
pub fn generate_code<R: Rng>(rng: &mut R) -> String {
    (0..CODE_LENGTH)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect()
}

/// Regenerates the activation code when the account needs one.
/// Returns whether the code changed.
pub fn apply_save_rule(account: &mut AccountRow) -> bool {
    if needs_new_code(account.is_active, &account.activation_otp) {
        account.activation_otp = generate_code(&mut rand::rng());
        true
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(is_active: bool, otp: &str) -> AccountRow {
        AccountRow {
            id: "a".into(),
            username: "0551234567".into(),
            phone_number: "0551234567".into(),
            email: None,
            first_name: "Ama".into(),
            last_name: String::new(),
            password: "hash".into(),
            is_active,
            is_staff: false,
            is_superuser: false,
            activation_otp: otp.into(),
            token: String::new(),
            token_reason: String::new(),
            last_login: None,
            date_joined: "2024-01-01 00:00:00".into(),
        }
    }

    #[test]
    fn generated_codes_are_four_digits() {
        let mut rng = rand::rng();
        for _ in 0..200 {
            let code = generate_code(&mut rng);
            assert_eq!(code.len(), CODE_LENGTH);
            assert!(is_numeric_code(&code));
        }
    }

    #[test]
    fn inactive_account_without_code_gets_one() {
        let mut acc = account(false, "");
        assert!(apply_save_rule(&mut acc));
        assert!(is_numeric_code(&acc.activation_otp));
    }

    #[test]
    fn non_numeric_code_is_replaced() {
        let mut acc = account(false, "12a4");
        assert!(apply_save_rule(&mut acc));
        assert_ne!(acc.activation_otp, "12a4");
        assert!(is_numeric_code(&acc.activation_otp));
    }

    #[test]
    fn numeric_code_survives() {
        let mut acc = account(false, "0042");
        assert!(!apply_save_rule(&mut acc));
        assert_eq!(acc.activation_otp, "0042");
    }

    #[test]
    fn active_account_is_left_alone() {
        let mut acc = account(true, "");
        assert!(!apply_save_rule(&mut acc));
        assert_eq!(acc.activation_otp, "");
    }
}
