/// Password strength requirements.
const MIN_LENGTH: usize = 8;
const MAX_LENGTH: usize = 128;

/// Check whether a password meets the strength policy.
///
/// Passwords must be 8 to 128 characters long and contain at least three of
/// the four character classes: uppercase, lowercase, digit, symbol.
pub fn is_password_strong(password: &str) -> bool {
    let length = password.chars().count();
    if length < MIN_LENGTH || length > MAX_LENGTH {
        return false;
    }

    let has_upper = password.chars().any(|c| c.is_uppercase());
    let has_lower = password.chars().any(|c| c.is_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_symbol = password
        .chars()
        .any(|c| !c.is_alphanumeric() && !c.is_whitespace());

    let classes = [has_upper, has_lower, has_digit, has_symbol]
        .iter()
        .filter(|present| **present)
        .count();

    classes >= 3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_too_short() {
        assert!(!is_password_strong("short1!"));
    }

    #[test]
    fn test_too_long() {
        let long = "Aa1!".repeat(40);
        assert!(long.len() > 128);
        assert!(!is_password_strong(&long));
    }

    #[test]
    fn test_three_of_four_classes() {
        // upper + lower + digit
        assert!(is_password_strong("Abcdefg1"));
        // lower + digit + symbol
        assert!(is_password_strong("abcdef1!"));
        // upper + lower + symbol
        assert!(is_password_strong("Abcdefg!"));
    }

    #[test]
    fn test_two_classes_rejected() {
        assert!(!is_password_strong("abcdefg1"));
        assert!(!is_password_strong("abcdefgh"));
        assert!(!is_password_strong("ABCDEFG1"));
    }

    #[test]
    fn test_empty_rejected() {
        assert!(!is_password_strong(""));
    }
}
