//! CNPJ handling: digit cleaning and check-digit validation.

const FIRST_WEIGHTS: [u32; 12] = [5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];
const SECOND_WEIGHTS: [u32; 13] = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];

/// Keep only ASCII digits.
pub fn clean_identifier(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

fn check_digit(digits: &[u32], weights: &[u32]) -> u32 {
    let sum: u32 = digits.iter().zip(weights).map(|(d, w)| d * w).sum();
    match sum % 11 {
        r if r < 2 => 0,
        r => 11 - r,
    }
}

/// Validate a 14-digit identifier. Non-digits are stripped first; repeated
/// single-digit strings are rejected even though their check digits add up.
pub fn is_valid_identifier(raw: &str) -> bool {
    let digits: Vec<u32> = raw.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() != 14 {
        return false;
    }
    if digits.iter().all(|d| *d == digits[0]) {
        return false;
    }

    let first = check_digit(&digits[..12], &FIRST_WEIGHTS);
    let mut base: Vec<u32> = digits[..12].to_vec();
    base.push(first);
    let second = check_digit(&base, &SECOND_WEIGHTS);

    digits[12] == first && digits[13] == second
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_valid_identifier() {
        assert!(is_valid_identifier("11222333000181"));
    }

    #[test]
    fn test_formatted_identifier_is_cleaned() {
        assert!(is_valid_identifier("11.222.333/0001-81"));
        assert_eq!(clean_identifier("11.222.333/0001-81"), "11222333000181");
    }

    #[test]
    fn test_flipped_check_digits_fail() {
        assert!(!is_valid_identifier("11222333000182"));
        assert!(!is_valid_identifier("11222333000191"));
    }

    #[test]
    fn test_repeated_digits_fail() {
        for d in 0..10 {
            let s = d.to_string().repeat(14);
            assert!(!is_valid_identifier(&s), "{} should be rejected", s);
        }
    }

    #[test]
    fn test_wrong_length_fails() {
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("1122233300018"));
        assert!(!is_valid_identifier("112223330001810"));
        assert!(!is_valid_identifier("abc"));
    }

    #[test]
    fn test_other_known_identifiers() {
        assert!(is_valid_identifier("00000000000191"));
        // both check digits go through the remainder < 2 branch
        assert!(is_valid_identifier("33.000.167/0001-01"));
    }

    #[test]
    fn test_clean_identifier_non_ascii_digits_dropped() {
        assert_eq!(clean_identifier(" 12a3٤"), "123");
    }
}
