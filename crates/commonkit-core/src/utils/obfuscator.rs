//! Cutoff-based string masking.
//!
//! Masking works on characters, not bytes, so the masked string always has
//! the same character count as the input.

use crate::error::ValidationError;
use crate::settings::Settings;

/// Masks `cutoff` characters of `value` with `ch`.
///
/// - `cutoff == 0` returns the value unchanged.
/// - A negative cutoff is rejected.
/// - When the value is no longer than `cutoff`, every character is masked.
/// - Otherwise the last `cutoff` characters are masked, or the first ones
///   when `from_end` is `false`.
///
/// # Examples
///
/// ```
/// use commonkit_core::utils::obfuscate;
///
/// assert_eq!(obfuscate("4111111111111111", '*', 4, true).unwrap(), "411111111111****");
/// assert_eq!(obfuscate("4111111111111111", '*', 4, false).unwrap(), "****111111111111");
/// assert_eq!(obfuscate("abc", '#', 10, true).unwrap(), "###");
/// ```
pub fn obfuscate(
    value: &str,
    ch: char,
    cutoff: i64,
    from_end: bool,
) -> Result<String, ValidationError> {
    if cutoff == 0 {
        return Ok(value.to_string());
    }

    let cutoff = usize::try_from(cutoff).map_err(|_| {
        ValidationError::new(
            "must provide a positive cutoff, negative indices are not supported",
            "negative_cutoff",
        )
        .with_param("cutoff", cutoff.to_string())
    })?;

    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= cutoff {
        return Ok(std::iter::repeat(ch).take(chars.len()).collect());
    }

    let mask = std::iter::repeat(ch).take(cutoff);
    let masked = if from_end {
        let keep = chars.len() - cutoff;
        chars[..keep].iter().copied().chain(mask).collect()
    } else {
        mask.chain(chars[cutoff..].iter().copied()).collect()
    };
    Ok(masked)
}

/// Masks the local part of an email address, keeping the domain intact.
///
/// The address must contain exactly one `@`.
///
/// ```
/// use commonkit_core::utils::obfuscate_email;
///
/// let masked = obfuscate_email("johnsmith@example.com", '*', 4, true).unwrap();
/// assert_eq!(masked, "johns****@example.com");
/// ```
pub fn obfuscate_email(
    value: &str,
    ch: char,
    cutoff: i64,
    from_end: bool,
) -> Result<String, ValidationError> {
    let mut parts = value.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(ValidationError::new(
            "email provided is not a valid email",
            "invalid_email",
        ));
    };
    Ok(format!("{}@{domain}", obfuscate(local, ch, cutoff, from_end)?))
}

/// A reusable masking configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Obfuscator {
    /// The replacement character.
    pub ch: char,
    /// How many characters to mask.
    pub cutoff: i64,
    /// Mask the tail (`true`) or the head (`false`).
    pub from_end: bool,
}

impl Default for Obfuscator {
    /// Uses the obfuscation defaults from the current [`Settings`].
    fn default() -> Self {
        let settings = &Settings::current().obfuscation;
        Self {
            ch: settings.char,
            cutoff: settings.cutoff,
            from_end: settings.from_end,
        }
    }
}

impl Obfuscator {
    /// Creates an obfuscator with an explicit configuration.
    pub const fn new(ch: char, cutoff: i64, from_end: bool) -> Self {
        Self { ch, cutoff, from_end }
    }

    /// Masks a plain string.
    pub fn obfuscate(&self, value: &str) -> Result<String, ValidationError> {
        obfuscate(value, self.ch, self.cutoff, self.from_end)
    }

    /// Masks the local part of an email address.
    pub fn email(&self, value: &str) -> Result<String, ValidationError> {
        obfuscate_email(value, self.ch, self.cutoff, self.from_end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_cutoff_is_identity() {
        assert_eq!(obfuscate("secret", '*', 0, true).unwrap(), "secret");
    }

    #[test]
    fn test_negative_cutoff_rejected() {
        let err = obfuscate("secret", '*', -1, true).unwrap_err();
        assert_eq!(err.code, "negative_cutoff");
    }

    #[test]
    fn test_short_value_fully_masked() {
        assert_eq!(obfuscate("abcd", '*', 4, true).unwrap(), "****");
        assert_eq!(obfuscate("ab", '*', 4, false).unwrap(), "**");
        assert_eq!(obfuscate("", '*', 4, false).unwrap(), "");
    }

    #[test]
    fn test_masks_tail() {
        assert_eq!(obfuscate("abcdefgh", '*', 3, true).unwrap(), "abcde***");
    }

    #[test]
    fn test_masks_head() {
        assert_eq!(obfuscate("abcdefgh", 'x', 3, false).unwrap(), "xxxdefgh");
    }

    #[test]
    fn test_length_and_kept_slice_preserved_for_every_cutoff() {
        let value = "päßwörd-1234";
        let len = value.chars().count();
        for cutoff in 0..len {
            let c = i64::try_from(cutoff).unwrap();
            for from_end in [true, false] {
                let masked = obfuscate(value, '*', c, from_end).unwrap();
                assert_eq!(masked.chars().count(), len);
                let kept: String = if from_end {
                    value.chars().take(len - cutoff).collect()
                } else {
                    value.chars().skip(cutoff).collect()
                };
                if from_end {
                    assert!(masked.starts_with(&kept));
                } else {
                    assert!(masked.ends_with(&kept));
                }
            }
        }
    }

    #[test]
    fn test_cutoff_at_or_above_length_masks_everything() {
        for cutoff in 5..9 {
            assert_eq!(obfuscate("hello", '#', cutoff, true).unwrap(), "#####");
        }
    }

    #[test]
    fn test_email_masks_local_part_only() {
        assert_eq!(
            obfuscate_email("jane.doe@example.org", '*', 3, true).unwrap(),
            "jane.***@example.org"
        );
        assert_eq!(obfuscate_email("jo@example.org", '*', 4, true).unwrap(), "**@example.org");
    }

    #[test]
    fn test_email_without_at_rejected() {
        let err = obfuscate_email("not-an-email", '*', 4, true).unwrap_err();
        assert_eq!(err.code, "invalid_email");
        assert!(obfuscate_email("a@b@c", '*', 4, true).is_err());
    }

    #[test]
    fn test_obfuscator_struct() {
        let o = Obfuscator::new('-', 2, false);
        assert_eq!(o.obfuscate("123456").unwrap(), "--3456");
        assert_eq!(o.email("abc@x.io").unwrap(), "--c@x.io");
    }
}
