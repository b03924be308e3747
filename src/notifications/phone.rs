use crate::notifications::error::NotifyError;

/// Normalizes a phone number to a leading-`+` country-code form.
///
/// Separator characters (spaces, dashes, dots, parens) are stripped. Numbers
/// already carrying `+` keep it; a `00` international prefix becomes `+`;
/// bare 10-digit numbers get the `+1` heuristic; anything else is prefixed
/// with `+` as-is.
pub fn normalize_phone(raw: &str) -> Result<String, NotifyError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(NotifyError::InvalidRecipient("empty phone number".to_string()));
    }

    let has_plus = trimmed.starts_with('+');
    let digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();
    if let Some(bad) = trimmed
        .chars()
        .find(|c| !c.is_ascii_digit() && !matches!(c, '+' | ' ' | '-' | '.' | '(' | ')'))
    {
        return Err(NotifyError::InvalidRecipient(format!(
            "unexpected character '{bad}' in phone number"
        )));
    }

    let digits = if has_plus {
        digits
    } else if let Some(rest) = digits.strip_prefix("00") {
        rest.to_string()
    } else if digits.len() == 10 {
        format!("1{digits}")
    } else {
        digits
    };

    if !(8..=15).contains(&digits.len()) {
        return Err(NotifyError::InvalidRecipient(format!(
            "expected 8-15 digits, got {}",
            digits.len()
        )));
    }

    Ok(format!("+{digits}"))
}
