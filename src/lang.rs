/// Best-effort language detection for post bodies.
///
/// Returns an ISO 639-3 code such as `"eng"` or `"ell"`, or `None` when the
/// detector is not confident enough to tag the text. Posts keep working
/// either way, the tag only feeds translation links in the UI.
pub fn detect_language(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    let info = whatlang::detect(trimmed)?;
    if !info.is_reliable() {
        return None;
    }
    let code = info.lang().code();
    if code.len() > 5 {
        return None;
    }
    Some(code.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_has_no_language() {
        assert_eq!(detect_language(""), None);
        assert_eq!(detect_language("   "), None);
    }

    #[test]
    fn numbers_have_no_language() {
        assert_eq!(detect_language("12345 67890"), None);
    }

    #[test]
    fn greek_script_is_detected() {
        let text = "Η γρήγορη καφετιά αλεπού πηδάει πάνω από το τεμπέλικο σκυλί";
        assert_eq!(detect_language(text), Some("ell".to_string()));
    }
}
