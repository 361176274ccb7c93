use std::collections::HashMap;

/// Parse query parameters from a URI string
///
/// Handles URL decoding and returns a HashMap of parameter key-value pairs.
/// Multiple values for the same key are not supported (only the last is kept).
///
/// # Example
/// ```
/// use chirp::core::query_params::parse_query_params;
///
/// let params = parse_query_params("/path?user=john&page=2");
/// assert_eq!(params.get("user"), Some(&"john".to_string()));
/// assert_eq!(params.get("page"), Some(&"2".to_string()));
/// ```
pub fn parse_query_params(uri: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();

    if let Some(query_start) = uri.find('?') {
        let query = &uri[query_start + 1..];
        for param in query.split('&') {
            if let Some(eq_idx) = param.find('=') {
                let key = &param[..eq_idx];
                let encoded_value = &param[eq_idx + 1..];
                let decoded = urlencoding::decode(encoded_value)
                    .unwrap_or(std::borrow::Cow::Borrowed(encoded_value))
                    .to_string();
                params.insert(key.to_string(), decoded);
            } else {
                // Flag parameter without value
                params.insert(param.to_string(), String::new());
            }
        }
    }

    params
}

/// Get an integer parameter with validation and default
///
/// Values that fail to parse, and values below 1, fall back to the default.
pub fn get_int(params: &HashMap<String, String>, key: &str, default: usize) -> usize {
    params
        .get(key)
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(default)
        .max(1)
}

/// Extract the `page` query parameter from a URI, defaulting to page 1.
pub fn page_param(uri: &str) -> usize {
    let params = parse_query_params(uri);
    get_int(&params, "page", 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_multiple_params() {
        let params = parse_query_params("/feed?page=2&q=rust%20lang");
        assert_eq!(params.get("page"), Some(&"2".to_string()));
        assert_eq!(params.get("q"), Some(&"rust lang".to_string()));
    }

    #[test]
    fn no_query_string_yields_empty_map() {
        assert!(parse_query_params("/feed").is_empty());
    }

    #[test]
    fn page_defaults_to_one() {
        assert_eq!(page_param("/feed"), 1);
        assert_eq!(page_param("/feed?page=abc"), 1);
        assert_eq!(page_param("/feed?page=0"), 1);
        assert_eq!(page_param("/feed?page=-3"), 1);
    }

    #[test]
    fn page_reads_valid_values() {
        assert_eq!(page_param("/feed?page=7"), 7);
        assert_eq!(page_param("/explore?foo=bar&page=3"), 3);
    }
}
