use url::Url;

/// `Range` header value requesting everything from `offset` on.
pub fn range_header(offset: u64) -> (String, String) {
    ("Range".to_string(), format!("bytes={offset}-"))
}

/// File name from a `Content-Disposition` value, if it names one.
///
/// Handles the plain `filename=` parameter, quoted or not. The RFC 5987
/// `filename*=` form takes precedence when present and is decoded only for
/// UTF-8 without percent escapes, which covers what CDNs actually send.
pub fn content_disposition_file_name(value: &str) -> Option<String> {
    let mut plain = None;
    for param in value.split(';').map(str::trim) {
        let Some((key, raw)) = param.split_once('=') else {
            continue;
        };
        let raw = raw.trim();
        match key.trim().to_ascii_lowercase().as_str() {
            "filename*" => {
                if let Some(encoded) = raw.strip_prefix("UTF-8''").or_else(|| raw.strip_prefix("utf-8''"))
                    && !encoded.is_empty()
                    && !encoded.contains('%')
                {
                    return Some(encoded.to_string());
                }
            }
            "filename" => {
                let name = raw.trim_matches('"');
                if !name.is_empty() {
                    plain = Some(name.to_string());
                }
            }
            _ => {}
        }
    }
    plain
}

/// Last non-empty path segment of `url`.
pub fn url_file_name(url: &Url) -> Option<String> {
    url.path_segments()?
        .filter(|segment| !segment.is_empty())
        .last()
        .map(str::to_string)
}
