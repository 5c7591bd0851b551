use thiserror::Error;
use url::Url;

pub const MAX_TITLE_LEN: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    #[error("Please enter a title")]
    EmptyTitle,

    #[error("Title must be {max} characters or less")]
    TitleTooLong { max: usize },

    #[error("Please enter a URL")]
    EmptyUrl,

    #[error("Please enter a valid URL (e.g., example.com or https://example.com): {0}")]
    InvalidUrl(String),

    #[error("position {index} is out of range for {len} links")]
    PositionOutOfRange { index: usize, len: usize },
}

/// Trims the title and enforces its bounds.
pub fn normalize_title(input: &str) -> Result<String, LinkError> {
    let title = input.trim();
    if title.is_empty() {
        return Err(LinkError::EmptyTitle);
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(LinkError::TitleTooLong { max: MAX_TITLE_LEN });
    }
    Ok(title.to_string())
}

/// Makes sure a link target has a scheme and parses as an absolute URL with a host.
/// Anything without `http://` or `https://` in front gets `https://`.
pub fn normalize_url(input: &str) -> Result<String, LinkError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(LinkError::EmptyUrl);
    }

    let lower = trimmed.to_ascii_lowercase();
    let candidate = if lower.starts_with("http://") || lower.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let parsed = Url::parse(&candidate).map_err(|e| LinkError::InvalidUrl(e.to_string()))?;
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(LinkError::InvalidUrl("missing host".into()));
    }

    Ok(candidate)
}

/// Moves the element at `from` to `to`, shifting everything in between. This is
/// the operation a drag-and-drop list performs when an item is dropped.
pub fn move_item<T>(items: &mut Vec<T>, from: usize, to: usize) -> Result<(), LinkError> {
    let len = items.len();
    for index in [from, to] {
        if index >= len {
            return Err(LinkError::PositionOutOfRange { index, len });
        }
    }

    let item = items.remove(from);
    items.insert(to, item);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_gets_https_prefix() {
        assert_eq!(normalize_url("example.com").unwrap(), "https://example.com");
        assert_eq!(normalize_url("  example.com/me ").unwrap(), "https://example.com/me");
    }

    #[test]
    fn url_keeps_existing_scheme() {
        assert_eq!(normalize_url("http://example.com").unwrap(), "http://example.com");
        assert_eq!(normalize_url("HTTPS://Example.com").unwrap(), "HTTPS://Example.com");
    }

    #[test]
    fn url_rejects_garbage() {
        assert_eq!(normalize_url("   "), Err(LinkError::EmptyUrl));
        assert!(matches!(normalize_url("not a url"), Err(LinkError::InvalidUrl(_))));
        assert!(matches!(normalize_url("https://"), Err(LinkError::InvalidUrl(_))));
    }

    #[test]
    fn title_is_trimmed_and_bounded() {
        assert_eq!(normalize_title("  My blog ").unwrap(), "My blog");
        assert_eq!(normalize_title(""), Err(LinkError::EmptyTitle));
        assert_eq!(
            normalize_title(&"x".repeat(101)),
            Err(LinkError::TitleTooLong { max: 100 })
        );
        assert!(normalize_title(&"x".repeat(100)).is_ok());
    }

    #[test]
    fn move_forward_and_back() {
        let mut v = vec!['a', 'b', 'c', 'd'];
        move_item(&mut v, 0, 2).unwrap();
        assert_eq!(v, vec!['b', 'c', 'a', 'd']);

        move_item(&mut v, 3, 0).unwrap();
        assert_eq!(v, vec!['d', 'b', 'c', 'a']);

        move_item(&mut v, 1, 1).unwrap();
        assert_eq!(v, vec!['d', 'b', 'c', 'a']);
    }

    #[test]
    fn move_out_of_range() {
        let mut v = vec![1, 2];
        assert_eq!(
            move_item(&mut v, 2, 0),
            Err(LinkError::PositionOutOfRange { index: 2, len: 2 })
        );
        assert_eq!(
            move_item(&mut v, 0, 5),
            Err(LinkError::PositionOutOfRange { index: 5, len: 2 })
        );
        assert_eq!(v, vec![1, 2]);

        let mut empty: Vec<u8> = Vec::new();
        assert!(move_item(&mut empty, 0, 0).is_err());
    }
}
