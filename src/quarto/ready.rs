//! Detection of the preview server's "ready" line

use std::sync::OnceLock;

use regex_lite::Regex;

/// Both phrasings quarto uses to announce its local server
const READY_PATTERNS: [&str; 2] = [
    r"Browsing at (http://localhost:\d+)",
    r"Listening on (http://localhost:\d+)",
];

fn patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        READY_PATTERNS
            .iter()
            .filter_map(|p| match Regex::new(p) {
                Ok(re) => Some(re),
                Err(e) => {
                    tracing::error!("Invalid ready pattern {}: {}", p, e);
                    None
                }
            })
            .collect()
    })
}

/// Find the preview server URL announced in a chunk of stdout.
///
/// The URL is the captured `http://localhost:<port>` only; any trailing
/// path or slash is left out.
pub fn scan_ready_url(output: &str) -> Option<&str> {
    patterns()
        .iter()
        .find_map(|re| re.captures(output).and_then(|caps| caps.get(1)))
        .map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_browsing_at() {
        assert_eq!(
            scan_ready_url("Browsing at http://localhost:4200/"),
            Some("http://localhost:4200")
        );
    }

    #[test]
    fn test_listening_on() {
        assert_eq!(
            scan_ready_url("Watching files for changes\nListening on http://localhost:7031/index.html\n"),
            Some("http://localhost:7031")
        );
    }

    #[test]
    fn test_unrelated_output() {
        assert_eq!(scan_ready_url("pandoc\n  to: html\n"), None);
        assert_eq!(scan_ready_url("Browsing at https://example.com:80/"), None);
        assert_eq!(scan_ready_url("Browsing at http://localhost:/"), None);
    }
}
