//! Response classification.
//!
//! Every upstream response passes through [`classify`] before parsing. The
//! verdict drives the client's single recovery action: only
//! [`Verdict::Blocked`] triggers a session refresh and retry.

use crate::transport::UpstreamResponse;

/// Markers of the anti-bot interstitial served instead of data.
///
/// Matched case-insensitively against the start of HTML bodies.
const CHALLENGE_SIGNATURES: &[&str] = &[
    "access denied",
    "request rejected",
    "reference #",
    "are you a robot",
    "resource not available",
];

/// Only the head of a page is searched; interstitials are small.
const SIGNATURE_SCAN_CHARS: usize = 4096;

/// Outcome of inspecting one upstream response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// Usable payload; hand it to the parser.
    Ok,
    /// Anti-bot rejection or expired session.
    Blocked(String),
    /// Upstream says the requested entity does not exist (HTTP 404).
    NotFound,
    /// Upstream server failure (HTTP 5xx).
    Unavailable(String),
    /// A response that is neither data nor a recognized rejection.
    Malformed(String),
}

/// Decide what to do with a response to a data (JSON/CSV) endpoint.
pub fn classify(response: &UpstreamResponse) -> Verdict {
    match response.status {
        401 | 403 | 429 => {
            let reason = challenge_signature(response)
                .map(|sig| format!("HTTP {} with challenge marker '{}'", response.status, sig))
                .unwrap_or_else(|| format!("HTTP {}", response.status));
            return Verdict::Blocked(reason);
        }
        404 => return Verdict::NotFound,
        500..=599 => return Verdict::Unavailable(format!("HTTP {}", response.status)),
        _ => {}
    }

    if !response.is_success() {
        return Verdict::Malformed(format!("unexpected HTTP {}", response.status));
    }

    if let Some(sig) = challenge_signature(response) {
        return Verdict::Blocked(format!("challenge page marker '{}'", sig));
    }

    // Data endpoints never legitimately answer with a page
    if response.is_html() {
        return Verdict::Blocked("HTML page served instead of data".to_string());
    }

    if response.body.trim().is_empty() {
        return Verdict::Malformed("empty body".to_string());
    }

    Verdict::Ok
}

/// Return the first challenge marker found in an HTML response, if any.
///
/// Non-HTML bodies never match, so JSON payloads that merely mention a
/// marker word are not mistaken for a block.
pub fn challenge_signature(response: &UpstreamResponse) -> Option<&'static str> {
    if !response.is_html() {
        return None;
    }

    let head: String = response
        .body
        .chars()
        .take(SIGNATURE_SCAN_CHARS)
        .collect::<String>()
        .to_lowercase();

    CHALLENGE_SIGNATURES
        .iter()
        .copied()
        .find(|sig| head.contains(sig))
}

#[cfg(test)]
mod tests {
    use super::*;

    const AKAMAI_DENIED: &str = "<HTML><HEAD>\n<TITLE>Access Denied</TITLE>\n</HEAD><BODY>\n\
        <H1>Access Denied</H1>\nYou don't have permission to access this server.<P>\n\
        Reference&#32;&#35;18&#46;abcdef\n</BODY>\n</HTML>";

    #[test]
    fn test_json_success_is_ok() {
        let response = UpstreamResponse::new(200, r#"{"data": []}"#)
            .with_content_type("application/json");
        assert_eq!(classify(&response), Verdict::Ok);
    }

    #[test]
    fn test_csv_success_is_ok() {
        let response = UpstreamResponse::new(200, "Date ,OPEN ,HIGH\n")
            .with_content_type("text/csv");
        assert_eq!(classify(&response), Verdict::Ok);
    }

    #[test]
    fn test_forbidden_is_blocked() {
        let response =
            UpstreamResponse::new(403, AKAMAI_DENIED).with_content_type("text/html");
        match classify(&response) {
            Verdict::Blocked(reason) => assert!(reason.contains("access denied")),
            other => panic!("Expected Blocked, got {:?}", other),
        }
    }

    #[test]
    fn test_unauthorized_without_body_is_blocked() {
        let response = UpstreamResponse::new(401, "");
        assert_eq!(classify(&response), Verdict::Blocked("HTTP 401".to_string()));
    }

    #[test]
    fn test_challenge_page_with_200_is_blocked() {
        let response = UpstreamResponse::new(200, AKAMAI_DENIED);
        assert!(matches!(classify(&response), Verdict::Blocked(_)));
    }

    #[test]
    fn test_any_html_on_data_endpoint_is_blocked() {
        let response = UpstreamResponse::new(200, "<html><body>Loading...</body></html>");
        assert!(matches!(classify(&response), Verdict::Blocked(_)));
    }

    #[test]
    fn test_not_found() {
        let response = UpstreamResponse::new(404, "");
        assert_eq!(classify(&response), Verdict::NotFound);
    }

    #[test]
    fn test_server_error_is_unavailable() {
        let response = UpstreamResponse::new(503, "Service Unavailable");
        assert!(matches!(classify(&response), Verdict::Unavailable(_)));
    }

    #[test]
    fn test_empty_body_is_malformed() {
        let response = UpstreamResponse::new(200, "   ");
        assert!(matches!(classify(&response), Verdict::Malformed(_)));
    }

    #[test]
    fn test_json_mentioning_marker_is_not_a_challenge() {
        let response = UpstreamResponse::new(200, r#"{"msg": "Access Denied to nothing"}"#)
            .with_content_type("application/json");
        assert_eq!(challenge_signature(&response), None);
        assert_eq!(classify(&response), Verdict::Ok);
    }
}
