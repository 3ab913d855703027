//! Response status classification
//!
//! Only `200 OK` responses are worth extracting. Everything else is recorded
//! as its status code; codes that routinely show up on stale or moved pages
//! are rejected quietly, anything unexpected is logged as a warning.

/// Codes rejected without a warning
const SILENT_REJECTIONS: [u16; 10] = [301, 302, 303, 308, 400, 404, 410, 500, 502, 503];

/// Whether a response body should be extracted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Accept,
    Reject,
}

impl Classification {
    pub fn is_accept(&self) -> bool {
        matches!(self, Self::Accept)
    }

    /// True for rejected codes outside the quiet list (403 included)
    pub fn should_warn(status: u16) -> bool {
        status != 200 && !SILENT_REJECTIONS.contains(&status)
    }
}

/// Maps a status code to a classification
///
/// # Examples
///
/// ```
/// use sift_scrape::pipeline::{classify, Classification};
///
/// assert_eq!(classify(200), Classification::Accept);
/// assert_eq!(classify(404), Classification::Reject);
/// ```
pub fn classify(status: u16) -> Classification {
    if status == 200 {
        Classification::Accept
    } else {
        Classification::Reject
    }
}

/// Classifies a response for `url`, warning about unexpected codes
pub fn classify_response(url: &str, status: u16) -> Classification {
    let classification = classify(status);
    if Classification::should_warn(status) {
        tracing::warn!(url, status, "({}), Response Status Code {}", url, status);
    } else if !classification.is_accept() {
        tracing::debug!(url, status, "Rejected response");
    }
    classification
}
