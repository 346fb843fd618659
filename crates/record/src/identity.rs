use chrono::NaiveDateTime;

/// Format of the start-time segment inside an identity.
pub const IDENTITY_START_FORMAT: &str = "%Y%m%d%H%M";

/// Placeholder segment kept for compatibility with identities persisted by older runs.
const IDENTIFIER_SEGMENT: &str = "x";

/// Stable identity of a meeting: `<source>/<start>/x/<title_slug>`.
///
/// Pure: no clock, no randomness. Two runs that extract the same meeting produce the same string.
#[must_use]
pub fn identity(source_name: &str, start: NaiveDateTime, title: &str) -> String {
    format!(
        "{source_name}/{}/{IDENTIFIER_SEGMENT}/{}",
        start.format(IDENTITY_START_FORMAT),
        title_slug(title)
    )
}

/// Lowercase slug where every run of non-alphanumeric ASCII collapses into one `_`.
#[must_use]
pub fn title_slug(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_separator = false;

    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('_');
            }
            pending_separator = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_separator = true;
        }
    }

    slug
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .and_then(|date| date.and_hms_opt(h, min, 0))
            .expect("valid datetime")
    }

    #[test]
    fn identity_matches_known_layout() {
        let id = identity(
            "pa_mt_lebanon",
            at(2020, 1, 6, 20, 0),
            "Mt Lebanon Commission Meeting",
        );
        assert_eq!(id, "pa_mt_lebanon/202001062000/x/mt_lebanon_commission_meeting");
    }

    #[test]
    fn identity_is_deterministic() {
        let start = at(2020, 5, 20, 19, 0);
        let first = identity("monroeville_public_meetings", start, "Planning Commission");
        let second = identity("monroeville_public_meetings", start, "Planning Commission");
        assert_eq!(first, second);
    }

    #[test]
    fn identity_differs_by_start_minute() {
        let a = identity("s", at(2020, 5, 20, 19, 0), "Board");
        let b = identity("s", at(2020, 5, 20, 19, 1), "Board");
        assert_ne!(a, b);
    }

    #[test]
    fn slug_collapses_punctuation_and_whitespace() {
        assert_eq!(title_slug("  Zoning -- Hearing: (Special)  "), "zoning_hearing_special");
        assert_eq!(title_slug("Café Board"), "caf_board");
        assert_eq!(title_slug("***"), "");
    }
}
