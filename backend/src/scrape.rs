use std::borrow::Cow;
use std::collections::BTreeMap;

use url::Url;
use webcam_index_common::webcam::Webcam;

/// Discover the latest image index for every webcam from the raw index
/// page body.
///
/// The index page is not a structured feed — image references are
/// embedded as filename suffixes inside arbitrary HTML — so each webcam's
/// index is located by searching for its template's URL prefix as a
/// literal substring and reading the digit run anchored right after it.
///
/// The first webcam that cannot be resolved fails the whole batch; no
/// partial result is returned.
pub fn scrape_indices(
    page: &str,
    webcams: &[Webcam],
) -> Result<BTreeMap<String, u64>, ScrapeError> {
    let mut indices = BTreeMap::new();
    for webcam in webcams {
        indices.insert(webcam.name.clone(), scrape_index(page, webcam)?);
    }
    Ok(indices)
}

/// Resolve a single webcam's latest index from the page body.
fn scrape_index(page: &str, webcam: &Webcam) -> Result<u64, ScrapeError> {
    let prefix = webcam
        .url_prefix()
        .ok_or_else(|| ScrapeError::MissingPlaceholder {
            webcam: webcam.name.clone(),
        })?;
    let prefix = site_relative(prefix);

    let at = page
        .find(prefix.as_ref())
        .ok_or_else(|| ScrapeError::PrefixNotFound {
            webcam: webcam.name.clone(),
        })?;

    // The digits must start exactly where the prefix ends.
    let rest = &page[at + prefix.len()..];
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let digits = &rest[..end];
    if digits.is_empty() {
        return Err(ScrapeError::IndexNotNumeric {
            webcam: webcam.name.clone(),
        });
    }

    digits.parse().map_err(|_| ScrapeError::IndexOutOfRange {
        webcam: webcam.name.clone(),
    })
}

/// Reduce a template's URL prefix to the site-relative form the index
/// page uses: templates may be absolute, but the page references images
/// by path only.
///
/// A prefix that is already relative does not parse as an absolute URL
/// and is passed through untouched.
fn site_relative(prefix: &str) -> Cow<'_, str> {
    match Url::parse(prefix) {
        Ok(url) => Cow::Owned(url.path().to_string()),
        Err(_) => Cow::Borrowed(prefix),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("url template for webcam {webcam} has no index placeholder")]
    MissingPlaceholder { webcam: String },
    #[error("image prefix for webcam {webcam} not found on index page")]
    PrefixNotFound { webcam: String },
    #[error("no image index digits after prefix for webcam {webcam}")]
    IndexNotNumeric { webcam: String },
    #[error("image index for webcam {webcam} does not fit in 64 bits")]
    IndexOutOfRange { webcam: String },
}

impl ScrapeError {
    /// The webcam the scrape failed on.
    pub fn webcam(&self) -> &str {
        match self {
            ScrapeError::MissingPlaceholder { webcam }
            | ScrapeError::PrefixNotFound { webcam }
            | ScrapeError::IndexNotNumeric { webcam }
            | ScrapeError::IndexOutOfRange { webcam } => webcam,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn webcam(name: &str, template: &str) -> Webcam {
        Webcam::new(name, template)
    }

    #[test]
    fn resolves_index_after_prefix() {
        let page = r#"<img src="/village_123.jpg" alt="Village Centre">"#;
        let webcams = [webcam("Village Centre", "http://x/village_{}.jpg")];
        let indices = scrape_indices(page, &webcams).unwrap();
        assert_eq!(indices["Village Centre"], 123);
    }

    #[test]
    fn strips_scheme_and_host_from_absolute_templates() {
        // Templates are absolute, the page references images site-relative.
        let page = r#"<a href="/sites/default/files/powpow_991.jpg">Pow Cam</a>"#;
        let webcams = [webcam(
            "Pow Cam",
            "https://www.bigwhite.com/sites/default/files/powpow_{}.jpg",
        )];
        let indices = scrape_indices(page, &webcams).unwrap();
        assert_eq!(indices["Pow Cam"], 991);
    }

    #[test]
    fn relative_template_is_used_as_is() {
        let page = r#"<img src="/files/cliff_8.jpg">"#;
        let webcams = [webcam("The Cliff", "/files/cliff_{}.jpg")];
        let indices = scrape_indices(page, &webcams).unwrap();
        assert_eq!(indices["The Cliff"], 8);
    }

    #[test]
    fn resolves_every_webcam_independently() {
        let page = concat!(
            r#"<img src="/village_40.jpg">"#,
            r#"<img src="/cliff_7.jpg">"#,
            r#"<img src="/powpow_1205.jpg">"#,
        );
        let webcams = [
            webcam("Pow Cam", "http://x/powpow_{}.jpg"),
            webcam("Village Centre", "http://x/village_{}.jpg"),
            webcam("The Cliff", "http://x/cliff_{}.jpg"),
        ];
        let indices = scrape_indices(page, &webcams).unwrap();
        assert_eq!(indices["Village Centre"], 40);
        assert_eq!(indices["The Cliff"], 7);
        assert_eq!(indices["Pow Cam"], 1205);
    }

    #[test]
    fn first_occurrence_wins() {
        let page = r#"<img src="/village_5.jpg"> older: <img src="/village_3.jpg">"#;
        let webcams = [webcam("Village Centre", "http://x/village_{}.jpg")];
        let indices = scrape_indices(page, &webcams).unwrap();
        assert_eq!(indices["Village Centre"], 5);
    }

    #[test]
    fn index_zero_and_leading_zeros_parse() {
        let page = r#"<img src="/village_0.jpg"><img src="/cliff_007.jpg">"#;
        let webcams = [
            webcam("Village Centre", "http://x/village_{}.jpg"),
            webcam("The Cliff", "http://x/cliff_{}.jpg"),
        ];
        let indices = scrape_indices(page, &webcams).unwrap();
        assert_eq!(indices["Village Centre"], 0);
        assert_eq!(indices["The Cliff"], 7);
    }

    #[test]
    fn digit_run_at_end_of_page() {
        let page = "see /village_314";
        let webcams = [webcam("Village Centre", "http://x/village_{}.jpg")];
        let indices = scrape_indices(page, &webcams).unwrap();
        assert_eq!(indices["Village Centre"], 314);
    }

    #[test]
    fn missing_prefix_fails_naming_the_webcam() {
        let page = r#"<img src="/village_40.jpg">"#;
        let webcams = [webcam("Pow Cam", "http://x/powpow_{}.jpg")];
        let err = scrape_indices(page, &webcams).unwrap_err();
        assert!(matches!(&err, ScrapeError::PrefixNotFound { webcam } if webcam == "Pow Cam"));
        assert_eq!(err.webcam(), "Pow Cam");
    }

    #[test]
    fn prefix_without_digits_fails_naming_the_webcam() {
        let page = r#"<img src="/village_latest.jpg">"#;
        let webcams = [webcam("Village Centre", "http://x/village_{}.jpg")];
        let err = scrape_indices(page, &webcams).unwrap_err();
        assert!(
            matches!(&err, ScrapeError::IndexNotNumeric { webcam } if webcam == "Village Centre")
        );
    }

    #[test]
    fn template_without_placeholder_fails() {
        let page = r#"<img src="/village_40.jpg">"#;
        let webcams = [webcam("Village Centre", "http://x/village.jpg")];
        let err = scrape_indices(page, &webcams).unwrap_err();
        assert!(
            matches!(&err, ScrapeError::MissingPlaceholder { webcam } if webcam == "Village Centre")
        );
    }

    #[test]
    fn oversized_digit_run_is_rejected() {
        let page = "/village_99999999999999999999999999.jpg";
        let webcams = [webcam("Village Centre", "http://x/village_{}.jpg")];
        let err = scrape_indices(page, &webcams).unwrap_err();
        assert!(
            matches!(&err, ScrapeError::IndexOutOfRange { webcam } if webcam == "Village Centre")
        );
    }

    #[test]
    fn one_unmatched_webcam_fails_the_batch() {
        let page = r#"<img src="/village_40.jpg">"#;
        let webcams = [
            webcam("Village Centre", "http://x/village_{}.jpg"),
            webcam("Pow Cam", "http://x/powpow_{}.jpg"),
        ];
        assert!(scrape_indices(page, &webcams).is_err());
    }
}
