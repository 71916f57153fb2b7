use std::io::Cursor;
use std::time::Duration;

use image::{DynamicImage, ImageReader};
use reqwest::Client;
use tracing::{debug, info};
use webcam_index_common::webcam::Webcam;

/// Fetch the resort's webcam index page as text.
pub async fn fetch_index_page(
    client: &Client,
    url: &str,
    timeout: Duration,
) -> Result<String, FetchError> {
    debug!(url, "fetching index page");
    let response = client
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .map_err(FetchError::Http)?;
    if !response.status().is_success() {
        return Err(FetchError::Status(response.status().as_u16()));
    }
    let body = response.text().await.map_err(FetchError::Http)?;
    debug!(bytes = body.len(), "fetched index page");
    Ok(body)
}

/// Fetch and decode one image for a webcam.
///
/// On success the record's `last_index` is bumped to `max(index,
/// last_index)`; a failed fetch leaves it untouched.
pub async fn fetch_image(
    client: &Client,
    webcam: &mut Webcam,
    index: u64,
    timeout: Duration,
) -> Result<DynamicImage, FetchError> {
    let url = webcam.format_url(index);
    debug!(webcam = %webcam.name, index, url, "fetching image");

    let response = client
        .get(&url)
        .timeout(timeout)
        .send()
        .await
        .map_err(FetchError::Http)?;
    if !response.status().is_success() {
        return Err(FetchError::Status(response.status().as_u16()));
    }
    let bytes = response.bytes().await.map_err(FetchError::Http)?;

    let image = ImageReader::new(Cursor::new(bytes.as_ref()))
        .with_guessed_format()
        .map_err(FetchError::Io)?
        .decode()
        .map_err(FetchError::Decode)?;

    webcam.note_fetched(index);
    info!(
        webcam = %webcam.name,
        index,
        width = image.width(),
        height = image.height(),
        "fetched image"
    );
    Ok(image)
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(reqwest::Error),
    #[error("HTTP status {0}")]
    Status(u16),
    #[error("failed to read image bytes: {0}")]
    Io(std::io::Error),
    #[error("failed to decode image: {0}")]
    Decode(image::ImageError),
}
