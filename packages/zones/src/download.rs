//! Flood zone download.
//!
//! Fetches a `GeoJSON` `FeatureCollection` from a public URL and stores it
//! through the [`ZoneStore`], replacing whatever was there.

use crate::{ZoneError, ZoneStore, store::parse_feature_collection};

/// Downloads zone data from `url` and saves it to `store`.
///
/// Returns the number of features saved. The existing file is left
/// untouched if the download or parse fails.
///
/// # Errors
///
/// Returns [`ZoneError`] if the request fails, the response is not a
/// `FeatureCollection`, or the file cannot be written.
pub async fn download_zones(
    client: &reqwest::Client,
    url: &str,
    store: &ZoneStore,
) -> Result<usize, ZoneError> {
    log::info!("Downloading flood zones from {url}");

    let resp = client.get(url).send().await?;
    if !resp.status().is_success() {
        return Err(ZoneError::Invalid {
            message: format!("flood zone request failed with status {}", resp.status()),
        });
    }
    let body = resp.text().await?;

    let zones = parse_feature_collection(&body)?;
    store.save(&zones).await?;

    Ok(zones.features.len())
}
