use std::time::Duration;

use tracing::info;

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Download the published menu document. No retry here: a failed run is
/// simply retried by the next scheduled tick.
pub async fn download(url: &str) -> Result<Vec<u8>, reqwest::Error> {
    info!("Fetching menu document: {}", url);
    let client = reqwest::Client::builder().timeout(FETCH_TIMEOUT).build()?;
    let bytes = client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .bytes()
        .await?;
    info!("Fetched {} bytes", bytes.len());
    Ok(bytes.to_vec())
}
