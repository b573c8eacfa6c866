//! Info command - show what the server reports about a URL.

use fetchy::{Downloader, FetchConfig};
use tracing::debug;

use super::format_optional_size;
use crate::error::CliError;

/// Run the info command.
pub fn run(url: &str) -> Result<(), CliError> {
    debug!(url = %url, "Running info command");
    let downloader = Downloader::new(FetchConfig::default())?;
    let metadata = downloader
        .resolve(url)
        .ok_or_else(|| CliError::Connect(url.to_string()))?;

    println!("Download Information");
    println!("  URL:            {}", url);
    println!("  Filename:       {}", metadata.filename);
    println!("  Size:           {}", format_optional_size(metadata.total_size));
    println!(
        "  Type:           {}",
        metadata.content_type.as_deref().unwrap_or("N/A")
    );
    println!(
        "  Supports Range: {}",
        if metadata.supports_range { "Yes" } else { "No" }
    );

    Ok(())
}
