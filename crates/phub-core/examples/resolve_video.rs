//! Resolve a video, print its metadata and optionally download it
//!
//! Usage: `cargo run --example resolve_video -- <url-or-key> [quality] [output]`
//! Set `RUST_LOG=phub_core=debug` to follow renewals and manifest resolution.

use phub_core::{DownloadOptions, PhubScraper, Quality};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("phub_core=info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let target = args.next().ok_or("missing video URL or key")?;
    let quality: Quality = args.next().as_deref().unwrap_or("best").parse()?;
    let output = args.next();

    let scraper = PhubScraper::new()?;
    let video = scraper.get_video(&target)?;

    match video.title().await {
        Ok(title) => println!("Title:    {}", title),
        Err(e) if e.is_terminal() => {
            eprintln!("Video unavailable: {}", e);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    }
    println!("Duration: {:?}", video.duration().await?);
    println!("Tags:     {}", video.tags().await?.join(", "));

    let qualities = video.qualities().await?;
    println!("Qualities: {:?}", qualities.keys().collect::<Vec<_>>());

    if let Some(output) = output {
        video
            .download(&output, quality, &DownloadOptions::default(), |done, total| {
                eprint!("\r{}/{} segments", done, total);
            })
            .await?;
        eprintln!();
        println!("Saved to {}", output);
    }

    Ok(())
}
