//! Showroom compositing CLI tool
//!
//! Command-line interface for placing vehicle cutouts onto studio backgrounds
//! using the showroom-compose library.

#[cfg(feature = "cli")]
use showroom_compose::cli;

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    panic!("CLI feature not enabled. Please rebuild with --features cli");
}
