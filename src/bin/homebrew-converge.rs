use anyhow::Result;
use clap::Parser;
use homebrew_provider::{BrewProvider, Convergence, Ensure, PackageSpec};
use tracing::info;

#[derive(Parser)]
#[command(name = "homebrew-converge")]
#[command(about = "Converge one Homebrew package to its desired state")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct HomebrewConvergeCli {
    /// Package (formula) name to reconcile
    name: String,

    /// Desired state: present, absent, latest, or an explicit version
    #[arg(short, long, default_value = "present")]
    ensure: String,

    /// Extra flag passed through to `brew install` (repeatable)
    #[arg(long = "install-option")]
    install_options: Vec<String>,

    /// Print the installed and latest versions without changing anything
    #[arg(short, long)]
    query: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = HomebrewConvergeCli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    let spec = PackageSpec::new(cli.name.as_str(), Ensure::parse(&cli.ensure))?
        .with_install_options(cli.install_options);
    let provider = BrewProvider::for_host().await?;

    if cli.query {
        match provider.query().installed_version(&spec).await? {
            Some(record) => info!("{} installed at {}", record.name, record.version),
            None => info!("{} is not installed", spec.resource_name()),
        }
        match provider.query().latest_version(&spec).await {
            Ok(version) => info!("{} latest stable is {}", spec.resource_name(), version),
            Err(e) => info!("no latest version for {}: {}", spec.resource_name(), e),
        }
        return Ok(());
    }

    match provider.converge(&spec).await? {
        Convergence::Installed => info!("installed {}", spec.install_name()),
        Convergence::Upgraded => info!("upgraded {}", spec.resource_name()),
        Convergence::Removed => info!("removed {}", spec.resource_name()),
        Convergence::Unchanged => info!("{} already in desired state", spec.resource_name()),
    }

    Ok(())
}
