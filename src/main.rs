use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use vitrine::adapters::metadata_extractor::MetadataExtractor;
use vitrine::adapters::widget_registry::WidgetRegistry;
use vitrine::cli::{Cli, Command};
use vitrine::config::{watcher::SourceWatcher, Settings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let settings = Settings::new_with_cli(&cli)?;

    match cli.command() {
        Command::Serve => serve(settings).await,
        Command::Extract { watch } => extract(settings, watch).await,
    }
}

async fn serve(settings: Settings) -> anyhow::Result<()> {
    let host = settings.server.host.clone();
    let port = settings.server.port;

    info!("Starting Vitrine dev server on {}:{}", host, port);
    info!("Serving modules from {}", settings.dev.root.display());

    // The module set is closed once discovered; restart to pick up new widgets.
    let registry = Arc::new(WidgetRegistry::discover(&settings)?);
    if registry.is_empty() {
        warn!("No widgets found in {}", settings.widgets.dir.display());
    } else if !registry.contains(&settings.widgets.default_widget) {
        warn!(
            "Default widget '{}' is not registered; /preview without ?widget= will list the available widgets",
            settings.widgets.default_widget
        );
    }
    let app = vitrine::create_app(&settings, registry);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn extract(settings: Settings, watch: bool) -> anyhow::Result<()> {
    let extractor = MetadataExtractor::new(&settings);
    let map = extractor.run()?;
    info!("Extracted {} widget(s)", map.len());

    if !watch {
        return Ok(());
    }

    let paths = vec![settings.widgets.dir.clone(), settings.widgets.shared.clone()];
    let _watcher = SourceWatcher::new(paths, move || match extractor.run() {
        Ok(map) => info!("Re-extracted {} widget(s)", map.len()),
        Err(e) => error!("Metadata extraction failed: {}", e),
    })?;

    info!("Watching for widget changes, press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;
    Ok(())
}
