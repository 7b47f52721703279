use apollo_mirror::ChangeEventReceiver;
use apollo_mirror::Client;
use apollo_mirror::MirrorConfig;
use apollo_mirror::Result;
use tokio::signal::unix::signal;
use tokio::signal::unix::SignalKind;
use tracing::error;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<()> {
    // Initializing Logs
    init_observability();

    let settings = MirrorConfig::new()?.with_bootstrap_env()?.validate()?;
    info!(?settings, "configuration loaded");

    let client = Client::builder(settings).build().await?;
    let events = client.subscribe();
    client.start()?;

    info!("Mirror started. Waiting for CTRL+C signal...");
    tokio::select! {
        _ = log_events(events) => {},
        r = graceful_shutdown() => {
            if let Err(e) = r {
                error!("Failed to listen for shutdown signals: {:?}", e);
            }
        }
    }

    if let Err(e) = client.close().await {
        error!("client close: {:?}", e);
    }

    println!("Exiting program.");
    Ok(())
}

async fn log_events(events: ChangeEventReceiver) {
    while let Some(event) = events.recv().await {
        info!(namespace = %event.namespace, changes = event.len(), "{}", event);
    }
}

async fn graceful_shutdown() -> Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT detected.");
        },
        _ = sigterm.recv() => {
            info!("SIGTERM detected.");
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl+C detected.");
        },
    }

    info!("Shutdown mirror..");
    Ok(())
}

fn init_observability() {
    let base_subscriber = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")));
    tracing_subscriber::registry().with(base_subscriber).init();
}
