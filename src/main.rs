use std::{env, error::Error};

use beacon::{
    config::{ServerConfig, ServerConfigLoadError},
    server::Server,
    telemetry::oltp::init_meter,
    utils::leak,
};
use tokio::sync::broadcast;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let _ = dotenvy::dotenv();
    #[cfg(debug_assertions)]
    env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .init();
    #[cfg(not(debug_assertions))]
    env_logger::init();

    let provider = if dotenvy::var("OTEL_EXPORTER_OTLP_ENDPOINT").is_ok() {
        match init_meter() {
            Ok(provider) => Some(provider),
            Err(err) => {
                log::warn!("Metrics disabled: {err}");
                None
            }
        }
    } else {
        None
    };

    let config_file = env::current_dir()?.join("settings.toml");
    let config = match ServerConfig::load(&config_file) {
        Ok(config) => {
            // Save config to fill missing fields
            let _ = config.save(&config_file);
            config
        }
        Err(ServerConfigLoadError::Io(_)) => {
            let default_config = ServerConfig::default();
            let _ = default_config.save(&config_file);
            default_config
        }
        Err(err @ ServerConfigLoadError::Parse(_)) => return Err(err.into()),
    };

    let (stop, stop_rx) = broadcast::channel(1);
    let server = leak(Server::new(config));
    let mut running = tokio::spawn(async move {
        if let Err(e) = server.start(stop_rx).await {
            log::error!("{e}");
        }
    });

    {
        use futures::future::{select_all, FutureExt};
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        let sigint_fut = sigint.recv().boxed();
        let sigterm_fut = sigterm.recv().boxed();

        let signalled = tokio::select! {
            _ = select_all([sigint_fut, sigterm_fut]) => true,
            finished = &mut running => {
                finished?;
                false
            }
        };
        if signalled {
            log::info!("Received signal, stopping...");
            let _ = stop.send(());
            running.await?;
        }
    }

    if let Some(provider) = provider {
        provider.shutdown()?;
    }
    Ok(())
}
