use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use sensorwatch::settings::{Overrides, Settings};
use sensorwatch::{ControlCommand, EventReceiver, MonitorEvent, TransportSession};
use sensorwatch_types::Transport;

/// Delay between attempts while the initial connect keeps failing.
const RETRY_DELAY: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(name = "sensorwatch")]
#[command(about = "Threshold alerts and liveness monitoring for IoT sensor streams")]
struct Args {
    /// Path to a TOML settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Broker URL (overrides the settings file)
    #[arg(short, long)]
    url: Option<String>,

    /// Topic carrying device readings (overrides the settings file)
    #[arg(short, long)]
    topic: Option<String>,

    /// Log filter, used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Send a start/stop command to the device once connected
    #[arg(long, value_enum)]
    control: Option<ControlArg>,

    /// Seconds between status summary lines (0 disables them)
    #[arg(long, default_value = "3")]
    status_interval: u64,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ControlArg {
    Start,
    Stop,
}

impl From<ControlArg> for ControlCommand {
    fn from(arg: ControlArg) -> Self {
        match arg {
            ControlArg::Start => ControlCommand::Start,
            ControlArg::Stop => ControlCommand::Stop,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let settings = Settings::load(
        args.config.as_deref(),
        Overrides {
            url: args.url.clone(),
            topic: args.topic.clone(),
        },
    )?;

    let (engine, rejected) = settings.build_engine();
    if !rejected.is_empty() {
        warn!(
            "{} channel(s) started without a threshold",
            rejected.len()
        );
    }

    let transport = build_transport(&settings)?;
    let (session, events) =
        TransportSession::new(transport, Arc::new(engine), settings.session_config());

    let printer = tokio::spawn(print_events(events));
    let status = (args.status_interval > 0).then(|| {
        tokio::spawn(log_status(
            session.clone(),
            Duration::from_secs(args.status_interval),
        ))
    });

    tokio::select! {
        _ = run(&session, args.control) => {}
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                error!("Failed to listen for Ctrl-C: {}", e);
            }
        }
    }

    info!("Shutting down");
    session.disconnect().await;
    if let Some(status) = status {
        status.abort();
        let _ = status.await;
    }
    drop(session);
    let _ = printer.await;
    Ok(())
}

/// Connect (retrying until it succeeds), send the optional control command,
/// then wait for Ctrl-C.
async fn run(session: &TransportSession, control: Option<ControlArg>) {
    while let Err(e) = session.connect().await {
        warn!("Retrying in {}s: {}", RETRY_DELAY.as_secs(), e);
        tokio::time::sleep(RETRY_DELAY).await;
    }

    if let Some(command) = control {
        if let Err(e) = session.send_control(command.into()).await {
            error!("Control command failed: {}", e);
        }
    }

    std::future::pending::<()>().await
}

async fn print_events(mut events: EventReceiver) {
    while let Some(event) = events.recv().await {
        match &event {
            MonitorEvent::Alert(alert) if alert.is_raised() => warn!("{}", event),
            _ => info!("{}", event),
        }
    }
}

async fn log_status(session: TransportSession, every: Duration) {
    let mut interval = tokio::time::interval(every);
    loop {
        interval.tick().await;
        let engine = session.engine();
        let alerting: Vec<_> = engine
            .channel_names()
            .filter(|name| {
                engine
                    .debounce_state(name)
                    .is_some_and(|s| s.is_alerting())
            })
            .collect();
        info!(
            state = ?session.state(),
            device = %session.device_status().label(),
            silent_for = session.liveness().elapsed().as_secs(),
            "Status: {}",
            if alerting.is_empty() {
                "no alerts".to_string()
            } else {
                format!("alerting on {}", alerting.join(", "))
            }
        );
    }
}

#[cfg(feature = "nats")]
fn build_transport(settings: &Settings) -> Result<Arc<dyn Transport>> {
    use sensorwatch_adapters::nats::NatsTransport;

    let mut builder = NatsTransport::builder().url(settings.transport.url.as_str());
    if let Some(client_id) = &settings.transport.client_id {
        builder = builder.client_name(client_id.as_str());
    }
    Ok(Arc::new(builder.build()))
}

#[cfg(not(feature = "nats"))]
fn build_transport(_settings: &Settings) -> Result<Arc<dyn Transport>> {
    anyhow::bail!("No network transport compiled in; rebuild with the `nats` feature")
}
