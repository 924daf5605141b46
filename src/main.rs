use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use seat_map_client::{config::Config, EventOutcome, Notice, SeatMapSession};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.app.rust_log))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting seat map client against {}", config.backend.base_url());

    let mut session = SeatMapSession::load(config).await?;
    {
        let frame = session.render();
        info!(
            "Rendering {:?}: {} sections, {} non-seat areas",
            frame.venue_name,
            frame.detail.sections.len(),
            frame.overview.non_seats.len()
        );
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl-C received, shutting down");
                break;
            }
            event = session.next_event() => {
                let Some(event) = event else { break };
                match session.handle_event(event) {
                    EventOutcome::Unchanged => {}
                    EventOutcome::ConnectionLost | EventOutcome::TransportFailed(_) => {
                        if let Some(banner) = session.connection_banner() {
                            warn!("{}", banner);
                        }
                    }
                    outcome => info!("{:?}", outcome),
                }
                for notice in session.take_notices() {
                    match notice {
                        Notice::Alert { title, message } => info!("{} {}", title, message),
                        Notice::Blocking(message) => error!("{}", message),
                    }
                }
            }
        }
    }

    session.shutdown().await;
    Ok(())
}
