use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use pharmalink::config::Config;
use pharmalink::identity::{landing_route, ClientCore};
use pharmalink::notifications::NotificationCenter;
use pharmalink::sos::SosFeed;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    fmt().with_env_filter(filter).init();

    let config = Config::from_env();
    info!(
        target: "pharmalink",
        "pharmalink starting: api_base='{}', credentials='{}', sos_interval={}s, notify_interval={}s, radius={}km",
        config.api_base,
        config.credentials_path.display(),
        config.sos_interval.as_secs(),
        config.notify_interval.as_secs(),
        config.sos_radius_km
    );

    let core = ClientCore::new(&config);

    // Bootstrap: rehydrate from durable storage; the token is revalidated
    // against the backend before anything trusts it.
    let session = core.manager.refresh_session().await;
    match &session {
        Some(s) => info!(user = %s.user.id, route = ?landing_route(Some(&s.user)), "session restored"),
        None => info!(route = ?core.nav.current(), "starting unauthenticated"),
    }

    // The notification badge polls for every authenticated role; only the
    // SOS feed is scoped to an approved pharmacy operator. The handles own
    // the timers, so dropping them at shutdown stops everything.
    let mut pollers = Vec::new();
    if let Some(session) = &session {
        let notifications = NotificationCenter::new();
        pollers.push(notifications.start_polling(&core.api, config.notify_interval));
        if session.user.is_approved_pharmacy() {
            let sos = SosFeed::new();
            pollers.push(sos.start_polling(&core.api, config.sos_interval, config.sos_radius_km));
        }
        info!(count = pollers.len(), "badge pollers started");
    }

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    for handle in pollers {
        handle.shutdown().await;
    }
    Ok(())
}
