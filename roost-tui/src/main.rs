//! Terminal UI for roost that lets users search places, inspect neighbourhood scores and
//! compare listing commutes.

mod app;
mod input;
mod listings;
mod ui;

use std::{
    env,
    fs::OpenOptions,
    io,
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Duration as StdDuration,
};

use anyhow::{Context, Result};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event as CEvent},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use reqwest::Client;
use roost_core::{
    EngineConfig, ProviderSet,
    coordinator::{Trigger, TriggerOutcome},
    model::{LatLon, RouteEstimate, Suggestion},
    ports::{ListingPort, PortError},
    service::RoostService,
};
use roost_provider_nominatim::{self as nominatim, NominatimGeocoder};
use roost_provider_osrm::OsrmRouter;
use roost_provider_overpass as overpass;
use tokio::sync::mpsc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::app::App;
use crate::input::Action;
use crate::listings::FileListings;

/// Results of background work, delivered back to the event loop.
enum AppEvent {
    Suggestions(Vec<Suggestion>),
    TriggerFinished(TriggerOutcome),
    RouteFinished(Result<RouteEstimate, PortError>),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_logging()?;

    // HTTP + service setup
    let client = Client::builder().user_agent("roost/0.1").build()?;
    let config = EngineConfig::from_env()?;
    let providers = providers(&client)?;
    let service = Arc::new(RoostService::new(providers, &config));
    let home = home_location()?;

    // App state
    let app = App::new(service, home);
    let (events_tx, events_rx) = mpsc::unbounded_channel();

    // Without a device fix, the configured home location stands in for one
    if let Some(point) = home {
        spawn_trigger(&app, Trigger::GeolocationFix(point), &events_tx);
    }

    // Terminal init
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run event loop
    let res = run(&mut terminal, app, events_tx, events_rx).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    res
}

async fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    mut app: App,
    events_tx: mpsc::UnboundedSender<AppEvent>,
    mut events_rx: mpsc::UnboundedReceiver<AppEvent>,
) -> Result<()> {
    loop {
        while let Ok(event) = events_rx.try_recv() {
            handle_app_event(&mut app, event);
        }
        app.clamp_cursors();

        // Draw current UI
        terminal.draw(|frame| ui::draw(frame, &app))?;

        // Poll for input (non-blocking, small timeout to keep CPU low)
        if !event::poll(StdDuration::from_millis(50))? {
            tokio::task::yield_now().await;
            continue;
        }
        let CEvent::Key(key) = event::read()? else {
            continue;
        };

        match input::handle_key_event(key, &mut app) {
            Action::Quit => break,
            Action::None => {}
            Action::InputChanged => {
                app.error_message = None;
                let suggestions = Arc::clone(app.service.suggestions());
                let text = app.query_input.clone();
                let tx = events_tx.clone();
                tokio::spawn(async move {
                    if let Some(found) = suggestions.on_input(&text).await {
                        send(&tx, AppEvent::Suggestions(found));
                    }
                });
            }
            Action::Refresh(trigger) => {
                app.error_message = None;
                spawn_trigger(&app, trigger, &events_tx);
            }
            Action::RequestRoute(mode) => {
                let Some(listing) = app.selected_listing() else {
                    app.error_message = Some("No listing selected".into());
                    continue;
                };
                app.error_message = None;
                let coordinator = Arc::clone(app.service.coordinator());
                let tx = events_tx.clone();
                tokio::spawn(async move {
                    let res = coordinator.request_route(&listing.id, mode).await;
                    send(&tx, AppEvent::RouteFinished(res));
                });
            }
        }
    }

    Ok(())
}

fn handle_app_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Suggestions(found) => app.set_suggestions(found),
        AppEvent::TriggerFinished(TriggerOutcome::Deferred) => {
            app.error_message =
                Some("Pick a place first (search with / or press g for your location)".into());
        }
        AppEvent::TriggerFinished(outcome) => debug!(?outcome, "Trigger finished"),
        AppEvent::RouteFinished(Ok(_) | Err(PortError::Aborted)) => {}
        AppEvent::RouteFinished(Err(err)) => {
            app.error_message = Some(format!("Route lookup failed: {err}"));
        }
    }
}

fn spawn_trigger(app: &App, trigger: Trigger, events_tx: &mpsc::UnboundedSender<AppEvent>) {
    let coordinator = Arc::clone(app.service.coordinator());
    let tx = events_tx.clone();
    tokio::spawn(async move {
        let outcome = coordinator.trigger(trigger).await;
        send(&tx, AppEvent::TriggerFinished(outcome));
    });
}

fn send(tx: &mpsc::UnboundedSender<AppEvent>, event: AppEvent) {
    if tx.send(event).is_err() {
        debug!("Event loop gone, dropping background result");
    }
}

/// Log to a file; stdout belongs to the terminal UI.
fn init_logging() -> Result<()> {
    let path = env::var("ROOST_LOG_FILE").unwrap_or_else(|_| "roost.log".to_owned());
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening log file {path}"))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("roost=info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .init();
    Ok(())
}

fn providers(client: &Client) -> Result<ProviderSet> {
    let endpoints: Vec<String> = env::var("ROOST_OVERPASS_ENDPOINTS")
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|endpoint| !endpoint.is_empty())
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default();
    let mirrors = overpass::mirrors(client, &endpoints);

    let geocoder_url =
        env::var("ROOST_NOMINATIM_URL").unwrap_or_else(|_| nominatim::DEFAULT_BASE_URL.to_owned());
    let geocoder = Arc::new(NominatimGeocoder::new(client.clone(), geocoder_url));

    let listings: Arc<dyn ListingPort> = match env::var_os("ROOST_LISTINGS_FILE") {
        Some(path) => Arc::new(FileListings::load(&PathBuf::from(path))?),
        None => {
            info!("ROOST_LISTINGS_FILE not set, running without listings");
            Arc::new(FileListings::empty())
        }
    };

    let mut providers = ProviderSet::new(mirrors, geocoder, listings);
    if let Ok(url) = env::var("ROOST_OSRM_URL") {
        providers = providers.with_router(Arc::new(OsrmRouter::new(client.clone(), url)));
    }
    Ok(providers)
}

fn home_location() -> Result<Option<LatLon>> {
    let (Ok(raw_lat), Ok(raw_lon)) = (env::var("ROOST_HOME_LAT"), env::var("ROOST_HOME_LON"))
    else {
        return Ok(None);
    };
    let lat = raw_lat
        .trim()
        .parse()
        .with_context(|| format!("ROOST_HOME_LAT is not a number: {raw_lat}"))?;
    let lon = raw_lon
        .trim()
        .parse()
        .with_context(|| format!("ROOST_HOME_LON is not a number: {raw_lon}"))?;
    Ok(Some(LatLon::new(lat, lon)))
}
