use anyhow::{bail, Context, Result};
use chrono::Utc;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ttms::api::ApiClient;
use ttms::cli::{Cli, Commands};
use ttms::config::TtmsConfig;
use ttms::dashboard::render::render;
use ttms::dashboard::{Dashboard, Event, LecturerFilter, Term, View};
use ttms::server::{create_router, AppState};
use ttms::session::{GuardOutcome, Session, SessionGuard, SqliteStore};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();
    init_tracing(cli.verbose);

    let mut config = TtmsConfig::load(Path::new(&cli.config))?;
    cli.apply_overrides(&mut config);
    config.validate()?;

    let store = SqliteStore::open(Path::new(&config.session.storage_path))
        .with_context(|| format!("opening {}", config.session.storage_path))?;
    let guard = SessionGuard::from_config(Arc::new(store), &config.session)?;
    let client = ApiClient::new(&config.api)?;

    match cli.command {
        Commands::Login {
            login_name,
            session_id,
            full_name,
            role,
        } => {
            let session = Session {
                login_name,
                session_id,
                full_name,
                description: role,
            };
            guard.login(&session, Utc::now())?;
            print_json(&json!({
                "logged_in": session.display_name(),
                "role": session.role(),
            }))
        }
        Commands::Logout => {
            guard.logout()?;
            print_json(&json!({ "logged_out": true }))
        }
        Commands::Status => match guard.current()? {
            Some(session) => match guard.validate(Utc::now()) {
                Ok(_) => print_json(&json!({
                    "valid": true,
                    "login_name": session.login_name,
                    "role": session.role(),
                    "session": session.key().as_str(),
                })),
                Err(e) => print_json(&json!({ "valid": false, "reason": e.to_string() })),
            },
            None => print_json(&json!({ "valid": false, "reason": "no session stored" })),
        },
        Commands::Sessions => {
            let session = require_session(&guard, &config).await?;
            show(&config, client, session, vec![Event::Navigate(View::Sessions)]).await
        }
        Commands::Courses { filter } => {
            let session = require_session(&guard, &config).await?;
            let events = vec![
                Event::FilterCourses(filter.unwrap_or_default()),
                Event::Navigate(View::Courses),
            ];
            show(&config, client, session, events).await
        }
        Commands::Sections { code } => {
            let session = require_session(&guard, &config).await?;
            let view = View::Sections { course_code: code };
            show(&config, client, session, vec![Event::Navigate(view)]).await
        }
        Commands::Lecturers { search } => {
            let session = require_session(&guard, &config).await?;
            let events = vec![
                Event::FilterLecturers(LecturerFilter {
                    search: search.unwrap_or_default(),
                    ..Default::default()
                }),
                Event::Navigate(View::Lecturers),
            ];
            show(&config, client, session, events).await
        }
        Commands::Students { limit, offset } => {
            let session = require_session(&guard, &config).await?;
            let limit = limit.unwrap_or(config.pagination.default_limit);
            let events = vec![
                Event::OpenPage { limit, offset },
                Event::Navigate(View::Students),
            ];
            show(&config, client, session, events).await
        }
        Commands::Serve { .. } => serve(config, client, guard).await,
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "ttms=debug" } else { "ttms=info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Runs the session guard the way the dashboard page would on load.
async fn require_session(guard: &SessionGuard, config: &TtmsConfig) -> Result<Session> {
    match guard.check(Utc::now(), &config.session.site_path()).await? {
        GuardOutcome::Valid(session) => Ok(session),
        GuardOutcome::Redirect { location, reason } => {
            bail!("{} (log in at {})", reason.user_message(), location)
        }
    }
}

async fn show(
    config: &TtmsConfig,
    client: ApiClient,
    session: Session,
    events: Vec<Event>,
) -> Result<()> {
    let mut dashboard = Dashboard::new(
        client,
        session,
        Term::new(&config.term.sesi, &config.term.semester),
        &config.pagination,
        config.roster.clone(),
    );

    let role = dashboard.session().role();
    for event in events {
        if let Event::Navigate(view) = &event {
            if !view.allowed_for(role) {
                bail!("The {} view is not available to this role", view.name());
            }
        }
        dashboard.dispatch(event).await;
    }

    let state = dashboard.state();
    if let Some(notice) = &state.notice {
        warn!("{}", notice);
    }
    print_json(&render(state))?;
    if state.reauth_required {
        bail!("The service rejected the session; log in again");
    }
    Ok(())
}

async fn serve(config: TtmsConfig, client: ApiClient, guard: SessionGuard) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.address, config.server.port)
        .parse()
        .context("invalid server address")?;

    let state = Arc::new(AppState::new(config, client, guard));
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Dashboard service listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Dashboard service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    debug!("Shutdown signal received");
}
