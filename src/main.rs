use std::sync::Arc;

use actix_web::{App, HttpServer, middleware, web};
use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, warn};

use feedwatch::auth::{TokenIssuer, UserStore};
use feedwatch::cli::Cli;
use feedwatch::config::{Settings, load_settings};
use feedwatch::{AppState, StreamRegistry, probe, routes};

fn load(cli: &Cli) -> Result<Settings> {
    let mut settings = load_settings(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config))?;
    if let Some(host) = &cli.host {
        settings.server.host = host.clone();
    }
    if let Some(port) = cli.port {
        settings.server.port = port;
    }
    if cli.no_probe {
        settings.probe.enabled = false;
    }
    settings.validate()?;
    Ok(settings)
}

#[actix_web::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let settings = match load(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            error!("Configuration error: {:#}", e);
            std::process::exit(1);
        }
    };

    if cli.check_config {
        println!(
            "Configuration OK: {} stream(s), {} user(s), prober {}",
            settings.streams.len(),
            settings.users.len(),
            if settings.probe.enabled { "enabled" } else { "disabled" }
        );
        return Ok(());
    }

    let registry = Arc::new(StreamRegistry::default());
    for stream in settings.streams.iter().cloned() {
        registry.register(stream)?;
    }
    if registry.is_empty() {
        warn!("No streams configured; the dashboard will be empty");
    }

    let users = UserStore::from_settings(&settings.users)?;
    let usernames: Vec<String> = users.profiles().into_iter().map(|u| u.username).collect();
    info!("Users configured: {}", usernames.join(", "));
    let tokens = TokenIssuer::new(&settings.auth.jwt_secret, settings.auth.token_ttl);
    let state = web::Data::new(AppState::new(registry.clone(), users, tokens));

    if settings.probe.enabled {
        let client = probe::build_client(&settings.probe)?;
        tokio::spawn(probe::run_prober(settings.probe.clone(), client, registry.clone()));
    }

    let bind = (settings.server.host.clone(), settings.server.port);
    info!("Backend running on http://{}:{}", bind.0, bind.1);

    let mut server = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(middleware::Logger::default())
            .configure(routes::configure)
    });
    if let Some(workers) = settings.server.workers {
        server = server.workers(workers);
    }
    server.bind(bind)?.run().await?;
    Ok(())
}
