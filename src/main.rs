use axum_server::tls_rustls::RustlsConfig;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::app::{AppState, create_app, create_weather_source};
use crate::config::{ConfigError, read_settings};
use crate::database::{SqliteDatabaseError, create_sqlite_database_on_disk};
use crate::models::dashboard::DashboardCollection;
use crate::weather::WeatherError;

mod app;
mod chart;
mod config;
mod database;
mod error;
mod models;
mod routes;
mod view;
mod weather;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, env = "KEY_FILE_PATH")]
    key_file_path: Option<String>,

    #[arg(short, long, env = "CERT_FILE_PATH")]
    cert_file_path: Option<String>,

    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    port: u16,

    #[arg(short, long, env = "DATABASE_PATH", default_value = "database.sqlite3")]
    database: PathBuf,

    #[arg(long, env = "WEATHERDASH_CONFIG", default_value = "weatherdash.toml")]
    config: PathBuf,
}

#[derive(Debug, Error)]
enum StartupError {
    #[error(transparent)]
    Database(#[from] SqliteDatabaseError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Failed to create weather client: {0}")]
    Weather(#[from] WeatherError),
    #[error("Key file given without a cert file")]
    MissingCertFile,
    #[error("Server failed: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let args = Args::parse();
    if let Err(err) = run(args).await {
        log::error!("{err}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), StartupError> {
    let settings = read_settings(&args.config)?;
    let connection = create_sqlite_database_on_disk(&args.database)?;
    let weather = create_weather_source(&settings.weather)?;

    let state = AppState {
        database_connection: Arc::new(Mutex::new(connection)),
        dashboards: DashboardCollection::default(),
        weather,
        settings: Arc::new(settings),
    };
    let app = create_app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    log::info!("listening on {}", addr);
    if let Some(key_file_path) = args.key_file_path {
        let cert_file_path = args.cert_file_path.ok_or(StartupError::MissingCertFile)?;
        log::info!(
            "using tls with key file {} and cert file {}",
            key_file_path,
            cert_file_path
        );
        let tls = RustlsConfig::from_pem_file(cert_file_path, key_file_path).await?;
        axum_server::bind_rustls(addr, tls)
            .serve(app.into_make_service())
            .await?;
    } else {
        axum_server::bind(addr)
            .serve(app.into_make_service())
            .await?;
    }
    Ok(())
}
