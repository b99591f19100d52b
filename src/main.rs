use std::io;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use dotenv::dotenv;

mod config;
mod controllers;
mod db;
mod error;
mod extractors;
mod media;
mod models;
mod routes;
mod services;
mod state;
mod store;

use media::cloudinary::CloudinaryStore;
use services::mail_service::SmtpMailer;
use store::mongo::MongoStore;

fn startup_error(context: &str, e: impl std::fmt::Display) -> io::Error {
    log::error!("{}: {}", context, e);
    io::Error::new(io::ErrorKind::Other, format!("{}: {}", context, e))
}

fn cors(client_origin: Option<&str>) -> Cors {
    let cors = match client_origin {
        Some(origin) => Cors::default().allowed_origin(origin).supports_credentials(),
        None => Cors::default().allow_any_origin(),
    };
    cors.allow_any_method().allow_any_header().max_age(3600)
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    // Load environment variables from .env file (if exists)
    dotenv().ok();
    env_logger::init();

    let config = config::Config::from_env().map_err(|e| startup_error("Invalid configuration", e))?;

    let db_client = db::init_db(&config.mongo_uri)
        .await
        .map_err(|e| startup_error("Failed to connect to MongoDB", e))?;
    let db = db_client.database(&config.mongo_db_name);

    let store = Arc::new(MongoStore::new(&db));
    store
        .ensure_indexes()
        .await
        .map_err(|e| startup_error("Failed to create indexes", e))?;

    let mailer = SmtpMailer::new(&config.smtp).map_err(|e| startup_error("Invalid SMTP settings", e))?;
    let media = CloudinaryStore::new(config.cloudinary.clone());

    let bind = (config.server_host.clone(), config.server_port);
    let client_origin = config.client_origin.clone();
    let app_state = state::AppState {
        users: store.clone(),
        listings: store,
        mailer: Arc::new(mailer),
        media: Arc::new(media),
        config: Arc::new(config),
    };

    log::info!("Listening on {}:{}", bind.0, bind.1);
    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .wrap(cors(client_origin.as_deref()))
            .app_data(web::Data::new(app_state.clone()))
            .configure(routes::init)
    })
    .bind(bind)?
    .run()
    .await
}
