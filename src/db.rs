use std::time::Duration;

use mongodb::error::Error;
use mongodb::{options::ClientOptions, Client};

pub async fn init_db(uri: &str) -> Result<Client, Error> {
    let mut client_options = ClientOptions::parse(uri).await?;
    client_options.app_name = Some("roomfinder".to_string());
    client_options.server_selection_timeout = Some(Duration::from_secs(10));
    Client::with_options(client_options)
}
