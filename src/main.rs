use std::time::Duration;

use actix_web::{web, App, HttpServer};
use clap::Parser;
use log::{info, warn, LevelFilter};
use tokio::time::sleep;

use chord_dht::node::chord::ChordNode;
use chord_dht::threads::http;
use chord_dht::threads::maintenance;
use chord_dht::utils::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    simple_logger::SimpleLogger::new()
        .env()
        .with_level(LevelFilter::Info)
        .init()?;

    let node = ChordNode::new(args.address.clone());
    info!("Node {} hashed {} is starting up", node.address(), node.node_id());

    maintenance::spawn_maintenance_tasks(&node);

    if let Some(peer) = args.peer {
        let join_node = node.clone();
        tokio::spawn(async move {
            // let the local listener come up before announcing ourselves
            sleep(Duration::from_millis(500)).await;
            if let Err(error) = join_node.join(&peer).await {
                warn!("startup join via {} failed: {}", peer, error);
            }
        });
    }

    let bind_address = args.address.clone();
    let data = web::Data::new(node);
    HttpServer::new(move || App::new().app_data(data.clone()).configure(http::routes))
        .bind(bind_address)?
        .run()
        .await?;
    Ok(())
}
