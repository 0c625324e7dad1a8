use std::env;
use std::process::exit;
use std::time::Duration;

use reqwest::Client;

use chord_dht::node::messages::NodeInfo;

/// Queries `/node-info` on every given peer and verifies that the answers
/// form one closed ring: sorted by hash, each node's successor must be the
/// next node and each node's predecessor the previous one. Every address a
/// node references must also answer its health probe.
#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() == 1 {
        panic!("Provide at least one node address")
    }

    let client = Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .expect("static client configuration");

    let mut infos: Vec<NodeInfo> = Vec::new();
    for address in args.iter().skip(1) {
        let info = client
            .get(format!("http://{}/node-info", address))
            .send()
            .await
            .unwrap()
            .json::<NodeInfo>()
            .await
            .unwrap();
        infos.push(info);
    }

    infos.sort_by_key(|info| info.node_hash);

    let mut is_valid = true;

    for i in 0..infos.len() {
        let current = &infos[i];
        let next = &infos[(i + 1) % infos.len()];
        if current.successor != next.node_address {
            eprintln!(
                "Node ({}, {}): wrong successor {} (expected {})",
                current.node_hash, current.node_address, current.successor, next.node_address
            );
            is_valid = false;
        }
        match next.predecessor {
            Some(ref predecessor) if *predecessor == current.node_address => {}
            _ => {
                eprintln!(
                    "Node ({}, {}): wrong predecessor {:?} (expected {})",
                    next.node_hash, next.node_address, next.predecessor, current.node_address
                );
                is_valid = false;
            }
        }
    }

    for info in &infos {
        for other in &info.others {
            let alive = match client.get(format!("http://{}/ping", other)).send().await {
                Ok(response) => response.status().is_success(),
                Err(_) => false,
            };
            if !alive {
                eprintln!(
                    "Node ({}, {}): references dead peer {}",
                    info.node_hash, info.node_address, other
                );
                is_valid = false;
            }
        }
    }

    if is_valid {
        eprintln!("Looks good!")
    } else {
        eprintln!("Cluster is invalid!");
        exit(1)
    }
}
