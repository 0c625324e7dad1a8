//! Multi-node scenarios over real loopback listeners. Maintenance passes are
//! driven explicitly so the tests stay deterministic.

use std::time::Duration;

use actix_web::{web, App, HttpServer};
use tokio::time::sleep;

use chord_dht::node::chord::{ChordNode, GetOutcome};
use chord_dht::node::messages::NodeInfo;
use chord_dht::threads::http;

async fn spawn_node(address: &str) -> ChordNode {
    let node = ChordNode::new(address.to_string());
    let data = web::Data::new(node.clone());
    let server = HttpServer::new(move || App::new().app_data(data.clone()).configure(http::routes))
        .workers(1)
        .bind(address)
        .unwrap()
        .run();
    tokio::spawn(server);
    sleep(Duration::from_millis(200)).await;
    node
}

async fn node_info_of(address: &str) -> NodeInfo {
    reqwest::get(format!("http://{}/node-info", address))
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn two_nodes_form_a_closed_ring() {
    // SHA1 mod 2^16: 127.0.0.1:18301 -> 4089, 127.0.0.1:18302 -> 10568
    let a = spawn_node("127.0.0.1:18301").await;
    let b = spawn_node("127.0.0.1:18302").await;

    b.join(&"127.0.0.1:18301".to_string()).await.unwrap();
    a.stabilize().await;
    b.stabilize().await;

    let info_a = node_info_of("127.0.0.1:18301").await;
    let info_b = node_info_of("127.0.0.1:18302").await;
    assert_eq!(info_a.successor, "127.0.0.1:18302");
    assert_eq!(info_a.predecessor.as_deref(), Some("127.0.0.1:18302"));
    assert_eq!(info_b.successor, "127.0.0.1:18301");
    assert_eq!(info_b.predecessor.as_deref(), Some("127.0.0.1:18301"));

    // the hash of the joining node's address shows up unchanged
    assert_eq!(info_a.node_hash, 4089);
    assert_eq!(info_b.node_hash, 10568);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn storage_requests_forward_to_the_owner() {
    // 127.0.0.1:18311 -> 44057, 127.0.0.1:18312 -> 31508
    let a = spawn_node("127.0.0.1:18311").await;
    let b = spawn_node("127.0.0.1:18312").await;
    b.join(&"127.0.0.1:18311".to_string()).await.unwrap();
    a.stabilize().await;
    b.stabilize().await;

    let client = reqwest::Client::new();

    // "song" hashes to 43167 and belongs to :18311; writing through the
    // other peer must forward one hop
    let response = client
        .put("http://127.0.0.1:18312/storage/song")
        .body("cat")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    for address in ["127.0.0.1:18311", "127.0.0.1:18312"] {
        let got = client
            .get(format!("http://{}/storage/song", address))
            .send()
            .await
            .unwrap();
        assert_eq!(got.status().as_u16(), 200);
        assert_eq!(got.text().await.unwrap(), "cat");
    }

    // the value lives on the owner only
    match a.get("song").await.unwrap() {
        GetOutcome::Local(Some(value)) => assert_eq!(value, "cat"),
        other => panic!("owner should answer locally, got {:?}", other),
    }
    match b.get("song").await.unwrap() {
        GetOutcome::Forwarded(200, value) => assert_eq!(value, "cat"),
        other => panic!("non-owner should forward, got {:?}", other),
    }

    // "k1" hashes to 27461 and belongs to :18312; the opposite direction
    let response = client
        .put("http://127.0.0.1:18311/storage/k1")
        .body("dog")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    for address in ["127.0.0.1:18311", "127.0.0.1:18312"] {
        let got = client
            .get(format!("http://{}/storage/k1", address))
            .send()
            .await
            .unwrap();
        assert_eq!(got.text().await.unwrap(), "dog");
    }

    // "missing" (34541) belongs to :18311 and was never stored; the owner's
    // 404 passes through the forwarder verbatim
    let got = client
        .get("http://127.0.0.1:18312/storage/missing")
        .send()
        .await
        .unwrap();
    assert_eq!(got.status().as_u16(), 404);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn graceful_leave_hands_the_neighbors_over() {
    // 127.0.0.1:18321 -> 58228, 127.0.0.1:18322 -> 38366
    let a = spawn_node("127.0.0.1:18321").await;
    let b = spawn_node("127.0.0.1:18322").await;
    b.join(&"127.0.0.1:18321".to_string()).await.unwrap();
    a.stabilize().await;
    b.stabilize().await;

    let client = reqwest::Client::new();
    let response = client
        .post("http://127.0.0.1:18322/leave")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    // the survivor closes the ring on itself
    let info_a = node_info_of("127.0.0.1:18321").await;
    assert_eq!(info_a.successor, "127.0.0.1:18321");
    assert_eq!(info_a.predecessor.as_deref(), Some("127.0.0.1:18321"));

    // the departed node is a loner and refuses a second leave
    let info_b = node_info_of("127.0.0.1:18322").await;
    assert_eq!(info_b.successor, "127.0.0.1:18322");
    assert_eq!(info_b.predecessor, None);
    let again = client
        .post("http://127.0.0.1:18322/leave")
        .send()
        .await
        .unwrap();
    assert_eq!(again.status().as_u16(), 400);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn crashed_node_recovers_through_its_bootstrap() {
    // 127.0.0.1:18331 -> 30879, 127.0.0.1:18332 -> 52753
    let a = spawn_node("127.0.0.1:18331").await;
    let b = spawn_node("127.0.0.1:18332").await;
    b.join(&"127.0.0.1:18331".to_string()).await.unwrap();
    a.stabilize().await;
    b.stabilize().await;

    let client = reqwest::Client::new();
    let response = client
        .post("http://127.0.0.1:18332/sim-crash")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let crashed_info = client
        .get("http://127.0.0.1:18332/node-info")
        .send()
        .await
        .unwrap();
    assert_eq!(crashed_info.status().as_u16(), 503);

    // the survivor notices the crash through its own probes
    a.check_predecessor().await;
    a.stabilize().await;
    let info_a = node_info_of("127.0.0.1:18331").await;
    assert_eq!(info_a.successor, "127.0.0.1:18331");
    assert_eq!(info_a.predecessor, None);

    // recovery re-joins through the remembered bootstrap
    let response = client
        .post("http://127.0.0.1:18332/sim-recover")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "success");

    a.stabilize().await;
    b.stabilize().await;
    let info_a = node_info_of("127.0.0.1:18331").await;
    let info_b = node_info_of("127.0.0.1:18332").await;
    assert_eq!(info_a.successor, "127.0.0.1:18332");
    assert_eq!(info_b.successor, "127.0.0.1:18331");
    assert_eq!(info_b.predecessor.as_deref(), Some("127.0.0.1:18331"));
    assert_eq!(info_a.predecessor.as_deref(), Some("127.0.0.1:18332"));
}
