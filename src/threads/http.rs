use actix_web::http::StatusCode;
use actix_web::{get, post, put, web, HttpResponse};
use log::info;
use serde::Deserialize;

use crate::node::chord::{ChordNode, GetOutcome};
use crate::node::messages::{
    ErrorResponse, FindSuccessorRequest, LeaveResponse, NotifyRequest, PeerMsg, PredecessorReply,
    StatusResponse, UpdatePredecessorRequest, UpdateSuccessorRequest,
};
use crate::node::peer::PeerRef;
use crate::utils::types::Address;

/// Everything the peer serves, mounted directly on its bare `host:port`.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(join)
        .service(leave)
        .service(notify)
        .service(find_successor)
        .service(update_successor)
        .service(update_predecessor)
        .service(sim_crash)
        .service(sim_recover)
        .service(node_info)
        .service(predecessor)
        .service(ping)
        .service(get_storage)
        .service(put_storage)
        .default_service(web::route().to(unknown_route));
}

/// A crashed node answers 503 to every verb except `/sim-recover`.
fn crashed_rejection(node: &ChordNode) -> Option<HttpResponse> {
    if node.is_crashed() {
        Some(HttpResponse::ServiceUnavailable().json(ErrorResponse {
            error: "Service Unavailable - Node is crashed".to_string(),
        }))
    } else {
        None
    }
}

fn bad_request(message: &str) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse {
        error: message.to_string(),
    })
}

#[derive(Deserialize)]
struct JoinParams {
    nprime: Option<Address>,
}

#[post("/join")]
async fn join(node: web::Data<ChordNode>, params: web::Query<JoinParams>) -> HttpResponse {
    if let Some(rejection) = crashed_rejection(&node) {
        return rejection;
    }
    let Some(ref bootstrap) = params.nprime else {
        return bad_request("Bad Request - /join requires an nprime parameter");
    };
    info!("Node: {} joining network via {}", node.address(), bootstrap);
    match node.join(bootstrap).await {
        Ok(()) => HttpResponse::Ok().content_type("text/plain").body(format!(
            "Node: {} joined {} network successfully",
            node.address(),
            bootstrap
        )),
        Err(error) => bad_request(&format!("Bad Request - /join {}", error)),
    }
}

#[post("/leave")]
async fn leave(node: web::Data<ChordNode>) -> HttpResponse {
    if let Some(rejection) = crashed_rejection(&node) {
        return rejection;
    }
    if node.has_left() {
        return bad_request("Bad request - Node has already left network");
    }
    info!("Node: {} leaving the network", node.address());
    node.leave().await;
    HttpResponse::Ok().json(LeaveResponse {
        message: format!("Node: {} has left the network", node.address()),
    })
}

#[post("/notify")]
async fn notify(node: web::Data<ChordNode>, body: web::Json<NotifyRequest>) -> HttpResponse {
    if let Some(rejection) = crashed_rejection(&node) {
        return rejection;
    }
    let Some(peer) = body.into_inner().node else {
        return bad_request("Bad Request - /notify Error: Invalid node data");
    };
    node.notify(peer.into());
    HttpResponse::Ok().json(StatusResponse::success())
}

#[post("/find_successor")]
async fn find_successor(
    node: web::Data<ChordNode>,
    body: web::Json<FindSuccessorRequest>,
) -> HttpResponse {
    if let Some(rejection) = crashed_rejection(&node) {
        return rejection;
    }
    let successor = node.find_successor(body.hashed_key).await;
    HttpResponse::Ok().json(PeerMsg::from(&successor))
}

#[post("/update_successor")]
async fn update_successor(
    node: web::Data<ChordNode>,
    body: web::Json<UpdateSuccessorRequest>,
) -> HttpResponse {
    if let Some(rejection) = crashed_rejection(&node) {
        return rejection;
    }
    node.set_successor(PeerRef::new(&body.successor));
    HttpResponse::Ok().json(StatusResponse::success())
}

#[post("/update_predecessor")]
async fn update_predecessor(
    node: web::Data<ChordNode>,
    body: web::Json<UpdatePredecessorRequest>,
) -> HttpResponse {
    if let Some(rejection) = crashed_rejection(&node) {
        return rejection;
    }
    let new_predecessor = body.into_inner().predecessor;
    node.set_predecessor(new_predecessor.map(|address| PeerRef::new(&address)));
    HttpResponse::Ok().json(StatusResponse::success())
}

#[post("/sim-crash")]
async fn sim_crash(node: web::Data<ChordNode>) -> HttpResponse {
    if let Some(rejection) = crashed_rejection(&node) {
        return rejection;
    }
    node.crash();
    HttpResponse::Ok().json(StatusResponse::success_with(format!(
        "Node {} simulated crash.",
        node.address()
    )))
}

#[post("/sim-recover")]
async fn sim_recover(node: web::Data<ChordNode>) -> HttpResponse {
    if !node.is_crashed() {
        return bad_request("Bad Request - Node is not crashed");
    }
    if node.recover().await {
        HttpResponse::Ok().json(StatusResponse::success_with(format!(
            "Node {} recovered from crash.",
            node.address()
        )))
    } else {
        HttpResponse::Ok().json(StatusResponse::failed(format!(
            "Node {} failed to recover via backup and bootstrap.",
            node.address()
        )))
    }
}

#[get("/node-info")]
async fn node_info(node: web::Data<ChordNode>) -> HttpResponse {
    if let Some(rejection) = crashed_rejection(&node) {
        return rejection;
    }
    HttpResponse::Ok().json(node.node_info())
}

#[get("/predecessor")]
async fn predecessor(node: web::Data<ChordNode>) -> HttpResponse {
    if let Some(rejection) = crashed_rejection(&node) {
        return rejection;
    }
    let reply = match node.predecessor() {
        Some(peer) => PredecessorReply {
            node_id: Some(peer.id),
            node_address: Some(peer.address),
        },
        None => PredecessorReply::default(),
    };
    HttpResponse::Ok().json(reply)
}

#[get("/ping")]
async fn ping(node: web::Data<ChordNode>) -> HttpResponse {
    if let Some(rejection) = crashed_rejection(&node) {
        return rejection;
    }
    HttpResponse::Ok().finish()
}

#[get("/storage/{key:.*}")]
async fn get_storage(node: web::Data<ChordNode>, path: web::Path<String>) -> HttpResponse {
    if let Some(rejection) = crashed_rejection(&node) {
        return rejection;
    }
    let key = path.into_inner();
    if key.is_empty() {
        return HttpResponse::NotFound().json(ErrorResponse {
            error: "Not Found - This API doesn't exist".to_string(),
        });
    }
    match node.get(&key).await {
        Ok(GetOutcome::Local(Some(value))) => HttpResponse::Ok()
            .content_type("text/plain; charset=utf-8")
            .body(value),
        Ok(GetOutcome::Local(None)) => HttpResponse::NotFound().json(ErrorResponse {
            error: format!("Not Found - /storage Key: {} not found", key),
        }),
        Ok(GetOutcome::Forwarded(status, body)) => {
            let status =
                StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
            let content_type = if status.is_success() {
                "text/plain; charset=utf-8"
            } else {
                "application/json"
            };
            HttpResponse::build(status).content_type(content_type).body(body)
        }
        Err(error) => HttpResponse::BadGateway().json(ErrorResponse {
            error: error.to_string(),
        }),
    }
}

#[put("/storage/{key:.*}")]
async fn put_storage(
    node: web::Data<ChordNode>,
    path: web::Path<String>,
    body: web::Bytes,
) -> HttpResponse {
    if let Some(rejection) = crashed_rejection(&node) {
        return rejection;
    }
    let key = path.into_inner();
    if key.is_empty() {
        return HttpResponse::NotFound().json(ErrorResponse {
            error: "Not Found - This API doesn't exist".to_string(),
        });
    }
    let Ok(value) = String::from_utf8(body.to_vec()) else {
        return bad_request("Bad Request - /storage value must be UTF-8");
    };
    match node.put(&key, value).await {
        Ok(()) => HttpResponse::Ok().finish(),
        Err(error) => HttpResponse::BadGateway().json(ErrorResponse {
            error: error.to_string(),
        }),
    }
}

async fn unknown_route(node: web::Data<ChordNode>) -> HttpResponse {
    if let Some(rejection) = crashed_rejection(&node) {
        return rejection;
    }
    HttpResponse::NotFound().json(ErrorResponse {
        error: "Not Found - This API doesn't exist".to_string(),
    })
}
