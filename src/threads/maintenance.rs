use std::time::Duration;

use log::info;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::node::chord::ChordNode;
use crate::utils::constants::{
    CHECK_PREDECESSOR_SLEEP_MILLIS, FIX_FINGERS_SLEEP_MILLIS, STABILIZE_SLEEP_MILLIS,
};

/// Spawn the three periodic maintenance loops. Each loop sleeps its fixed
/// interval and skips its body entirely while the node is crashed, so a
/// recovered node resumes cleanly on the next tick.
pub fn spawn_maintenance_tasks(node: &ChordNode) -> Vec<JoinHandle<()>> {
    let mut handles = Vec::new();

    info!("Starting up periodic stabilize task");
    let stabilize_node = node.clone();
    handles.push(tokio::spawn(async move {
        loop {
            sleep(Duration::from_millis(STABILIZE_SLEEP_MILLIS)).await;
            if stabilize_node.is_crashed() {
                continue;
            }
            stabilize_node.stabilize().await;
        }
    }));

    info!("Starting up periodic fix_fingers task");
    let fix_fingers_node = node.clone();
    handles.push(tokio::spawn(async move {
        loop {
            sleep(Duration::from_millis(FIX_FINGERS_SLEEP_MILLIS)).await;
            if fix_fingers_node.is_crashed() {
                continue;
            }
            fix_fingers_node.fix_fingers().await;
        }
    }));

    info!("Starting up periodic check_predecessor task");
    let check_predecessor_node = node.clone();
    handles.push(tokio::spawn(async move {
        loop {
            sleep(Duration::from_millis(CHECK_PREDECESSOR_SLEEP_MILLIS)).await;
            if check_predecessor_node.is_crashed() {
                continue;
            }
            check_predecessor_node.check_predecessor().await;
        }
    }));

    handles
}
