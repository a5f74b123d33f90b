// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;

#[tokio::test]
async fn gate_serializes_in_submission_order() {
    let gate = MutationGate::new();
    let order = Arc::new(parking_lot::Mutex::new(Vec::new()));

    // Hold the gate so all submissions queue behind it
    let held = gate.acquire().await;

    let mut handles = Vec::new();
    for n in 0..5 {
        let gate = gate.clone();
        let order = Arc::clone(&order);
        handles.push(tokio::spawn(async move {
            let _guard = gate.acquire().await;
            order.lock().push(n);
        }));
        // Give each task time to reach the queue so FIFO order is the
        // submission order
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    drop(held);
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(*order.lock(), vec![0, 1, 2, 3, 4]);
}

#[tokio::test]
async fn gate_admits_one_holder_at_a_time() {
    let gate = MutationGate::new();
    let _held = gate.acquire().await;

    let gate2 = gate.clone();
    let second = tokio::spawn(async move {
        let _g = gate2.acquire().await;
    });
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!second.is_finished());

    drop(_held);
    second.await.unwrap();
}
