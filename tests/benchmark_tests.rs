//! Performance benchmarks for the relay hot paths

use axum::extract::ws::Message;
use server::client_manager::ClientId;
use server::relay::Hub;
use shared::classify;
use std::time::Instant;

fn text(body: &str) -> Message {
    Message::Text(body.to_string().into())
}

/// Benchmarks envelope classification
#[test]
fn benchmark_classify() {
    let payload = br#"{"type":"move","x":120.5,"y":-33.25,"id":"6f1c3c0e-0d7b-4a53-9b0e-2f4f3b0a1c9d"}"#;

    let iterations = 100_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let _ = classify(payload);
    }

    let duration = start.elapsed();
    println!(
        "Classify: {} iterations in {:?} ({:.2} ns/iter)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    // Should complete in under 2 seconds even in debug builds
    assert!(duration.as_millis() < 2000);
}

/// Benchmarks broadcast fan-out to many recipients
#[test]
fn benchmark_broadcast_fanout() {
    tokio_test::block_on(async {
        let iterations = 1_000;
        // Nobody reads during the loop, so every queue must hold all frames
        let hub = Hub::with_send_queue(iterations);
        let mut receivers = Vec::new();
        for i in 0..64 {
            let joined = hub
                .join(ClientId::from(format!("c{}", i).as_str()))
                .await
                .unwrap();
            receivers.push(joined.outbound);
        }

        let sender = ClientId::from("c0");
        let message = text(r#"{"type":"move","x":1,"y":2}"#);
        let start = Instant::now();

        for _ in 0..iterations {
            let report = hub.broadcast(&sender, message.clone()).await;
            assert_eq!(report.delivered, 63);
        }

        let duration = start.elapsed();
        println!(
            "Broadcast to 63 recipients: {} iterations in {:?} ({:.2} μs/iter)",
            iterations,
            duration,
            duration.as_micros() as f64 / iterations as f64
        );

        // Every recipient got every frame plus its id message
        for rx in receivers.iter_mut().skip(1) {
            let mut count = 0;
            while rx.try_recv().is_ok() {
                count += 1;
            }
            assert_eq!(count, iterations + 1);
        }

        assert!(duration.as_millis() < 5000);
    });
}

/// Benchmarks join/leave churn with cached state
#[test]
fn benchmark_join_leave_churn() {
    tokio_test::block_on(async {
        let hub = Hub::new();
        let iterations = 5_000;
        let start = Instant::now();

        for _ in 0..iterations {
            let joined = hub.connect().await.unwrap();
            hub.record_state(&joined.client_id, text(r#"{"type":"move"}"#))
                .await;
            hub.disconnect(&joined.client_id).await;
        }

        let duration = start.elapsed();
        println!(
            "Join/leave churn: {} iterations in {:?} ({:.2} μs/iter)",
            iterations,
            duration,
            duration.as_micros() as f64 / iterations as f64
        );

        assert_eq!(hub.client_count().await, 0);
        assert!(duration.as_millis() < 5000);
    });
}
