//! Concurrent request behavior against one shared session
//!
//! Every request uploads a distinct solid color; the mock backend derives
//! the mask from the red channel, so any cross-request buffer mixing would
//! show up as a response whose alpha does not match its own upload.

mod common;

use axum::http::StatusCode;
use common::{body_bytes, multipart_request, png_fixture, test_config, test_router, RedChannelMask};
use std::sync::Arc;
use tower::ServiceExt;

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn fifty_concurrent_requests_complete_independently() {
    let router = test_router(Arc::new(RedChannelMask), test_config());

    let mut handles = Vec::new();
    for i in 0..50u32 {
        let router = router.clone();
        handles.push(tokio::spawn(async move {
            let red = (i * 5) as u8;
            let upload = png_fixture(16, 16, [red, 10, 20, 255]);

            let response = router
                .oneshot(multipart_request("image", Some("photo.png"), &upload))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);

            let png = body_bytes(response).await;
            let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
            assert_eq!(decoded.dimensions(), (16, 16));

            // Each response must carry exactly its own upload's mask.
            for pixel in decoded.pixels() {
                assert_eq!(pixel[0], red);
                assert_eq!(pixel[3], red);
            }
            red
        }));
    }

    let mut seen = Vec::new();
    for handle in handles {
        seen.push(handle.await.unwrap());
    }
    assert_eq!(seen.len(), 50);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_mixed_success_and_failure() {
    let router = test_router(Arc::new(RedChannelMask), test_config());

    let mut handles = Vec::new();
    for i in 0..20u32 {
        let router = router.clone();
        handles.push(tokio::spawn(async move {
            if i % 2 == 0 {
                let upload = png_fixture(8, 8, [50, 0, 0, 255]);
                let response = router
                    .oneshot(multipart_request("image", Some("ok.png"), &upload))
                    .await
                    .unwrap();
                assert_eq!(response.status(), StatusCode::OK);
            } else {
                let response = router
                    .oneshot(multipart_request("image", Some("bad.png"), b"garbage"))
                    .await
                    .unwrap();
                assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            }
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }
}
