//! Pipeline integration tests against a mock downstream service.
//!
//! Tests verify:
//! - Crop, scale, retina and clamping behavior
//! - Pass-through of non-thumbnail requests and non-image responses
//! - Bad request bodies
//! - HEAD handling without rendering
//! - Temporary file cleanup and concurrent requests

use std::sync::Arc;

use axum::body::Body;
use http::{header, Method, Request, StatusCode};
use tower::{Layer, ServiceExt};

use thumb_streamer::{RenderEngine, ThumbLayer, ThumbOptions, ThumbService};

use super::test_utils::{
    body_bytes, create_test_jpeg, get, image_dimensions, image_format, request, thumbnailer_with,
    CountingEngine, FailingEngine, MockDownstream,
};

fn service(
    options: &ThumbOptions,
    downstream: &MockDownstream,
    engine: Arc<dyn RenderEngine>,
) -> ThumbService<MockDownstream> {
    ThumbLayer::from_thumbnailer(thumbnailer_with(options, engine)).layer(downstream.clone())
}

fn default_service(downstream: &MockDownstream) -> ThumbService<MockDownstream> {
    service(&ThumbOptions::new(), downstream, CountingEngine::new())
}

// =============================================================================
// Rendering
// =============================================================================

#[tokio::test]
async fn test_crop_with_gravity() {
    let downstream = MockDownstream::new().with_standard_fixtures();
    let response = default_service(&downstream)
        .oneshot(get("/media/photo_50x100-sw.jpg"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "image/jpeg"
    );
    assert_eq!(response.headers().get("x-foo").unwrap(), "bar");

    let content_length: usize = response
        .headers()
        .get(header::CONTENT_LENGTH)
        .unwrap()
        .to_str()
        .unwrap()
        .parse()
        .unwrap();

    let body = body_bytes(response).await;
    assert_eq!(body.len(), content_length);
    assert_eq!(image_format(&body), image::ImageFormat::Jpeg);
    assert_eq!(image_dimensions(&body), (50, 100));

    let requests = downstream.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].uri, "/media/photo.jpg");
    assert_eq!(requests[0].method, Method::GET);
}

#[tokio::test]
async fn test_retina_multiplier() {
    let downstream = MockDownstream::new().with_standard_fixtures();
    let response = default_service(&downstream)
        .oneshot(get("/media/photo_50x50@2x.jpg"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(image_dimensions(&body_bytes(response).await), (100, 100));
}

#[tokio::test]
async fn test_dimensions_clamped_to_source() {
    let downstream = MockDownstream::new().with_standard_fixtures();
    let response = default_service(&downstream)
        .oneshot(get("/media/square_1000x1000.png"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "image/png"
    );
    let body = body_bytes(response).await;
    assert_eq!(image_format(&body), image::ImageFormat::Png);
    assert_eq!(image_dimensions(&body), (200, 200));
}

#[tokio::test]
async fn test_width_only_scales() {
    let downstream = MockDownstream::new().with_standard_fixtures();
    let response = default_service(&downstream)
        .oneshot(get("/media/photo_100x.jpg"))
        .await
        .unwrap();

    assert_eq!(image_dimensions(&body_bytes(response).await), (100, 133));
}

#[tokio::test]
async fn test_height_only_scales() {
    let downstream = MockDownstream::new().with_standard_fixtures();
    let response = default_service(&downstream)
        .oneshot(get("/media/photo_x200.jpg"))
        .await
        .unwrap();

    assert_eq!(image_dimensions(&body_bytes(response).await), (150, 200));
}

#[tokio::test]
async fn test_crop_disabled_fits_inside_box() {
    let downstream = MockDownstream::new().with_standard_fixtures();
    let options = ThumbOptions::new().with_crop(false);
    let response = service(&options, &downstream, CountingEngine::new())
        .oneshot(get("/media/photo_50x100.jpg"))
        .await
        .unwrap();

    assert_eq!(image_dimensions(&body_bytes(response).await), (50, 67));
}

#[tokio::test]
async fn test_extensionless_thumbnail_path() {
    let downstream = MockDownstream::new().with_file(
        "/media/raw",
        "image/jpeg",
        create_test_jpeg(300, 300, 90),
    );
    let response = default_service(&downstream)
        .oneshot(get("/media/raw_30x30"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(image_dimensions(&body_bytes(response).await), (30, 30));
    assert_eq!(downstream.requests()[0].uri, "/media/raw");
}

#[tokio::test]
async fn test_file_backed_source() {
    let dir = tempfile::tempdir().unwrap();
    let disk_path = dir.path().join("photo.jpg");
    std::fs::write(&disk_path, create_test_jpeg(400, 400, 90)).unwrap();

    let downstream =
        MockDownstream::new().with_disk_file("/media/photo.jpg", "image/jpeg", &disk_path);
    let response = default_service(&downstream)
        .oneshot(get("/media/photo_40x40.jpg"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(image_dimensions(&body_bytes(response).await), (40, 40));

    // The downstream's own file is read in place and left alone
    assert!(disk_path.exists());
}

#[tokio::test]
async fn test_repeated_requests_are_identical() {
    let downstream = MockDownstream::new().with_standard_fixtures();
    let svc = default_service(&downstream);

    let first = svc.clone().oneshot(get("/media/photo_64x64-ne.jpg")).await.unwrap();
    let second = svc.oneshot(get("/media/photo_64x64-ne.jpg")).await.unwrap();

    assert_eq!(first.status(), second.status());
    assert_eq!(first.headers(), second.headers());
    assert_eq!(body_bytes(first).await, body_bytes(second).await);
}

#[tokio::test]
async fn test_range_headers_not_forwarded() {
    let downstream = MockDownstream::new().with_standard_fixtures();
    let request = Request::builder()
        .uri("/media/photo_50x50.jpg")
        .header(header::RANGE, "bytes=0-99")
        .body(Body::empty())
        .unwrap();

    let response = default_service(&downstream).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!downstream.requests()[0].has_range);
}

#[tokio::test]
async fn test_query_string_forwarded() {
    let downstream = MockDownstream::new().with_standard_fixtures();
    let response = default_service(&downstream)
        .oneshot(get("/media/photo_50x50.jpg?v=2"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(downstream.requests()[0].uri, "/media/photo.jpg?v=2");
}

// =============================================================================
// Pass-through
// =============================================================================

#[tokio::test]
async fn test_missing_source_forwards_downstream_404() {
    let downstream = MockDownstream::new().with_standard_fixtures();
    let response = default_service(&downstream)
        .oneshot(get("/media/missing_50x50.jpg"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.headers().get("x-foo").unwrap(), "bar");
    assert_eq!(body_bytes(response).await, "File not found");
    assert_eq!(downstream.requests()[0].uri, "/media/missing.jpg");
}

#[tokio::test]
async fn test_missing_source_wins_over_bad_dimensions() {
    let downstream = MockDownstream::new().with_standard_fixtures();
    let response = default_service(&downstream)
        .oneshot(get("/media/missing_0x50.jpg"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_non_image_source_forwarded() {
    let downstream = MockDownstream::new().with_standard_fixtures();
    let response = default_service(&downstream)
        .oneshot(get("/media/notes_10x10"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/plain"
    );
    assert_eq!(body_bytes(response).await, "just text");
}

#[tokio::test]
async fn test_non_thumbnail_path_passes_through() {
    let downstream = MockDownstream::new().with_standard_fixtures();
    let engine = CountingEngine::new();
    let response = service(&ThumbOptions::new(), &downstream, engine.clone())
        .oneshot(get("/media/photo.jpg"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(image_dimensions(&body_bytes(response).await), (600, 800));
    assert_eq!(downstream.requests()[0].uri, "/media/photo.jpg");
    assert_eq!(engine.dimension_calls(), 0);
}

#[tokio::test]
async fn test_other_methods_pass_through() {
    let downstream = MockDownstream::new().with_standard_fixtures();
    let svc = default_service(&downstream);

    for method in [Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS] {
        let response = svc
            .clone()
            .oneshot(request(method.clone(), "/media/photo_50x100.jpg"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    let requests = downstream.requests();
    assert_eq!(requests.len(), 4);
    assert!(requests.iter().all(|r| r.uri == "/media/photo_50x100.jpg"));
    assert_eq!(requests[0].method, Method::POST);
}

#[tokio::test]
async fn test_unlisted_url_passes_through() {
    let downstream = MockDownstream::new().with_standard_fixtures();
    let options = ThumbOptions::new().with_urls(["/images"]);
    let response = service(&options, &downstream, CountingEngine::new())
        .oneshot(get("/media/photo_50x50.jpg"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(downstream.requests()[0].uri, "/media/photo_50x50.jpg");
}

#[tokio::test]
async fn test_mount_prefix_is_stripped() {
    let downstream = MockDownstream::new().with_standard_fixtures();
    let options = ThumbOptions::new().with_prefix("/thumbs");
    let response = service(&options, &downstream, CountingEngine::new())
        .oneshot(get("/thumbs/media/photo_20x20.jpg"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(downstream.requests()[0].uri, "/media/photo.jpg");
}

// =============================================================================
// Bad Requests
// =============================================================================

#[tokio::test]
async fn test_leading_zero_is_bad_request() {
    let downstream = MockDownstream::new().with_standard_fixtures();
    let response = default_service(&downstream)
        .oneshot(get("/media/photo_50x050.jpg"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/plain"
    );
    assert_eq!(
        body_bytes(response).await,
        "Bad thumbnail parameters in /media/photo_50x050.jpg\n"
    );
}

#[tokio::test]
async fn test_zero_dimension_is_bad_request() {
    let downstream = MockDownstream::new().with_standard_fixtures();
    let svc = default_service(&downstream);

    for path in ["/media/photo_0x50.jpg", "/media/photo_50x0.jpg", "/media/photo_x0.jpg"] {
        let response = svc.clone().oneshot(get(path)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", path);
    }
}

// =============================================================================
// HEAD
// =============================================================================

#[tokio::test]
async fn test_head_never_renders() {
    let downstream = MockDownstream::new().with_standard_fixtures();
    let engine = CountingEngine::new();
    let response = service(&ThumbOptions::new(), &downstream, engine.clone())
        .oneshot(request(Method::HEAD, "/media/photo_50x100-sw.jpg"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::CONTENT_LENGTH).is_none());
    assert_eq!(response.headers().get("x-foo").unwrap(), "bar");
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "image/jpeg"
    );
    assert!(body_bytes(response).await.is_empty());

    assert_eq!(engine.dimension_calls(), 0);
    assert_eq!(engine.render_calls(), 0);
    assert_eq!(downstream.requests()[0].method, Method::HEAD);
}

#[tokio::test]
async fn test_head_with_bad_dimensions_is_bad_request() {
    let downstream = MockDownstream::new().with_standard_fixtures();
    let response = default_service(&downstream)
        .oneshot(request(Method::HEAD, "/media/photo_050x50.jpg"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// Failures and Resources
// =============================================================================

#[tokio::test]
async fn test_engine_failure_is_server_error() {
    let downstream = MockDownstream::new().with_standard_fixtures();
    let response = service(&ThumbOptions::new(), &downstream, Arc::new(FailingEngine))
        .oneshot(get("/media/photo_50x50.jpg"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_corrupt_image_is_server_error() {
    let downstream =
        MockDownstream::new().with_file("/media/broken.jpg", "image/jpeg", "not really a jpeg");
    let response = default_service(&downstream)
        .oneshot(get("/media/broken_50x50.jpg"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_temp_files_removed() {
    let temp = tempfile::tempdir().unwrap();
    let downstream = MockDownstream::new().with_standard_fixtures();
    let options = ThumbOptions::new().with_temp_dir(temp.path());
    let svc = service(&options, &downstream, CountingEngine::new());

    let response = svc
        .clone()
        .oneshot(get("/media/photo_50x50.jpg"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(std::fs::read_dir(temp.path()).unwrap().next().is_some());

    body_bytes(response).await;
    assert!(std::fs::read_dir(temp.path()).unwrap().next().is_none());

    // Failed renders clean up too
    let svc = service(&options, &downstream, Arc::new(FailingEngine));
    let response = svc.oneshot(get("/media/photo_50x50.jpg")).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(std::fs::read_dir(temp.path()).unwrap().next().is_none());
}

#[tokio::test]
async fn test_concurrent_requests_do_not_interfere() {
    let downstream = MockDownstream::new().with_standard_fixtures();
    let svc = default_service(&downstream);

    let sizes = [(10u32, 20u32), (30, 30), (64, 48), (100, 50), (5, 5), (80, 120)];
    let handles: Vec<_> = sizes
        .iter()
        .map(|&(w, h)| {
            let svc = svc.clone();
            tokio::spawn(async move {
                let path = format!("/media/photo_{}x{}.jpg", w, h);
                let response = svc.oneshot(get(&path)).await.unwrap();
                image_dimensions(&body_bytes(response).await)
            })
        })
        .collect();

    for (handle, expected) in handles.into_iter().zip(sizes) {
        assert_eq!(handle.await.unwrap(), expected);
    }
}
