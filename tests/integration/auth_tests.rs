//! Signed URL integration tests.
//!
//! Tests verify:
//! - Valid signatures render
//! - Wrong signatures produce 400 with the standard body
//! - Unsigned URLs are not treated as thumbnails in signed mode
//! - Retina multipliers and mount prefixes are outside the signed tuple

use http::StatusCode;
use sha1::{Digest, Sha1};
use tower::{Layer, ServiceExt};

use thumb_streamer::{DigestAlgorithm, ThumbLayer, ThumbOptions, ThumbService, ThumbSigner};

use super::test_utils::{
    body_bytes, get, image_dimensions, thumbnailer_with, CountingEngine, MockDownstream,
};

fn signed_service(options: ThumbOptions, downstream: &MockDownstream) -> ThumbService<MockDownstream> {
    ThumbLayer::from_thumbnailer(thumbnailer_with(&options, CountingEngine::new()))
        .layer(downstream.clone())
}

/// First 16 hex characters of SHA-1 over the signed tuple and secret.
fn reference_signature(message: &str) -> String {
    hex::encode(Sha1::digest(message.as_bytes()))[..16].to_string()
}

#[tokio::test]
async fn test_valid_signature_renders() {
    let downstream = MockDownstream::new().with_standard_fixtures();
    let svc = signed_service(ThumbOptions::new().with_signing("test", 16), &downstream);

    let sig = reference_signature("/media/photo_50x100-sw.jpgtest");
    let response = svc
        .oneshot(get(&format!("/media/photo_50x100-sw-{}.jpg", sig)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(image_dimensions(&body_bytes(response).await), (50, 100));
    assert_eq!(downstream.requests()[0].uri, "/media/photo.jpg");
}

#[tokio::test]
async fn test_wrong_signature_is_bad_request() {
    let downstream = MockDownstream::new().with_standard_fixtures();
    let svc = signed_service(ThumbOptions::new().with_signing("test", 16), &downstream);

    let path = "/media/photo_50x100-sw-0123456789abcdef.jpg";
    let response = svc.oneshot(get(path)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_bytes(response).await,
        format!("Bad thumbnail parameters in {}\n", path)
    );
    // Rejected before the source is fetched
    assert!(downstream.requests().is_empty());
}

#[tokio::test]
async fn test_signature_bound_to_every_field() {
    let downstream = MockDownstream::new().with_standard_fixtures();
    let svc = signed_service(ThumbOptions::new().with_signing("test", 16), &downstream);
    let sig = reference_signature("/media/photo_50x100-sw.jpgtest");

    for path in [
        format!("/media/photo_50x101-sw-{}.jpg", sig),
        format!("/media/photo_50x100-se-{}.jpg", sig),
        format!("/media/photo_50x100-{}.jpg", sig),
        format!("/media/photo_50x100-sw-{}.png", sig),
        format!("/media/photp_50x100-sw-{}.jpg", sig),
    ] {
        let response = svc.clone().oneshot(get(&path)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", path);
    }
}

#[tokio::test]
async fn test_unsigned_url_passes_through_in_signed_mode() {
    let downstream = MockDownstream::new().with_standard_fixtures();
    let svc = signed_service(ThumbOptions::new().with_signing("test", 16), &downstream);

    let response = svc.oneshot(get("/media/photo_50x100-sw.jpg")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(downstream.requests()[0].uri, "/media/photo_50x100-sw.jpg");
}

#[tokio::test]
async fn test_retina_not_part_of_signature() {
    let downstream = MockDownstream::new().with_standard_fixtures();
    let svc = signed_service(ThumbOptions::new().with_signing("test", 16), &downstream);

    let sig = reference_signature("/media/photo_50x50.jpgtest");
    let response = svc
        .oneshot(get(&format!("/media/photo_50x50-{}@2x.jpg", sig)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(image_dimensions(&body_bytes(response).await), (100, 100));
}

#[tokio::test]
async fn test_signed_path_with_mount_prefix() {
    let downstream = MockDownstream::new().with_standard_fixtures();
    let options = ThumbOptions::new()
        .with_prefix("/thumbs")
        .with_signing("test", 16);
    let svc = signed_service(options, &downstream);

    let signer = ThumbSigner::new("test", 16, DigestAlgorithm::Sha1);
    let signed = signer.sign_path("/media/photo_40x40-c.jpg").unwrap();
    let response = svc
        .oneshot(get(&format!("/thumbs{}", signed)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(image_dimensions(&body_bytes(response).await), (40, 40));
}

#[tokio::test]
async fn test_sha256_signatures() {
    let downstream = MockDownstream::new().with_standard_fixtures();
    let options = ThumbOptions::new()
        .with_signing("test", 32)
        .with_digest(DigestAlgorithm::Sha256);
    let svc = signed_service(options, &downstream);

    let sha256 = ThumbSigner::new("test", 32, DigestAlgorithm::Sha256);
    let signed = sha256.sign_path("/media/square_20x20.png").unwrap();
    let response = svc.clone().oneshot(get(&signed)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // A SHA-1 signature of the same length is rejected
    let sha1 = ThumbSigner::new("test", 32, DigestAlgorithm::Sha1);
    let signed = sha1.sign_path("/media/square_20x20.png").unwrap();
    let response = svc.oneshot(get(&signed)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_signature_length_must_match() {
    let downstream = MockDownstream::new().with_standard_fixtures();
    let svc = signed_service(ThumbOptions::new().with_signing("test", 16), &downstream);

    let sig = hex::encode(Sha1::digest(b"/media/photo_50x100.jpgtest"));
    let response = svc
        .oneshot(get(&format!("/media/photo_50x100-{}.jpg", &sig[..20])))
        .await
        .unwrap();

    // Twenty hex characters do not fit the grammar, so the path is not a thumbnail
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
