//! Integration tests for the sync protocol: diff, upload, finalize,
//! review gating and authorized download.

mod common;

use axum::http::StatusCode;
use common::TestServer;
use common::fixtures::{build_manifest, manifest_hashes, test_build_tree};
use common::server::{get_bytes, json_request, upload_chunk_request};
use depot_core::hash::ContentHash;
use depot_core::manifest::Manifest;
use depot_core::token::Role;
use depot_metadata::repos::{AppRepo, BuildRepo, ChunkRepo, ManifestRepo, SubmissionRepo};
use serde_json::{Value, json};

/// Create an app + draft build for the publisher, returning (app_id, build_id).
async fn setup_build(
    server: &TestServer,
    publisher: &str,
    slug: &str,
    version: &str,
) -> (i64, i64) {
    let (status, created) = json_request(
        &server.router,
        "POST",
        "/v1/apps",
        Some(json!({ "slug": slug, "title": "Test App" })),
        Some(publisher),
    )
    .await;
    let app_id = match status {
        StatusCode::CREATED => created["id"].as_i64().unwrap(),
        // App already exists from an earlier version in the same test.
        StatusCode::CONFLICT => {
            server
                .metadata()
                .get_app_by_slug(slug)
                .await
                .unwrap()
                .unwrap()
                .app_id
        }
        other => panic!("unexpected status creating app: {other}"),
    };

    let (status, created) = json_request(
        &server.router,
        "POST",
        "/v1/builds",
        Some(json!({
            "app_id": app_id,
            "version": version,
            "platform": "linux",
            "channel": "stable"
        })),
        Some(publisher),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    (app_id, created["id"].as_i64().unwrap())
}

/// Run the full upload flow for a manifest: diff, upload missing, finalize.
async fn publish(
    server: &TestServer,
    publisher: &str,
    build_id: i64,
    manifest: &Manifest,
    chunks: &std::collections::HashMap<String, Vec<u8>>,
) -> Value {
    let hashes = manifest_hashes(manifest);
    let (status, diff) = json_request(
        &server.router,
        "POST",
        &format!("/v1/builds/{build_id}/missing-chunks"),
        Some(json!({ "hashes": hashes })),
        Some(publisher),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    for hash in diff["missing"].as_array().unwrap() {
        let hash = hash.as_str().unwrap();
        let data = &chunks[hash];
        let (status, _) = upload_chunk_request(&server.router, hash, data, publisher).await;
        assert_eq!(status, StatusCode::OK, "upload of {hash}");
    }

    let (status, finalized) = json_request(
        &server.router,
        "POST",
        &format!("/v1/builds/{build_id}/finalize"),
        Some(serde_json::to_value(manifest).unwrap()),
        Some(publisher),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "finalize: {finalized}");
    finalized
}

#[tokio::test]
async fn test_upload_roundtrip_and_dedup() {
    let server = TestServer::new().await;
    let (_, publisher) = server.create_user("pub@example.com", Role::Publisher).await;

    let tree = test_build_tree();
    let (manifest, chunks) = build_manifest(&tree, "my-game", "1.0.0", "linux", "stable");
    let (_, build_id) = setup_build(&server, &publisher, "my-game", "1.0.0").await;

    // Diff before any upload returns every hash, idempotently.
    let hashes = manifest_hashes(&manifest);
    for _ in 0..2 {
        let (status, diff) = json_request(
            &server.router,
            "POST",
            &format!("/v1/builds/{build_id}/missing-chunks"),
            Some(json!({ "hashes": hashes })),
            Some(&publisher),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(diff["missing"].as_array().unwrap().len(), hashes.len());
    }

    let finalized = publish(&server, &publisher, build_id, &manifest, &chunks).await;
    assert!(finalized["manifest_url"].as_str().unwrap().contains("my-game"));

    // Every chunk stored exactly once, refcount 1.
    for hash in &hashes {
        let row = server.metadata().get_chunk(hash).await.unwrap().unwrap();
        assert_eq!(row.refcount, 1, "chunk {hash}");
    }

    // Submission opened in pending state.
    let submission_id = finalized["submission_id"].as_i64().unwrap();
    let submission = server
        .metadata()
        .get_submission(submission_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(submission.status, "pending");

    // Re-uploading an existing chunk does not duplicate bytes, it bumps the
    // reference count.
    let first_hash = &hashes[0];
    let (status, _) =
        upload_chunk_request(&server.router, first_hash, &chunks[first_hash], &publisher).await;
    assert_eq!(status, StatusCode::OK);
    let row = server.metadata().get_chunk(first_hash).await.unwrap().unwrap();
    assert_eq!(row.refcount, 2);
}

#[tokio::test]
async fn test_chunk_upload_hash_mismatch_rejected() {
    let server = TestServer::new().await;
    let (_, publisher) = server.create_user("pub@example.com", Role::Publisher).await;

    let claimed = ContentHash::compute(b"the real bytes").to_hex();
    let (status, body) =
        upload_chunk_request(&server.router, &claimed, b"different bytes", &publisher).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body.get("code").and_then(|v| v.as_str()),
        Some("hash_mismatch")
    );

    // Nothing stored under the claimed hash.
    assert!(!server.metadata().chunk_exists(&claimed).await.unwrap());
}

#[tokio::test]
async fn test_finalize_rejects_missing_chunks_and_bad_manifests() {
    let server = TestServer::new().await;
    let (_, publisher) = server.create_user("pub@example.com", Role::Publisher).await;

    let tree = test_build_tree();
    let (manifest, chunks) = build_manifest(&tree, "my-game", "1.0.0", "linux", "stable");
    let (_, build_id) = setup_build(&server, &publisher, "my-game", "1.0.0").await;

    // Finalize before any chunk upload: every referenced chunk is absent.
    let (status, body) = json_request(
        &server.router,
        "POST",
        &format!("/v1/builds/{build_id}/finalize"),
        Some(serde_json::to_value(&manifest).unwrap()),
        Some(&publisher),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body.get("code").and_then(|v| v.as_str()),
        Some("validation_error")
    );

    // Build must remain draft; no submission or manifest row appears.
    let build = server.metadata().get_build(build_id).await.unwrap().unwrap();
    assert_eq!(build.status, "draft");
    assert!(server.metadata().get_manifest(build_id).await.unwrap().is_none());

    // Traversal path is rejected even with all chunks present.
    for hash in manifest_hashes(&manifest) {
        upload_chunk_request(&server.router, &hash, &chunks[&hash], &publisher).await;
    }
    let mut bad = manifest.clone();
    bad.files[0].path = "../../etc/passwd".to_string();
    let (status, body) = json_request(
        &server.router,
        "POST",
        &format!("/v1/builds/{build_id}/finalize"),
        Some(serde_json::to_value(&bad).unwrap()),
        Some(&publisher),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body.get("code").and_then(|v| v.as_str()),
        Some("validation_error")
    );

    // Wrong coordinates are rejected.
    let mut wrong = manifest.clone();
    wrong.version = "9.9.9".to_string();
    let (status, _) = json_request(
        &server.router,
        "POST",
        &format!("/v1/builds/{build_id}/finalize"),
        Some(serde_json::to_value(&wrong).unwrap()),
        Some(&publisher),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // A correct finalize succeeds; a second one conflicts.
    let (status, _) = json_request(
        &server.router,
        "POST",
        &format!("/v1/builds/{build_id}/finalize"),
        Some(serde_json::to_value(&manifest).unwrap()),
        Some(&publisher),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = json_request(
        &server.router,
        "POST",
        &format!("/v1/builds/{build_id}/finalize"),
        Some(serde_json::to_value(&manifest).unwrap()),
        Some(&publisher),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body.get("code").and_then(|v| v.as_str()), Some("conflict"));
}

#[tokio::test]
async fn test_incremental_second_version_shares_chunks() {
    let server = TestServer::new().await;
    let (_, publisher) = server.create_user("pub@example.com", Role::Publisher).await;

    let tree_v1 = test_build_tree();
    let (manifest_v1, chunks_v1) = build_manifest(&tree_v1, "my-game", "1.0.0", "linux", "stable");
    let (_, build_v1) = setup_build(&server, &publisher, "my-game", "1.0.0").await;
    publish(&server, &publisher, build_v1, &manifest_v1, &chunks_v1).await;

    // Version 1.0.1 changes one file; the others share chunks with 1.0.0.
    let mut tree_v2 = test_build_tree();
    tree_v2[2].1 = b"a brand new readme with different content\n".to_vec();
    let (manifest_v2, chunks_v2) = build_manifest(&tree_v2, "my-game", "1.0.1", "linux", "stable");
    let (_, build_v2) = setup_build(&server, &publisher, "my-game", "1.0.1").await;

    let v1_hashes: std::collections::HashSet<_> =
        manifest_hashes(&manifest_v1).into_iter().collect();
    let v2_hashes = manifest_hashes(&manifest_v2);
    let expected_new: Vec<_> = v2_hashes
        .iter()
        .filter(|h| !v1_hashes.contains(*h))
        .cloned()
        .collect();
    assert!(!expected_new.is_empty());
    assert!(expected_new.len() < v2_hashes.len());

    // The diff returns exactly the new hashes.
    let (status, diff) = json_request(
        &server.router,
        "POST",
        &format!("/v1/builds/{build_v2}/missing-chunks"),
        Some(json!({ "hashes": v2_hashes })),
        Some(&publisher),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let missing: Vec<String> = diff["missing"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect();
    assert_eq!(missing, expected_new);

    publish(&server, &publisher, build_v2, &manifest_v2, &chunks_v2).await;

    // Shared chunks were never re-uploaded: still refcount 1.
    for hash in v2_hashes.iter().filter(|h| v1_hashes.contains(*h)) {
        let row = server.metadata().get_chunk(hash).await.unwrap().unwrap();
        assert_eq!(row.refcount, 1, "shared chunk {hash}");
    }
    for hash in &expected_new {
        let row = server.metadata().get_chunk(hash).await.unwrap().unwrap();
        assert_eq!(row.refcount, 1, "new chunk {hash}");
    }
}

#[tokio::test]
async fn test_review_gating_and_authorized_download() {
    let server = TestServer::new().await;
    let (_, publisher) = server.create_user("pub@example.com", Role::Publisher).await;
    let (_, admin) = server.create_user("admin@example.com", Role::Admin).await;
    let (_, buyer) = server.create_user("buyer@example.com", Role::User).await;

    let tree = test_build_tree();
    let (manifest, chunks) = build_manifest(&tree, "my-game", "1.0.0", "linux", "stable");
    let (app_id, build_id) = setup_build(&server, &publisher, "my-game", "1.0.0").await;
    let finalized = publish(&server, &publisher, build_id, &manifest, &chunks).await;
    let submission_id = finalized["submission_id"].as_i64().unwrap();

    let manifest_uri = "/v1/manifest/my-game/linux/stable";

    // Before approval: a regular user cannot even see the app.
    let (status, _) = json_request(&server.router, "GET", manifest_uri, None, Some(&buyer)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The owner can always fetch their own manifest.
    let (status, _) = json_request(&server.router, "GET", manifest_uri, None, Some(&publisher)).await;
    assert_eq!(status, StatusCode::OK);

    // Approve: app becomes visible.
    let (status, _) = json_request(
        &server.router,
        "POST",
        &format!("/v1/admin/submissions/{submission_id}/approve"),
        None,
        Some(&admin),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let app = server.metadata().get_app(app_id).await.unwrap().unwrap();
    assert!(app.visible);

    // Approving twice conflicts.
    let (status, _) = json_request(
        &server.router,
        "POST",
        &format!("/v1/admin/submissions/{submission_id}/approve"),
        None,
        Some(&admin),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Visible but unpurchased: purchase_required.
    let (status, body) = json_request(&server.router, "GET", manifest_uri, None, Some(&buyer)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body.get("code").and_then(|v| v.as_str()),
        Some("purchase_required")
    );

    // Record a purchase; the manifest opens up.
    let (status, _) = json_request(
        &server.router,
        "POST",
        "/v1/purchases",
        Some(json!({ "app_id": app_id, "price_cents": 1999 })),
        Some(&buyer),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, fetched) = json_request(&server.router, "GET", manifest_uri, None, Some(&buyer)).await;
    assert_eq!(status, StatusCode::OK);
    let fetched: Manifest = serde_json::from_value(fetched).unwrap();
    fetched.validate().unwrap();

    // Download every chunk and reconstruct each file byte-for-byte.
    for file in &fetched.files {
        let mut assembled = Vec::new();
        for chunk in &file.chunks {
            let uri = format!(
                "/v1/chunks/{}?slug=my-game&version=1.0.0&platform=linux&channel=stable",
                chunk.hash.to_hex()
            );
            let (status, data) = get_bytes(&server.router, &uri, &buyer).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(ContentHash::compute(&data), *chunk.hash.content_hash());
            assembled.extend_from_slice(&data);
        }
        assert_eq!(ContentHash::compute(&assembled), file.hash);
        let original = tree.iter().find(|(p, _)| p == &file.path).unwrap();
        assert_eq!(assembled, original.1);
    }

    // A hash outside the manifest is refused even though it may exist in the
    // store under another app.
    let stray = ContentHash::compute(b"not in this manifest").to_hex();
    let uri = format!(
        "/v1/chunks/{stray}?slug=my-game&version=1.0.0&platform=linux&channel=stable"
    );
    let (status, _) = get_bytes(&server.router, &uri, &buyer).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_reject_leaves_app_hidden() {
    let server = TestServer::new().await;
    let (_, publisher) = server.create_user("pub@example.com", Role::Publisher).await;
    let (_, admin) = server.create_user("admin@example.com", Role::Admin).await;

    let tree = test_build_tree();
    let (manifest, chunks) = build_manifest(&tree, "my-game", "1.0.0", "linux", "stable");
    let (app_id, build_id) = setup_build(&server, &publisher, "my-game", "1.0.0").await;
    let finalized = publish(&server, &publisher, build_id, &manifest, &chunks).await;
    let submission_id = finalized["submission_id"].as_i64().unwrap();

    let (status, rejected) = json_request(
        &server.router,
        "POST",
        &format!("/v1/admin/submissions/{submission_id}/reject"),
        Some(json!({ "note": "needs a content rating" })),
        Some(&admin),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rejected["status"].as_str(), Some("rejected"));
    assert_eq!(rejected["note"].as_str(), Some("needs a content rating"));

    let app = server.metadata().get_app(app_id).await.unwrap().unwrap();
    assert!(!app.visible);
}

#[tokio::test]
async fn test_missing_chunks_rejects_malformed_hashes() {
    let server = TestServer::new().await;
    let (_, publisher) = server.create_user("pub@example.com", Role::Publisher).await;
    let (_, build_id) = setup_build(&server, &publisher, "my-game", "1.0.0").await;

    let (status, body) = json_request(
        &server.router,
        "POST",
        &format!("/v1/builds/{build_id}/missing-chunks"),
        Some(json!({ "hashes": ["not-hex"] })),
        Some(&publisher),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body.get("code").and_then(|v| v.as_str()),
        Some("validation_error")
    );
}
