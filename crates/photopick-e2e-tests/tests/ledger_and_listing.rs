use photopick_e2e_tests::{
    TEST_ALBUM_ID, TEST_API_KEY, create_test_config, init_tracing, mock_album_pages,
};
use photopick_lib::auth::Credential;
use photopick_lib::ledger::Ledger;
use photopick_lib::remote::RemoteLister;
use photopick_lib::retry::RetryPolicy;
use photopick_lib::verification::{HashAlgorithm, hash_file};
use secrecy::SecretString;
use std::collections::HashSet;
use std::time::Duration;

#[test]
fn test_ledger_round_trip_and_lossy_recovery() {
    init_tracing();
    let work_dir = tempfile::tempdir().unwrap();
    let ledger_path = work_dir.path().join("fetched_photos.json");

    assert!(
        Ledger::load_from_file(&ledger_path).is_empty(),
        "A missing ledger loads as empty"
    );

    let ledger = Ledger::new()
        .update("photo-1", "aa11")
        .update("photo-2", "bb22")
        .update("photo-3", "cc33");
    ledger.save_to_file(&ledger_path).unwrap();
    assert_eq!(Ledger::load_from_file(&ledger_path), ledger);

    std::fs::write(&ledger_path, b"{\"photo-1\": \"aa11\", truncated").unwrap();
    assert!(
        Ledger::load_from_file(&ledger_path).is_empty(),
        "A corrupted ledger loads as empty"
    );
}

#[tokio::test]
async fn test_listing_returns_every_item_exactly_once_across_pages() {
    init_tracing();

    let total = 7;
    let page_size = 3;
    let ids: Vec<String> = (1..=total).map(|n| format!("photo-{n}")).collect();
    let pages: Vec<Vec<String>> = ids.chunks(page_size).map(<[String]>::to_vec).collect();
    assert_eq!(pages.len(), 3);

    let mut server = mockito::Server::new_async().await;
    let mocks = mock_album_pages(&mut server, &pages).await;

    let work_dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server.url(), work_dir.path());
    let lister = RemoteLister::new(
        reqwest_client(),
        &config.api_endpoint,
        page_size as u32,
        Duration::from_secs(10),
        RetryPolicy::none(),
    );
    let credential = Credential::ApiKey(SecretString::new(TEST_API_KEY.to_string()));

    let items = lister.try_list(TEST_ALBUM_ID, &credential).await.unwrap();

    assert_eq!(items.len(), total);
    let listed: HashSet<_> = items.iter().map(|i| i.id.clone()).collect();
    assert_eq!(listed, ids.into_iter().collect::<HashSet<_>>());
    for mock in &mocks {
        mock.assert_async().await;
    }
}

fn reqwest_client() -> reqwest::Client {
    photopick_lib::utils::build_http_client(&Default::default()).unwrap()
}

#[tokio::test]
async fn test_digests_are_stable_and_content_sensitive() {
    init_tracing();
    let work_dir = tempfile::tempdir().unwrap();
    let first = work_dir.path().join("first.jpg");
    let same = work_dir.path().join("same.jpg");
    let other = work_dir.path().join("other.jpg");
    std::fs::write(&first, b"identical content").unwrap();
    std::fs::write(&same, b"identical content").unwrap();
    std::fs::write(&other, b"identical contenT").unwrap();

    for algorithm in [
        HashAlgorithm::Sha256,
        HashAlgorithm::Sha512,
        HashAlgorithm::Sha1,
        HashAlgorithm::Md5,
    ] {
        let a = hash_file(&first, algorithm).await.unwrap();
        assert_eq!(a, hash_file(&first, algorithm).await.unwrap());
        assert_eq!(a, hash_file(&same, algorithm).await.unwrap());
        assert_ne!(a, hash_file(&other, algorithm).await.unwrap());
    }
}
