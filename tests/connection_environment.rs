// Mutates process env, so it lives in its own test binary with no other tests
use people_store::{ConnectionSource, PersonRecord, PersonStore};
use tempfile::TempDir;

const URL_VAR: &str = "PEOPLE_STORE_TEST_SWITCHING_URL";

fn url(dir: &TempDir) -> String {
    format!("sqlite://{}", dir.path().join("people.db").display())
}

#[tokio::test(flavor = "current_thread")]
async fn environment_url_is_read_on_every_operation() {
    let first = tempfile::tempdir().expect("first temp dir");
    let second = tempfile::tempdir().expect("second temp dir");
    let store = PersonStore::new(ConnectionSource::Environment(URL_VAR.to_string()));

    unsafe { std::env::set_var(URL_VAR, url(&first)) };
    store.initialize_schema().await.expect("create first table");
    store
        .insert(&PersonRecord::new("Ann", "Lee", "ann@x.co").expect("valid person"))
        .await
        .expect("insert into first database");

    unsafe { std::env::set_var(URL_VAR, url(&second)) };
    store.initialize_schema().await.expect("create second table");
    assert!(store.get_all().await.expect("list second").is_empty());

    unsafe { std::env::set_var(URL_VAR, url(&first)) };
    assert_eq!(store.get_all().await.expect("list first").len(), 1);

    unsafe { std::env::remove_var(URL_VAR) };
    assert!(store.get_all().await.is_err());
}
