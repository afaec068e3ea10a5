use nem_core::{encrypt, encrypt_json, SparsePresenceTable};
use serde_json::json;

#[test]
fn builds_the_reference_request_body() {
    let key = b"erfMaqdJPvByr7Xl";
    let request = encrypt(r#"{"csrf_token":""}"#, Some(key));
    assert_eq!(
        request.params,
        "7KvkKBOcrvCW43XAV0rLbJHixeL5hnPJ6ndHWAxY4qGvaXk7v3Vt9+VWQr4JDhV3"
    );
    assert_eq!(
        request.enc_sec_key,
        "59ba25f5a3e0b29a9c3580c003565fa128e9e7624c6fbbd47321206ff00d07b1\
         d7d340f773df588fe1dae991642d9fdd8095ca2b04137424a31b4d58eeb7a52e\
         50366da3ce6501f4e3f19a62f77e585927afa0ef8b3c111b3a664bf328b72370\
         1fe626f23369aacdc36377bc2a9c7d8e7945ed1db8ceb1c63c9d9a9cf7ae4fcf"
    );
}

#[test]
fn crawl_session_persists_seen_ids() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("crawled_user_ids");

    // startup with no file on disk: empty table
    let mut table = SparsePresenceTable::new(10, 2);
    assert_eq!(table.load_file(&path).unwrap(), 0);

    // a session marks a handful of user ids, deduplicating as it goes
    let user_ids = [36_554_744u64, 48_353, 9_003_000_001, 123];
    for &id in &user_ids {
        assert!(!table.present(id));
    }
    for &id in &user_ids {
        assert!(table.present(id));
    }
    table.store_file(&path).unwrap();

    // next startup restores the same view
    let mut restored = SparsePresenceTable::new(10, 2);
    assert!(restored.load_file(&path).unwrap() > 0);
    for &id in &user_ids {
        assert!(restored.is_present(id));
    }
    assert_eq!(
        restored.allocated_blocks().collect::<Vec<_>>(),
        table.allocated_blocks().collect::<Vec<_>>()
    );

    // a second shutdown moves the previous dump aside
    restored.set_present(777);
    restored.store_file(&path).unwrap();
    assert!(dir.path().join("crawled_user_ids.old").exists());
}

#[test]
fn encrypts_json_payloads_for_the_form_body() {
    let request = encrypt_json(&json!({"offset": 0, "limit": 30}), None).unwrap();
    assert!(!request.params.is_empty());
    assert_eq!(request.enc_sec_key.len(), 256);

    // exactly the two expected form fields
    let fields = serde_json::to_value(&request).unwrap();
    let object = fields.as_object().unwrap();
    assert_eq!(object.len(), 2);
    assert!(object.contains_key("params"));
    assert!(object.contains_key("encSecKey"));
}
