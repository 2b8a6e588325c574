use formwarden::core::broker::DbBroker;
use formwarden::core::db;
use formwarden::core::error::WardenError;
use formwarden::core::registry::EntityKind;
use formwarden::core::repo;
use formwarden::core::store::Store;
use formwarden::entities::{Entity, Field, Form, Group, Privilege, Record, Response, Scope, User};
use serde_json::json;
use tempfile::tempdir;

fn fresh_store() -> (tempfile::TempDir, Store) {
    let tmp = tempdir().expect("tempdir");
    let store = Store::new(tmp.path());
    db::initialize_store_db(&store).expect("store init");
    (tmp, store)
}

/// Create `first` and `second` (distinct identities), then exercise the
/// identity rules: duplicates rejected on insert, a self-update accepted, and a
/// rename onto the other row's identity rejected without touching either row.
fn assert_identity_contract<E, F>(store: &Store, first: E, second: E, set_identity: F)
where
    E: Entity + Clone + PartialEq + std::fmt::Debug,
    F: Fn(&mut E, &str),
{
    let a = repo::create(store, first.clone()).expect("create first");
    let b = repo::create(store, second).expect("create second");
    let a_identity = a.identity().to_string();
    let b_identity = b.identity().to_string();

    let err = repo::create(store, first).expect_err("duplicate identity");
    match &err {
        WardenError::UniquenessViolation { value, .. } => assert_eq!(value, &a_identity),
        other => panic!("expected uniqueness violation, got {other:?}"),
    }

    let id = a.id().expect("assigned id").to_string();
    let same = repo::update(store, a.clone()).expect("self update keeps identity");
    assert_eq!(same.identity(), a_identity);

    let mut clash = a.clone();
    set_identity(&mut clash, &b_identity);
    let err = repo::update(store, clash).expect_err("rename onto taken identity");
    assert!(err.is_uniqueness_violation(), "{err:?}");

    let reloaded: E = repo::get(store, &id).expect("reload");
    assert_eq!(reloaded.identity(), a_identity);
    assert_eq!(repo::list::<E>(store).expect("list").len(), 2);
}

#[test]
fn scope_identity_contract() {
    let (_tmp, store) = fresh_store();
    assert_identity_contract(
        &store,
        Scope::new("forms").named("Forms", "Form management"),
        Scope::new("reports"),
        |s, v| s.slug = v.to_string(),
    );
}

#[test]
fn privilege_identity_contract() {
    let (_tmp, store) = fresh_store();
    let scope = repo::create(&store, Scope::new("forms")).expect("scope");
    let scope_id = scope.id.expect("scope id");
    assert_identity_contract(
        &store,
        Privilege::new("forms-read", "Read", "Read forms", "read", &scope_id),
        Privilege::new("forms-write", "Write", "Edit forms", "write", &scope_id),
        |p, v| p.slug = v.to_string(),
    );
}

#[test]
fn group_identity_contract() {
    let (_tmp, store) = fresh_store();
    assert_identity_contract(
        &store,
        Group::new("editors", "Editors", "Edit things"),
        Group::new("viewers", "Viewers", "Look at things"),
        |g, v| g.slug = v.to_string(),
    );
}

#[test]
fn user_identity_contract() {
    let (_tmp, store) = fresh_store();
    assert_identity_contract(
        &store,
        User::new("ana@example.com", "Ana", "pw-ana"),
        User::new("bo@example.com", "Bo", "pw-bo"),
        |u, v| u.email = v.to_string(),
    );
}

#[test]
fn field_identity_contract() {
    let (_tmp, store) = fresh_store();
    assert_identity_contract(
        &store,
        Field::new("age").named("Age", "Age in years"),
        Field::new("email"),
        |f, v| f.slug = v.to_string(),
    );
}

#[test]
fn form_identity_contract() {
    let (_tmp, store) = fresh_store();
    assert_identity_contract(
        &store,
        Form::new("signup", "Signup", "New accounts"),
        Form::new("survey", "Survey", "Yearly survey"),
        |f, v| f.slug = v.to_string(),
    );
}

#[test]
fn response_identity_contract() {
    let (_tmp, store) = fresh_store();
    let field = repo::create(&store, Field::new("age")).expect("field");
    let user = repo::create(&store, User::new("ana@example.com", "Ana", "pw")).expect("user");
    let field_id = field.id.expect("field id");
    let user_id = user.id.expect("user id");
    assert_identity_contract(
        &store,
        Response::new("r1", "R1", "", json!({"value": 41}), &field_id, &user_id),
        Response::new("r2", "R2", "", json!({"value": 42}), &field_id, &user_id),
        |r, v| r.slug = v.to_string(),
    );
}

#[test]
fn created_at_is_set_once_and_survives_updates() {
    let (_tmp, store) = fresh_store();
    let created = repo::create(&store, Group::new("editors", "Editors", "")).expect("create");
    let stamp = created.created_at.clone().expect("created_at set");
    assert!(stamp.ends_with('Z'));

    let mut changed = created.clone();
    changed.name = "Senior editors".to_string();
    changed.created_at = Some("1Z".to_string());
    let updated = repo::update(&store, changed).expect("update");
    assert_eq!(updated.name, "Senior editors");
    assert_eq!(updated.created_at.as_deref(), Some(stamp.as_str()));
}

#[test]
fn user_password_is_stored_only_as_a_verifiable_hash() {
    let (_tmp, store) = fresh_store();
    let user = repo::create(&store, User::new("ana@example.com", "Ana", "correct horse"))
        .expect("create");
    let id = user.id.clone().expect("id");

    let stored: String = DbBroker::new(&store)
        .with_conn("test.peek", |conn| {
            Ok(conn.query_row(
                "SELECT hashed_password FROM users WHERE id = ?1",
                [&id],
                |row| row.get(0),
            )?)
        })
        .expect("peek");
    assert!(!stored.contains("correct horse"));
    assert!(stored.starts_with("$argon2id$"));

    let loaded: User = repo::get(&store, &id).expect("get");
    assert!(loaded.password.is_none());
    assert!(loaded.verify_password("correct horse").expect("verify"));
    assert!(!loaded.verify_password("wrong").expect("verify"));

    let summary = loaded.summary();
    assert!(summary.get("hashed_password").is_none());
    assert!(summary.get("password").is_none());
    assert_eq!(summary["email"], "ana@example.com");
}

#[test]
fn user_update_without_password_keeps_the_hash() {
    let (_tmp, store) = fresh_store();
    let user = repo::create(&store, User::new("ana@example.com", "Ana", "first")).expect("create");
    let id = user.id.clone().expect("id");

    let mut renamed = User::new("ana@example.com", "Ana Maria", "");
    renamed.id = Some(id.clone());
    renamed.password = None;
    repo::update(&store, renamed).expect("rename");

    let loaded: User = repo::get(&store, &id).expect("get");
    assert_eq!(loaded.name, "Ana Maria");
    assert!(loaded.verify_password("first").expect("verify"));

    let rotated = loaded.with_password("second");
    repo::update(&store, rotated).expect("rotate");
    let loaded: User = repo::get(&store, &id).expect("get");
    assert!(loaded.verify_password("second").expect("verify"));
    assert!(!loaded.verify_password("first").expect("verify"));
}

#[test]
fn invalid_input_is_rejected_before_any_write() {
    let (_tmp, store) = fresh_store();

    let err = repo::create(&store, User::new("nope", "Ana", "pw")).expect_err("bad email");
    assert!(matches!(err, WardenError::Validation(_)));

    let err = repo::create(&store, Scope::new("  ")).expect_err("blank slug");
    assert!(matches!(err, WardenError::Validation(_)));

    let field = repo::create(&store, Field::new("age")).expect("field");
    let user = repo::create(&store, User::new("ana@example.com", "Ana", "pw")).expect("user");
    let err = repo::create(
        &store,
        Response::new(
            "r1",
            "",
            "",
            json!([1, 2]),
            field.id.as_deref().expect("field id"),
            user.id.as_deref().expect("user id"),
        ),
    )
    .expect_err("array payload");
    assert!(matches!(err, WardenError::Validation(_)));
    assert!(repo::list::<Response>(&store).expect("list").is_empty());
    assert_eq!(repo::list::<User>(&store).expect("list").len(), 1);
}

#[test]
fn update_and_get_of_unknown_ids_are_not_found() {
    let (_tmp, store) = fresh_store();

    let mut ghost = Form::new("ghost", "Ghost", "");
    ghost.id = Some("missing".to_string());
    let err = repo::update(&store, ghost).expect_err("unknown id");
    assert!(matches!(err, WardenError::NotFound(_)));

    let err = repo::get::<Form>(&store, "missing").expect_err("unknown id");
    assert!(matches!(err, WardenError::NotFound(_)));

    let err = repo::update(&store, Form::new("no-id", "", "")).expect_err("no id");
    assert!(matches!(err, WardenError::Validation(_)));
}

#[test]
fn response_data_round_trips_as_json_object() {
    let (_tmp, store) = fresh_store();
    let field = repo::create(&store, Field::new("colors")).expect("field");
    let user = repo::create(&store, User::new("ana@example.com", "Ana", "pw")).expect("user");
    let data = json!({"answer": ["red", "blue"], "confidence": 0.8});

    let created = repo::create(
        &store,
        Response::new(
            "colors-ana",
            "Colors",
            "",
            data.clone(),
            field.id.as_deref().expect("field id"),
            user.id.as_deref().expect("user id"),
        ),
    )
    .expect("create response");

    let found = repo::find_by_identity::<Response>(&store, "colors-ana")
        .expect("find")
        .expect("present");
    assert_eq!(found.id, created.id);
    assert_eq!(found.data, data);
    assert!(found.summary().get("data").is_none());
}

#[test]
fn list_is_ordered_by_identity() {
    let (_tmp, store) = fresh_store();
    for slug in ["charlie", "alpha", "bravo"] {
        repo::create(&store, Scope::new(slug)).expect("create");
    }
    let slugs: Vec<String> = repo::list::<Scope>(&store)
        .expect("list")
        .into_iter()
        .map(|s| s.slug)
        .collect();
    assert_eq!(slugs, vec!["alpha", "bravo", "charlie"]);
}

#[test]
fn json_supplied_hash_never_reaches_the_credential_column() {
    let (_tmp, store) = fresh_store();

    let bare = Record::from_json(
        EntityKind::User,
        json!({"email": "eve@example.com", "name": "Eve", "hashed_password": "hunter2"}),
    )
    .expect("parse");
    let err = repo::create_record(&store, bare).expect_err("no password");
    assert!(matches!(err, WardenError::Validation(_)));
    assert!(repo::list::<User>(&store).expect("list").is_empty());

    let with_password = Record::from_json(
        EntityKind::User,
        json!({
            "email": "eve@example.com",
            "name": "Eve",
            "password": "pw",
            "hashed_password": "hunter2",
        }),
    )
    .expect("parse");
    let created = repo::create_record(&store, with_password).expect("create");
    let id = created.id().expect("id").to_string();

    let rename = Record::from_json(
        EntityKind::User,
        json!({"id": id, "email": "eve@example.com", "name": "Eve B", "hashed_password": "hunter2"}),
    )
    .expect("parse");
    repo::update_record(&store, rename).expect("update");

    let stored: String = DbBroker::new(&store)
        .with_conn("test.peek", |conn| {
            Ok(conn.query_row(
                "SELECT hashed_password FROM users WHERE id = ?1",
                [&id],
                |row| row.get(0),
            )?)
        })
        .expect("peek");
    assert!(stored.starts_with("$argon2id$"));
    let loaded: User = repo::get(&store, &id).expect("get");
    assert_eq!(loaded.name, "Eve B");
    assert!(loaded.verify_password("pw").expect("verify"));
}

#[test]
fn plaintext_in_the_hash_field_is_rejected_on_insert_and_update() {
    let (_tmp, store) = fresh_store();

    let mut forged = User::new("eve@example.com", "Eve", "");
    forged.password = None;
    forged.hashed_password = "hunter2".to_string();
    let err = repo::create(&store, forged).expect_err("plaintext hash");
    assert!(matches!(err, WardenError::Validation(_)));

    let mut user = repo::create(&store, User::new("eve@example.com", "Eve", "pw")).expect("create");
    user.hashed_password = "hunter2".to_string();
    let err = repo::update(&store, user.clone()).expect_err("plaintext hash");
    assert!(matches!(err, WardenError::Validation(_)));

    let loaded: User = repo::get(&store, user.id.as_deref().expect("id")).expect("get");
    assert!(loaded.verify_password("pw").expect("verify"));
}

#[test]
fn create_assigns_fresh_ids_whatever_the_caller_supplied() {
    let (_tmp, store) = fresh_store();

    let mut alpha = Scope::new("alpha");
    alpha.id = Some("X".to_string());
    let mut beta = Scope::new("beta");
    beta.id = Some("X".to_string());

    let alpha = repo::create(&store, alpha).expect("alpha");
    let beta = repo::create(&store, beta).expect("beta");
    assert_ne!(alpha.id.as_deref(), Some("X"));
    assert_ne!(alpha.id, beta.id);
    assert_eq!(repo::list::<Scope>(&store).expect("list").len(), 2);
}
