use formwarden::core::broker::{self, DbBroker};
use formwarden::core::config::Config;
use formwarden::core::db;
use formwarden::core::error::{WardenError, classify_sqlite};
use formwarden::core::registry::{self, EntityKind};
use formwarden::core::repo;
use formwarden::core::schemas;
use formwarden::core::store::Store;
use formwarden::entities::{Privilege, Scope};
use rusqlite::params;
use std::fs;
use std::sync::{Arc, Barrier};
use tempfile::tempdir;

fn fresh_store() -> (tempfile::TempDir, Store) {
    let tmp = tempdir().expect("tempdir");
    let store = Store::new(tmp.path()).with_actor("tester");
    db::initialize_store_db(&store).expect("store init");
    (tmp, store)
}

#[test]
fn init_creates_every_table_and_is_idempotent() {
    let (_tmp, store) = fresh_store();
    db::initialize_store_db(&store).expect("second init");

    let conn = db::db_connect(&store.db_path().to_string_lossy()).expect("db connect");
    for (table, _) in schemas::TABLES {
        assert!(db::table_exists(&conn, table).expect("table_exists"), "{table}");
    }
    let fk_on: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .expect("pragma foreign_keys");
    assert_eq!(fk_on, 1);
}

#[test]
fn registry_resolves_every_kind_and_mirrors_join_relations() {
    let reg = registry::registry();
    reg.check().expect("registry consistent");
    for kind in EntityKind::ALL {
        let desc = reg.resolve(kind.name()).expect("resolvable");
        assert_eq!(desc.kind, kind);
    }
    assert!(reg.resolve("ghost").is_err());
}

#[test]
fn every_operation_is_audited_with_the_store_actor() {
    let (_tmp, store) = fresh_store();
    repo::create(&store, Scope::new("forms")).expect("create scope");
    let err = repo::create(&store, Scope::new("forms")).expect_err("duplicate");
    assert!(err.is_uniqueness_violation());

    let events = broker::read_audit_log(&store).expect("audit log");
    let ops: Vec<_> = events.iter().map(|e| e.op.as_str()).collect();
    assert_eq!(ops, vec!["store.init", "scope.create", "scope.create"]);
    assert_eq!(events[1].status, "success");
    assert_eq!(events[2].status, "error");
    assert!(events.iter().all(|e| e.actor == "tester"));
    assert!(events.iter().all(|e| e.db_id == schemas::STORE_DB_NAME));
}

#[test]
fn unique_constraint_backstops_writes_that_skip_the_guard() {
    let (_tmp, store) = fresh_store();
    repo::create(&store, Scope::new("forms")).expect("create scope");

    let err = DbBroker::new(&store)
        .with_tx("scope.raw_insert", |conn| {
            conn.execute(
                "INSERT INTO scopes(id, created_at, slug) VALUES(?1, ?2, ?3)",
                params!["raw-id", "0Z", "forms"],
            )?;
            Ok(())
        })
        .expect_err("constraint should fire");

    match err {
        WardenError::UniquenessViolation { field, .. } => assert_eq!(field, "slug"),
        other => panic!("expected uniqueness violation, got {other:?}"),
    }
    assert_eq!(repo::list::<Scope>(&store).expect("list").len(), 1);
}

#[test]
fn dangling_reference_is_a_referential_violation() {
    let (_tmp, store) = fresh_store();
    let err = repo::create(
        &store,
        Privilege::new("p", "P", "dangling", "read", "no-such-scope"),
    )
    .expect_err("missing scope");
    assert!(err.is_referential_violation(), "{err:?}");
    assert!(repo::list::<Privilege>(&store).expect("list").is_empty());
}

#[test]
fn classify_maps_raw_constraint_failures() {
    let conn = rusqlite::Connection::open_in_memory().expect("open");
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;
         CREATE TABLE parent(id TEXT PRIMARY KEY, email TEXT UNIQUE);
         CREATE TABLE child(id TEXT PRIMARY KEY, parent_id TEXT REFERENCES parent(id));
         INSERT INTO parent VALUES('a', 'a@example.com');",
    )
    .expect("setup");

    let dup = conn
        .execute("INSERT INTO parent VALUES('b', 'a@example.com')", [])
        .expect_err("dup");
    match classify_sqlite(dup) {
        WardenError::UniquenessViolation { field, .. } => assert_eq!(field, "email"),
        other => panic!("unexpected {other:?}"),
    }

    let fk = conn
        .execute("INSERT INTO child VALUES('c', 'missing')", [])
        .expect_err("fk");
    assert!(classify_sqlite(fk).is_referential_violation());
}

#[test]
fn concurrent_inserts_of_one_slug_admit_exactly_one() {
    let (_tmp, store) = fresh_store();
    let store = Arc::new(store);
    let threads = 6;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let store = Arc::clone(&store);
            let gate = Arc::clone(&barrier);
            std::thread::spawn(move || {
                gate.wait();
                repo::create(&store, Scope::new("race"))
            })
        })
        .collect();

    let mut created = 0;
    for h in handles {
        match h.join().expect("thread") {
            Ok(_) => created += 1,
            Err(e) => assert!(e.is_uniqueness_violation(), "{e:?}"),
        }
    }
    assert_eq!(created, 1);
    assert_eq!(repo::list::<Scope>(&store).expect("list").len(), 1);
}

#[test]
fn missing_store_directory_is_unavailable() {
    let tmp = tempdir().expect("tempdir");
    let store = Store::new(tmp.path().join("absent").join("deeper"));
    let err = repo::list::<Scope>(&store).expect_err("no store");
    assert!(
        matches!(err, WardenError::StoreUnavailable(_) | WardenError::Io(_)),
        "{err:?}"
    );
}

#[test]
fn config_file_drives_store_location() {
    let tmp = tempdir().expect("tempdir");
    let data_dir = tmp.path().join("data");
    let cfg_path = tmp.path().join("formwarden.toml");
    fs::write(
        &cfg_path,
        format!(
            "[store]\ndata_dir = {:?}\nactor = \"ops\"\n",
            data_dir.to_string_lossy()
        ),
    )
    .expect("write config");

    let content = fs::read_to_string(&cfg_path).expect("read config");
    let store = Config::parse(&content).expect("parse").to_store();
    db::initialize_store_db(&store).expect("init");
    assert!(data_dir.join(schemas::STORE_DB_NAME).exists());

    let events = broker::read_audit_log(&store).expect("audit");
    assert_eq!(events[0].actor, "ops");
}
