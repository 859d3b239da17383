use memberhub_core::db::migrations::latest_version;
use memberhub_core::db::{open_db, open_db_in_memory, DbError};
use rusqlite::Connection;

const MEMBER_TABLES: [&str; 15] = [
    "mm_member",
    "mm_profile",
    "mm_account",
    "mm_relation",
    "mm_bank",
    "mm_trusted_info",
    "mm_deliver_addr",
    "mm_level",
    "mm_favorite",
    "mm_levelup",
    "mm_integral_log",
    "mm_balance_log",
    "mm_wallet_log",
    "mm_balance_info",
    "mm_buyer_group",
];

#[test]
fn in_memory_database_has_every_member_table() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    for table in MEMBER_TABLES {
        assert_table_exists(&conn, table);
    }
}

#[test]
fn reopening_a_file_database_keeps_schema_and_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("members.db");

    let conn = open_db(&path).unwrap();
    conn.execute("INSERT INTO mm_member (usr) VALUES ('alice');", [])
        .unwrap();
    drop(conn);

    let reopened = open_db(&path).unwrap();
    assert_eq!(schema_version(&reopened), latest_version());
    let count: i64 = reopened
        .query_row("SELECT COUNT(1) FROM mm_member;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn newer_schema_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    match open_db(&path).unwrap_err() {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn second_default_address_violates_partial_index() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO mm_deliver_addr (member_id, is_default) VALUES (1, 1);",
        [],
    )
    .unwrap();
    let duplicate = conn.execute(
        "INSERT INTO mm_deliver_addr (member_id, is_default) VALUES (1, 1);",
        [],
    );
    assert!(duplicate.is_err());
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1);",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
