//! End-to-end tests for the data commands: get, put, delete, batchput, scan

use ldbkit::LdbError;

use super::{is_usage, Ldb};

// =============================================================================
// Put / Get / Delete Tests
// =============================================================================

#[test]
fn test_put_creates_store_and_get_reads_it() {
    let ldb = Ldb::new();

    assert_eq!(ldb.ok(&["put", "--create_if_missing", "x1", "y1"]), "OK\n");
    assert_eq!(ldb.ok(&["get", "x1"]), "y1\n");
}

#[test]
fn test_raw_data_may_start_with_hyphen() {
    let ldb = Ldb::new();

    ldb.ok(&["put", "--create_if_missing", "k", "-1"]);
    ldb.ok(&["put", "-k", "v"]);
    ldb.ok(&["batchput", "-a", "-", "--", "--b", "-2"]);

    assert_eq!(ldb.ok(&["get", "k"]), "-1\n");
    assert_eq!(ldb.ok(&["get", "-k"]), "v\n");
    assert_eq!(ldb.ok(&["get", "-a"]), "-\n");
    assert_eq!(ldb.ok(&["get", "--", "--b"]), "-2\n");
    assert_eq!(ldb.ok(&["delete", "-k"]), "OK\n");
    assert!(matches!(ldb.err(&["get", "-k"]), LdbError::KeyNotFound));
}

#[test]
fn test_put_without_create_fails_on_missing_store() {
    let ldb = Ldb::new();

    let err = ldb.err(&["put", "x1", "y1"]);
    assert!(matches!(err, LdbError::Open { .. }));
    assert!(!ldb.path().exists());
}

#[test]
fn test_get_missing_store_fails() {
    let ldb = Ldb::new();
    assert!(matches!(ldb.err(&["get", "x1"]), LdbError::Open { .. }));
}

#[test]
fn test_get_absent_key_fails() {
    let ldb = Ldb::with_pairs(&[("x1", "y1")]);

    let err = ldb.err(&["get", "x2"]);
    assert!(matches!(err, LdbError::KeyNotFound));
    assert_eq!(err.exit_code(), 1);
}

#[test]
fn test_put_overwrites() {
    let ldb = Ldb::with_pairs(&[("x1", "y1")]);

    ldb.ok(&["put", "x1", "y2"]);
    assert_eq!(ldb.ok(&["get", "x1"]), "y2\n");
}

#[test]
fn test_delete_is_idempotent() {
    let ldb = Ldb::with_pairs(&[("x1", "y1"), ("x2", "y2")]);

    assert_eq!(ldb.ok(&["delete", "x1"]), "OK\n");
    assert_eq!(ldb.ok(&["delete", "x1"]), "OK\n");
    assert_eq!(ldb.ok(&["delete", "never-there"]), "OK\n");

    assert!(matches!(ldb.err(&["get", "x1"]), LdbError::KeyNotFound));
    assert_eq!(ldb.ok(&["get", "x2"]), "y2\n");
}

#[test]
fn test_empty_value() {
    let ldb = Ldb::new();

    ldb.ok(&["put", "--create_if_missing", "k", ""]);
    assert_eq!(ldb.ok(&["get", "k"]), "\n");
    assert_eq!(ldb.ok(&["get", "--value_hex", "k"]), "0x\n");
}

// =============================================================================
// Hex Encoding Tests
// =============================================================================

#[test]
fn test_hex_put_raw_get() {
    let ldb = Ldb::new();

    ldb.ok(&["put", "--create_if_missing", "--hex", "0x6131", "0x6231"]);

    assert_eq!(ldb.ok(&["get", "a1"]), "b1\n");
    assert_eq!(ldb.ok(&["get", "--key_hex", "0x6131"]), "b1\n");
    assert_eq!(ldb.ok(&["get", "--value_hex", "a1"]), "0x6231\n");
    assert_eq!(ldb.ok(&["get", "--hex", "0X6131"]), "0x6231\n");
}

#[test]
fn test_binary_key_and_value() {
    let ldb = Ldb::new();

    ldb.ok(&["put", "--create_if_missing", "--hex", "0x00ff10", "0xdeadbeef"]);

    assert_eq!(ldb.ok(&["get", "--hex", "0x00FF10"]), "0xdeadbeef\n");
    assert_eq!(
        ldb.run_bytes(&["get", "--key_hex", "0x00ff10"], b"").unwrap(),
        vec![0xde, 0xad, 0xbe, 0xef, b'\n']
    );
}

#[test]
fn test_key_hex_value_raw() {
    let ldb = Ldb::new();

    ldb.ok(&["put", "--create_if_missing", "--key_hex", "0x6b", "literal"]);
    assert_eq!(ldb.ok(&["get", "k"]), "literal\n");

    ldb.ok(&["delete", "--key_hex", "0x6b"]);
    assert!(matches!(ldb.err(&["get", "k"]), LdbError::KeyNotFound));
}

// =============================================================================
// Batch Put Tests
// =============================================================================

#[test]
fn test_batchput() {
    let ldb = Ldb::new();

    assert_eq!(
        ldb.ok(&["batchput", "--create_if_missing", "x1", "y1", "x2", "y2", "x3", "y3"]),
        "OK\n"
    );
    assert_eq!(ldb.ok(&["scan"]), "x1 : y1\nx2 : y2\nx3 : y3\n");
}

#[test]
fn test_batchput_hex() {
    let ldb = Ldb::with_pairs(&[("seed", "1")]);

    ldb.ok(&["batchput", "--hex", "0x61", "0x31", "0x62", "0x32"]);

    assert_eq!(ldb.ok(&["get", "a"]), "1\n");
    assert_eq!(ldb.ok(&["get", "b"]), "2\n");
}

#[test]
fn test_batchput_bad_arity_writes_nothing() {
    let ldb = Ldb::with_pairs(&[("seed", "1")]);

    assert!(is_usage(&ldb.err(&["batchput", "x1", "y1", "x2"])));
    assert!(is_usage(&ldb.err(&["batchput"])));

    assert!(matches!(ldb.err(&["get", "x1"]), LdbError::KeyNotFound));
}

#[test]
fn test_batchput_bad_encoding_writes_nothing() {
    let ldb = Ldb::with_pairs(&[("seed", "1")]);

    let err = ldb.err(&["batchput", "--hex", "0x61", "0x31", "0x62", "oops"]);
    assert!(matches!(err, LdbError::InvalidEncoding(_)));

    assert!(matches!(ldb.err(&["get", "a"]), LdbError::KeyNotFound));
}

// =============================================================================
// Scan Tests
// =============================================================================

fn scan_store() -> Ldb {
    Ldb::with_pairs(&[("x1", "y1"), ("x2", "y2"), ("x3", "y3"), ("x4", "y4")])
}

#[test]
fn test_scan_all() {
    let ldb = scan_store();
    assert_eq!(ldb.ok(&["scan"]), "x1 : y1\nx2 : y2\nx3 : y3\nx4 : y4\n");
}

#[test]
fn test_scan_bounds() {
    let ldb = scan_store();

    assert_eq!(ldb.ok(&["scan", "--from=x2", "--to=x4"]), "x2 : y2\nx3 : y3\n");
    assert_eq!(ldb.ok(&["scan", "--from=x3"]), "x3 : y3\nx4 : y4\n");
    assert_eq!(ldb.ok(&["scan", "--to=x2"]), "x1 : y1\n");
    // Bounds need not be existing keys
    assert_eq!(ldb.ok(&["scan", "--from=x10", "--to=x25"]), "x2 : y2\n");
}

#[test]
fn test_scan_max_keys() {
    let ldb = scan_store();

    assert_eq!(ldb.ok(&["scan", "--max_keys=2"]), "x1 : y1\nx2 : y2\n");
    assert_eq!(
        ldb.ok(&["scan", "--from=x2", "--max_keys=100"]),
        "x2 : y2\nx3 : y3\nx4 : y4\n"
    );
    assert!(matches!(ldb.err(&["scan", "--max_keys=0"]), LdbError::EmptyResult));
}

#[test]
fn test_scan_empty_result_fails() {
    let ldb = scan_store();

    assert!(matches!(ldb.err(&["scan", "--from=x3", "--to=x3"]), LdbError::EmptyResult));
    assert!(matches!(ldb.err(&["scan", "--from=x4", "--to=x1"]), LdbError::EmptyResult));
    assert!(matches!(ldb.err(&["scan", "--from=y"]), LdbError::EmptyResult));
}

#[test]
fn test_scan_encodings() {
    let ldb = Ldb::with_pairs(&[("a", "b")]);

    assert_eq!(ldb.ok(&["scan", "--hex"]), "0x61 : 0x62\n");
    assert_eq!(ldb.ok(&["scan", "--key_hex"]), "0x61 : b\n");
    assert_eq!(ldb.ok(&["scan", "--value_hex"]), "a : 0x62\n");
    assert_eq!(ldb.ok(&["scan", "--hex", "--from=0x61", "--to=0x62"]), "0x61 : 0x62\n");
}

#[test]
fn test_scan_hides_deleted_keys() {
    let ldb = scan_store();

    ldb.ok(&["delete", "x2"]);
    ldb.ok(&["delete", "x3"]);

    assert_eq!(ldb.ok(&["scan"]), "x1 : y1\nx4 : y4\n");
}

#[test]
fn test_failed_command_prints_nothing() {
    let ldb = scan_store();
    let mut out = Vec::new();

    let argv = vec![
        "ldb".to_string(),
        format!("--db={}", ldb.path().display()),
        "scan".to_string(),
        "--from=z".to_string(),
    ];
    let result = ldbkit::cli::run_with_io(argv, &mut std::io::empty(), &mut out);

    assert!(result.is_err());
    assert!(out.is_empty());
}
