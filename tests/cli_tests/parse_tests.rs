//! Tests for argument parsing and validation
//!
//! Everything here is checked before a store is opened, so most tests run
//! against a path that does not exist.

use std::path::PathBuf;

use ldbkit::cli::router::{parse, Invocation, StoreOptions};
use ldbkit::cli::schema::{self, Arity, CommandKind, COMMANDS};
use ldbkit::cli::{Command, Encoding, EncodingMode, KeyRange};
use ldbkit::config::CompressionType;
use ldbkit::LdbError;

use super::{is_usage, run_argv, Ldb};

fn parse_ok(argv: &[&str]) -> Invocation {
    match parse(argv.iter().copied()) {
        Ok(invocation) => invocation,
        Err(e) => panic!("{:?} failed to parse: {}", argv, e),
    }
}

fn parse_err(argv: &[&str]) -> LdbError {
    match parse(argv.iter().copied()) {
        Ok(invocation) => panic!("{:?} unexpectedly parsed: {:?}", argv, invocation),
        Err(e) => e,
    }
}

// =============================================================================
// Schema Table Tests
// =============================================================================

#[test]
fn test_every_command_has_a_row() {
    for kind in [
        CommandKind::Get,
        CommandKind::Put,
        CommandKind::Delete,
        CommandKind::Scan,
        CommandKind::BatchPut,
        CommandKind::Dump,
        CommandKind::Load,
        CommandKind::Compact,
        CommandKind::ReduceLevels,
        CommandKind::DumpWal,
    ] {
        assert_eq!(schema::command_spec(kind).kind, kind);
    }
    assert_eq!(COMMANDS.len(), 10);
}

#[test]
fn test_command_flags_are_declared() {
    for spec in COMMANDS {
        for flag in spec.flags.iter().chain(spec.required) {
            assert!(schema::flag_spec(flag).is_some(), "{} uses undeclared --{}", spec.name, flag);
        }
    }
}

#[test]
fn test_arity() {
    assert!(Arity::None.accepts(0));
    assert!(!Arity::None.accepts(1));
    assert!(Arity::Exact(&["key"]).accepts(1));
    assert!(!Arity::Exact(&["key", "value"]).accepts(1));
    assert!(!Arity::Pairs.accepts(0));
    assert!(!Arity::Pairs.accepts(3));
    assert!(Arity::Pairs.accepts(4));
}

#[test]
fn test_cli_definition_is_consistent() {
    schema::build_cli().debug_assert();
}

// =============================================================================
// Typed Invocation Tests
// =============================================================================

#[test]
fn test_parse_get_with_value_hex() {
    let invocation = parse_ok(&["ldb", "--db=/tmp/store", "get", "--value_hex", "a1"]);

    assert_eq!(invocation.db, PathBuf::from("/tmp/store"));
    assert_eq!(
        invocation.command,
        Command::Get {
            key: b"a1".to_vec(),
            value_mode: EncodingMode::Hex,
        }
    );
}

#[test]
fn test_parse_put_hex() {
    let invocation = parse_ok(&["ldb", "--db=/tmp/store", "put", "--hex", "0x6131", "0x00ff"]);

    assert_eq!(
        invocation.command,
        Command::Put {
            key: b"a1".to_vec(),
            value: vec![0x00, 0xff],
        }
    );
}

#[test]
fn test_parse_scan_bounds_use_key_encoding() {
    let invocation = parse_ok(&[
        "ldb",
        "--db=/tmp/store",
        "scan",
        "--key_hex",
        "--from=0x61",
        "--to=0x63",
        "--max_keys=5",
    ]);

    assert_eq!(
        invocation.command,
        Command::Scan {
            range: KeyRange::new(Some(b"a".to_vec()), Some(b"c".to_vec())),
            max_keys: Some(5),
            encoding: Encoding {
                key: EncodingMode::Hex,
                value: EncodingMode::Raw,
            },
        }
    );
}

#[test]
fn test_parse_dump_defaults() {
    let invocation = parse_ok(&["ldb", "--db=/tmp/store", "dump"]);

    assert_eq!(
        invocation.command,
        Command::Dump {
            range: KeyRange::all(),
            max_keys: None,
            mode: EncodingMode::Raw,
            count_only: false,
        }
    );
}

#[test]
fn test_parse_batchput_pairs() {
    let invocation = parse_ok(&["ldb", "--db=/tmp/store", "batchput", "k1", "v1", "k2", "v2"]);

    assert_eq!(
        invocation.command,
        Command::BatchPut {
            pairs: vec![
                (b"k1".to_vec(), b"v1".to_vec()),
                (b"k2".to_vec(), b"v2".to_vec()),
            ],
        }
    );
}

#[test]
fn test_parse_dump_wal() {
    let invocation = parse_ok(&[
        "ldb",
        "--db=/tmp/store",
        "dump_wal",
        "--walfile=/tmp/other.log",
        "--header",
    ]);

    assert_eq!(
        invocation.command,
        Command::DumpWal {
            walfile: Some(PathBuf::from("/tmp/other.log")),
            header: true,
        }
    );
}

#[test]
fn test_explicit_bool_values() {
    let invocation =
        parse_ok(&["ldb", "--db=/tmp/store", "put", "--create_if_missing=false", "a", "b"]);
    assert!(!invocation.options.create_if_missing);

    let invocation =
        parse_ok(&["ldb", "--db=/tmp/store", "put", "--create_if_missing=true", "a", "b"]);
    assert!(invocation.options.create_if_missing);
}

#[test]
fn test_global_flags_before_and_after_command() {
    let before = parse_ok(&["ldb", "--db=/tmp/store", "--write_buffer_size=1024", "get", "a"]);
    let after = parse_ok(&["ldb", "get", "--db=/tmp/store", "--write_buffer_size=1024", "a"]);

    assert_eq!(before, after);
    assert_eq!(before.options.write_buffer_size, Some(1024));
}

#[test]
fn test_engine_tuning_options() {
    let invocation = parse_ok(&[
        "ldb",
        "--db=/tmp/store",
        "--bloom_bits=10",
        "--compression_type=snappy",
        "--block_size=4096",
        "--auto_compaction=false",
        "--write_buffer_size=65536",
        "--file_size=131072",
        "load",
        "--create_if_missing",
        "--disable_wal",
    ]);

    assert_eq!(
        invocation.options,
        StoreOptions {
            create_if_missing: true,
            disable_wal: true,
            bloom_bits: Some(10),
            compression: Some(CompressionType::Snappy),
            block_size: Some(4096),
            auto_compaction: Some(false),
            write_buffer_size: Some(65536),
            file_size: Some(131072),
        }
    );

    let config = invocation.options.to_config(&invocation.db);
    assert_eq!(config.data_dir, PathBuf::from("/tmp/store"));
    assert_eq!(config.write_buffer_size, 65536);
    assert_eq!(config.max_file_size, 131072);
    assert_eq!(config.table.compression, CompressionType::Snappy);
    assert!(!config.auto_compaction);
    assert!(config.disable_wal);
}

// =============================================================================
// Rejection Tests
// =============================================================================

#[test]
fn test_missing_db_is_usage_error() {
    let err = parse_err(&["ldb", "get", "a"]);
    assert!(is_usage(&err));
    assert_eq!(err.exit_code(), 1);

    // An empty path would resolve to the working directory
    assert!(is_usage(&parse_err(&["ldb", "--db=", "put", "--create_if_missing", "a", "b"])));
    assert!(is_usage(&parse_err(&["ldb", "get", "--db=", "a"])));
}

#[test]
fn test_hyphen_leading_positionals() {
    let invocation =
        parse_ok(&["ldb", "--db=/tmp/store", "put", "-k", "-1", "--create_if_missing"]);

    assert!(invocation.options.create_if_missing);
    assert_eq!(
        invocation.command,
        Command::Put {
            key: b"-k".to_vec(),
            value: b"-1".to_vec(),
        }
    );
}

#[test]
fn test_double_dash_ends_flags() {
    let invocation = parse_ok(&["ldb", "--db=/tmp/store", "put", "--", "--hex", "v"]);

    assert_eq!(
        invocation.command,
        Command::Put {
            key: b"--hex".to_vec(),
            value: b"v".to_vec(),
        }
    );
}

#[test]
fn test_valued_flags_need_equals() {
    assert!(is_usage(&parse_err(&["ldb", "--db=/tmp/store", "scan", "--from", "a"])));
    assert!(is_usage(&parse_err(&["ldb", "--db", "/tmp/store", "get", "a"])));
}

#[test]
fn test_unknown_command() {
    assert!(is_usage(&parse_err(&["ldb", "--db=/tmp/store", "frobnicate"])));
}

#[test]
fn test_no_command() {
    assert!(is_usage(&parse_err(&["ldb", "--db=/tmp/store"])));
}

#[test]
fn test_wrong_arity() {
    let cases: &[&[&str]] = &[
        &["get"],
        &["get", "a", "b"],
        &["put", "a"],
        &["put", "a", "b", "c"],
        &["delete"],
        &["batchput"],
        &["batchput", "a"],
        &["batchput", "a", "b", "c"],
        &["scan", "a"],
        &["dump", "a"],
        &["load", "a"],
        &["compact", "a"],
        &["dump_wal", "a"],
    ];

    for case in cases {
        let mut argv = vec!["ldb", "--db=/tmp/store"];
        argv.extend_from_slice(case);
        let err = parse_err(&argv);
        assert!(is_usage(&err), "{:?} gave {:?}", case, err);
    }
}

#[test]
fn test_inapplicable_flags_rejected() {
    let cases: &[&[&str]] = &[
        &["put", "--max_keys=1", "k", "v"],
        &["get", "--from=a", "k"],
        &["get", "--create_if_missing", "k"],
        &["delete", "--value_hex", "k"],
        &["dump", "--key_hex"],
        &["scan", "--count_only"],
        &["compact", "--max_keys=3"],
        &["reduce_levels", "--hex", "--new_levels=2"],
        &["dump_wal", "--hex"],
        &["load", "--from=a"],
    ];

    for case in cases {
        let mut argv = vec!["ldb", "--db=/tmp/store"];
        argv.extend_from_slice(case);
        assert!(is_usage(&parse_err(&argv)), "{:?} should be rejected", case);
    }
}

#[test]
fn test_bad_flag_values_rejected() {
    let cases: &[&[&str]] = &[
        &["put", "--hex=Boo", "a", "b"],
        &["put", "--create_if_missin", "a", "b"],
        &["scan", "--max_keys=abc"],
        &["scan", "--max_keys=-1"],
        &["reduce_levels", "--new_levels=0"],
        &["reduce_levels", "--new_levels=two"],
        &["--compression_type=gzip", "get", "a"],
        &["--auto_compaction=maybe", "get", "a"],
        &["--write_buffer_size=0", "get", "a"],
    ];

    for case in cases {
        let mut argv = vec!["ldb", "--db=/tmp/store"];
        argv.extend_from_slice(case);
        assert!(is_usage(&parse_err(&argv)), "{:?} should be rejected", case);
    }
}

#[test]
fn test_reduce_levels_requires_new_levels() {
    let err = parse_err(&["ldb", "--db=/tmp/store", "reduce_levels"]);
    assert!(is_usage(&err));
}

#[test]
fn test_bad_hex_argument() {
    let cases: &[&[&str]] = &[
        &["get", "--hex", "a1"],
        &["put", "--key_hex", "0x6", "v"],
        &["put", "--value_hex", "k", "zz"],
        &["scan", "--hex", "--from=abc"],
        &["batchput", "--hex", "0x61", "0x62", "0x63", "nothex"],
    ];

    for case in cases {
        let mut argv = vec!["ldb", "--db=/tmp/store"];
        argv.extend_from_slice(case);
        assert!(
            matches!(parse_err(&argv), LdbError::InvalidEncoding(_)),
            "{:?} should fail to decode",
            case
        );
    }
}

#[test]
fn test_validation_happens_before_open() {
    let ldb = Ldb::new();

    ldb.err(&["put", "--create_if_missin", "a", "b"]);
    ldb.err(&["put", "--create_if_missing", "--hex", "a", "b"]);
    ldb.err(&["batchput", "--create_if_missing", "a"]);

    assert!(!ldb.path().exists());
}

// =============================================================================
// Help / Version Tests
// =============================================================================

#[test]
fn test_help_exits_zero() {
    let err = run_argv(&["ldb", "--help"]).unwrap_err();

    match &err {
        LdbError::Help(text) => {
            for spec in COMMANDS {
                assert!(text.contains(spec.name), "help does not list {}", spec.name);
            }
        }
        other => panic!("Expected help, got {:?}", other),
    }
    assert_eq!(err.exit_code(), 0);
}

#[test]
fn test_subcommand_help_lists_its_flags() {
    match run_argv(&["ldb", "dump", "--help"]) {
        Err(LdbError::Help(text)) => {
            assert!(text.contains("--count_only"));
            assert!(!text.contains("--new_levels"));
        }
        other => panic!("Expected help, got {:?}", other),
    }
}

#[test]
fn test_version() {
    match run_argv(&["ldb", "--version"]) {
        Err(LdbError::Help(text)) => assert!(text.contains(ldbkit::VERSION)),
        other => panic!("Expected version, got {:?}", other),
    }
}
