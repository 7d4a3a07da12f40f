//! Argument schema
//!
//! The whole flag surface of `ldb` is described by the static tables below:
//! which flags exist, their types, and which ones each command accepts.
//! [`build_cli`] turns the tables into a `clap::Command`, so making a flag
//! available to another command is a one-line change in [`COMMANDS`].

use clap::builder::PossibleValuesParser;
use clap::{value_parser, Arg, ArgAction, Command};

use crate::config::CompressionType;

/// Value type of a named flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagKind {
    /// `--flag` or `--flag=true|false`
    Bool,
    Str,
    /// Integer with an inclusive minimum
    Int { min: i64 },
    /// One of a fixed set of literals
    Enum(&'static [&'static str]),
}

/// A named `--flag`
#[derive(Debug, Clone, Copy)]
pub struct FlagSpec {
    pub name: &'static str,
    pub kind: FlagKind,
    pub help: &'static str,
}

/// Positional arguments a command takes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    None,
    /// Exactly these, in order
    Exact(&'static [&'static str]),
    /// One or more key/value pairs
    Pairs,
}

impl Arity {
    /// Whether `count` positional arguments satisfy this arity
    pub fn accepts(&self, count: usize) -> bool {
        match self {
            Arity::None => count == 0,
            Arity::Exact(names) => count == names.len(),
            Arity::Pairs => count > 0 && count % 2 == 0,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Arity::None => "no positional arguments".to_string(),
            Arity::Exact(names) => format!("<{}>", names.join("> <")),
            Arity::Pairs => "<key> <value> [<key> <value> ...]".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Get,
    Put,
    Delete,
    Scan,
    BatchPut,
    Dump,
    Load,
    Compact,
    ReduceLevels,
    DumpWal,
}

/// One row of the capability table
#[derive(Debug, Clone, Copy)]
pub struct CommandSpec {
    pub kind: CommandKind,
    pub name: &'static str,
    pub about: &'static str,
    pub arity: Arity,
    /// Command-specific flags it accepts (globals are always accepted)
    pub flags: &'static [&'static str],
    /// Flags that must be given
    pub required: &'static [&'static str],
}

impl CommandSpec {
    pub fn accepts(&self, flag: &str) -> bool {
        self.flags.contains(&flag)
    }
}

// =============================================================================
// Flag Names
// =============================================================================

pub const DB: &str = "db";
pub const HEX: &str = "hex";
pub const KEY_HEX: &str = "key_hex";
pub const VALUE_HEX: &str = "value_hex";
pub const CREATE_IF_MISSING: &str = "create_if_missing";
pub const DISABLE_WAL: &str = "disable_wal";
pub const FROM: &str = "from";
pub const TO: &str = "to";
pub const MAX_KEYS: &str = "max_keys";
pub const COUNT_ONLY: &str = "count_only";
pub const NEW_LEVELS: &str = "new_levels";
pub const WALFILE: &str = "walfile";
pub const HEADER: &str = "header";

pub const BLOOM_BITS: &str = "bloom_bits";
pub const COMPRESSION_TYPE: &str = "compression_type";
pub const BLOCK_SIZE: &str = "block_size";
pub const AUTO_COMPACTION: &str = "auto_compaction";
pub const WRITE_BUFFER_SIZE: &str = "write_buffer_size";
pub const FILE_SIZE: &str = "file_size";

/// Id of the catch-all positional argument
pub const POSITIONAL: &str = "args";

// =============================================================================
// Tables
// =============================================================================

/// Flags accepted by every command, before or after the command name
pub static GLOBAL_FLAGS: &[FlagSpec] = &[
    FlagSpec {
        name: DB,
        kind: FlagKind::Str,
        help: "Path of the store (required)",
    },
    FlagSpec {
        name: BLOOM_BITS,
        kind: FlagKind::Int { min: 0 },
        help: "Bloom filter bits per key",
    },
    FlagSpec {
        name: COMPRESSION_TYPE,
        kind: FlagKind::Enum(CompressionType::NAMES),
        help: "Block compression",
    },
    FlagSpec {
        name: BLOCK_SIZE,
        kind: FlagKind::Int { min: 1 },
        help: "Table block size in bytes",
    },
    FlagSpec {
        name: AUTO_COMPACTION,
        kind: FlagKind::Bool,
        help: "Compact level 0 automatically",
    },
    FlagSpec {
        name: WRITE_BUFFER_SIZE,
        kind: FlagKind::Int { min: 1 },
        help: "Memtable size in bytes before a flush",
    },
    FlagSpec {
        name: FILE_SIZE,
        kind: FlagKind::Int { min: 1 },
        help: "Target SSTable size in bytes",
    },
];

/// Command-specific flags
pub static FLAGS: &[FlagSpec] = &[
    FlagSpec {
        name: HEX,
        kind: FlagKind::Bool,
        help: "Keys and values are 0x-prefixed hex",
    },
    FlagSpec {
        name: KEY_HEX,
        kind: FlagKind::Bool,
        help: "Keys are 0x-prefixed hex",
    },
    FlagSpec {
        name: VALUE_HEX,
        kind: FlagKind::Bool,
        help: "Values are 0x-prefixed hex",
    },
    FlagSpec {
        name: CREATE_IF_MISSING,
        kind: FlagKind::Bool,
        help: "Create the store if it does not exist",
    },
    FlagSpec {
        name: DISABLE_WAL,
        kind: FlagKind::Bool,
        help: "Do not write the write-ahead log",
    },
    FlagSpec {
        name: FROM,
        kind: FlagKind::Str,
        help: "Inclusive lower bound",
    },
    FlagSpec {
        name: TO,
        kind: FlagKind::Str,
        help: "Exclusive upper bound",
    },
    FlagSpec {
        name: MAX_KEYS,
        kind: FlagKind::Int { min: 0 },
        help: "Stop after this many keys",
    },
    FlagSpec {
        name: COUNT_ONLY,
        kind: FlagKind::Bool,
        help: "Only print the number of keys",
    },
    FlagSpec {
        name: NEW_LEVELS,
        kind: FlagKind::Int { min: 1 },
        help: "Number of levels to keep",
    },
    FlagSpec {
        name: WALFILE,
        kind: FlagKind::Str,
        help: "WAL file to print (default: the store's)",
    },
    FlagSpec {
        name: HEADER,
        kind: FlagKind::Bool,
        help: "Print a column header line",
    },
];

pub static COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        kind: CommandKind::Get,
        name: "get",
        about: "Print the value of a key",
        arity: Arity::Exact(&["key"]),
        flags: &[HEX, KEY_HEX, VALUE_HEX],
        required: &[],
    },
    CommandSpec {
        kind: CommandKind::Put,
        name: "put",
        about: "Write a key/value pair",
        arity: Arity::Exact(&["key", "value"]),
        flags: &[HEX, KEY_HEX, VALUE_HEX, CREATE_IF_MISSING],
        required: &[],
    },
    CommandSpec {
        kind: CommandKind::Delete,
        name: "delete",
        about: "Delete a key",
        arity: Arity::Exact(&["key"]),
        flags: &[HEX, KEY_HEX],
        required: &[],
    },
    CommandSpec {
        kind: CommandKind::BatchPut,
        name: "batchput",
        about: "Write several key/value pairs atomically",
        arity: Arity::Pairs,
        flags: &[HEX, KEY_HEX, VALUE_HEX, CREATE_IF_MISSING],
        required: &[],
    },
    CommandSpec {
        kind: CommandKind::Scan,
        name: "scan",
        about: "Print the pairs in [from, to)",
        arity: Arity::None,
        flags: &[HEX, KEY_HEX, VALUE_HEX, FROM, TO, MAX_KEYS],
        required: &[],
    },
    CommandSpec {
        kind: CommandKind::Dump,
        name: "dump",
        about: "Write the pairs in [from, to) as a dump stream",
        arity: Arity::None,
        flags: &[HEX, FROM, TO, MAX_KEYS, COUNT_ONLY],
        required: &[],
    },
    CommandSpec {
        kind: CommandKind::Load,
        name: "load",
        about: "Read a dump stream from stdin and write every pair",
        arity: Arity::None,
        flags: &[HEX, CREATE_IF_MISSING, DISABLE_WAL],
        required: &[],
    },
    CommandSpec {
        kind: CommandKind::Compact,
        name: "compact",
        about: "Compact the key range [from, to)",
        arity: Arity::None,
        flags: &[HEX, FROM, TO],
        required: &[],
    },
    CommandSpec {
        kind: CommandKind::ReduceLevels,
        name: "reduce_levels",
        about: "Change the number of levels of the store",
        arity: Arity::None,
        flags: &[NEW_LEVELS],
        required: &[NEW_LEVELS],
    },
    CommandSpec {
        kind: CommandKind::DumpWal,
        name: "dump_wal",
        about: "Print the records of a write-ahead log file",
        arity: Arity::None,
        flags: &[WALFILE, HEADER],
        required: &[],
    },
];

/// Look up the capability row of a command
pub fn command_spec(kind: CommandKind) -> &'static CommandSpec {
    COMMANDS
        .iter()
        .find(|spec| spec.kind == kind)
        .unwrap_or_else(|| unreachable!("every CommandKind has a row in COMMANDS"))
}

pub fn command_by_name(name: &str) -> Option<&'static CommandSpec> {
    COMMANDS.iter().find(|spec| spec.name == name)
}

pub fn flag_spec(name: &str) -> Option<&'static FlagSpec> {
    GLOBAL_FLAGS.iter().chain(FLAGS.iter()).find(|f| f.name == name)
}

// =============================================================================
// clap Construction
// =============================================================================

/// Build the full `ldb` command tree from the tables
pub fn build_cli() -> Command {
    let mut cli = Command::new("ldb")
        .about("Inspect and maintain an ldbkit store")
        .version(crate::VERSION)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .disable_help_subcommand(true);

    for flag in GLOBAL_FLAGS {
        cli = cli.arg(build_arg(flag).global(true));
    }

    for spec in COMMANDS {
        cli = cli.subcommand(build_subcommand(spec));
    }

    cli
}

fn build_subcommand(spec: &CommandSpec) -> Command {
    let positional = Arg::new(POSITIONAL)
        .num_args(0..)
        .action(ArgAction::Append)
        .value_name("ARGS")
        .help(spec.arity.describe())
        .hide(spec.arity == Arity::None);

    let mut cmd = Command::new(spec.name).about(spec.about).arg(positional);

    for name in spec.flags {
        if let Some(flag) = flag_spec(name) {
            cmd = cmd.arg(build_arg(flag));
        }
    }

    cmd
}

fn build_arg(flag: &FlagSpec) -> Arg {
    let arg = Arg::new(flag.name).long(flag.name).help(flag.help);

    match flag.kind {
        FlagKind::Bool => arg
            .num_args(0..=1)
            .require_equals(true)
            .default_missing_value("true")
            .value_parser(value_parser!(bool)),
        FlagKind::Str => arg
            .num_args(1)
            .require_equals(true)
            .value_parser(value_parser!(String)),
        FlagKind::Int { min } => arg
            .num_args(1)
            .require_equals(true)
            .value_parser(value_parser!(i64).range(min..)),
        FlagKind::Enum(values) => arg
            .num_args(1)
            .require_equals(true)
            .value_parser(PossibleValuesParser::new(values.iter().copied())),
    }
}
