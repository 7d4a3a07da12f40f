//! Command router
//!
//! Turns an argument vector into a validated [`Invocation`] and runs it
//! against a store opened for exactly the duration of the command.
//!
//! Only `--name[=value]` tokens are flags. Every other token after the
//! command name is a positional, so raw keys and values may start with `-`.
//!
//! Validation happens completely before the store is opened:
//! 1. `--db` must be present and non-empty
//! 2. unknown or inapplicable flags are rejected (by the clap tree that
//!    `schema::build_cli` derives from the capability table)
//! 3. boolean, integer and enum flags must parse
//! 4. the positional count must match the command's arity
//! 5. keys, values and bounds are decoded with the selected encodings

use std::ffi::OsString;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use clap::error::ErrorKind;
use clap::ArgMatches;

use crate::config::{CompressionType, Config};
use crate::engine::Engine;
use crate::error::{LdbError, Result};

use super::codec::{decode, Encoding, EncodingMode};
use super::command::Command;
use super::schema::{self, CommandKind, CommandSpec};
use super::scan::KeyRange;
use super::{admin, dump, scan};

/// Options forwarded to the engine's open call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreOptions {
    pub create_if_missing: bool,
    pub disable_wal: bool,
    pub bloom_bits: Option<u32>,
    pub compression: Option<CompressionType>,
    pub block_size: Option<u64>,
    pub auto_compaction: Option<bool>,
    pub write_buffer_size: Option<usize>,
    pub file_size: Option<u64>,
}

impl StoreOptions {
    /// Engine config for the store at `db`
    pub fn to_config(&self, db: &Path) -> Config {
        let mut builder = Config::builder()
            .data_dir(db)
            .create_if_missing(self.create_if_missing)
            .disable_wal(self.disable_wal);

        if let Some(bits) = self.bloom_bits {
            builder = builder.bloom_bits(bits);
        }
        if let Some(compression) = self.compression {
            builder = builder.compression(compression);
        }
        if let Some(size) = self.block_size {
            builder = builder.block_size(size);
        }
        if let Some(enabled) = self.auto_compaction {
            builder = builder.auto_compaction(enabled);
        }
        if let Some(size) = self.write_buffer_size {
            builder = builder.write_buffer_size(size);
        }
        if let Some(size) = self.file_size {
            builder = builder.max_file_size(size);
        }

        builder.build()
    }
}

/// A validated command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub db: PathBuf,
    pub options: StoreOptions,
    pub command: Command,
}

/// Parse and validate an argument vector (including the program name)
pub fn parse<I, T>(argv: I) -> Result<Invocation>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = schema::build_cli()
        .try_get_matches_from(split_positionals(argv))
        .map_err(clap_error)?;

    let (name, sub) = matches
        .subcommand()
        .ok_or_else(|| LdbError::Usage("no command given".to_string()))?;
    let spec = schema::command_by_name(name)
        .ok_or_else(|| LdbError::Usage(format!("unknown command: {}", name)))?;
    let args = Args { matches: sub, spec };

    let db = args
        .string(schema::DB)
        .filter(|path| !path.is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| LdbError::Usage("--db=<path> is required".to_string()))?;

    for flag in spec.required {
        if !args.is_present(flag) {
            return Err(LdbError::Usage(format!(
                "{} requires --{}",
                spec.name, flag
            )));
        }
    }

    let positionals: Vec<String> = sub
        .get_many::<String>(schema::POSITIONAL)
        .map(|values| values.cloned().collect())
        .unwrap_or_default();
    if !spec.arity.accepts(positionals.len()) {
        return Err(LdbError::Usage(format!(
            "{} expects {}, got {} positional argument(s)",
            spec.name,
            spec.arity.describe(),
            positionals.len()
        )));
    }

    let options = store_options(&args)?;
    let command = build_command(&args, &positionals)?;

    Ok(Invocation {
        db,
        options,
        command,
    })
}

/// Rewrite argv so clap sees every non-flag token after the command as a
/// positional: `prog [flags] cmd [flags] -- [positionals]`
///
/// Tokens before the command name pass through unchanged. A literal `--`
/// after the command makes every later token a positional.
fn split_positionals<I, T>(argv: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut head = Vec::new();
    let mut flags = Vec::new();
    let mut positionals = Vec::new();
    let mut seen_command = false;
    let mut escaped = false;

    for (i, token) in argv.into_iter().map(Into::into).enumerate() {
        let is_flag = token.to_str().is_some_and(|t| t.starts_with("--"));
        if i == 0 || !seen_command {
            seen_command = i > 0 && !is_flag;
            head.push(token);
        } else if escaped || !is_flag {
            positionals.push(token);
        } else if token == "--" {
            escaped = true;
        } else {
            flags.push(token);
        }
    }

    head.extend(flags);
    if !positionals.is_empty() {
        head.push(OsString::from("--"));
        head.extend(positionals);
    }
    head
}

/// A store opened on first use
struct Store {
    config: Config,
    engine: Option<Engine>,
}

impl Store {
    fn engine(&mut self) -> Result<&Engine> {
        let engine = match self.engine.take() {
            Some(engine) => engine,
            None => Engine::open(self.config.clone())?,
        };
        Ok(self.engine.insert(engine))
    }

    fn wal_path(&self) -> PathBuf {
        self.config.data_dir.join(Engine::WAL_FILENAME)
    }
}

/// Run a validated invocation
///
/// Handlers that need the store open it once; it is closed on every path
/// out of the handler. Output goes to `out` as the handler produces it;
/// callers that must not show partial output on failure pass a buffer (see
/// [`run_with_io`]).
pub fn execute(invocation: Invocation, input: &mut dyn BufRead, out: &mut dyn Write) -> Result<()> {
    let mut store = Store {
        config: invocation.options.to_config(&invocation.db),
        engine: None,
    };
    let result = dispatch(&mut store, invocation.command, input, out);

    // A handler error takes precedence over a close error
    match store.engine {
        Some(engine) => result.and(engine.close()),
        None => result,
    }
}

/// Parse, execute, and write the output only if everything succeeded
pub fn run_with_io<I, T>(argv: I, input: &mut dyn BufRead, out: &mut dyn Write) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let invocation = parse(argv)?;
    tracing::debug!(
        command = ?invocation.command.kind(),
        db = %invocation.db.display(),
        "dispatching"
    );

    let mut buffer = Vec::new();
    execute(invocation, input, &mut buffer)?;

    out.write_all(&buffer)?;
    out.flush()?;
    Ok(())
}

fn dispatch(
    store: &mut Store,
    command: Command,
    input: &mut dyn BufRead,
    out: &mut dyn Write,
) -> Result<()> {
    match command {
        Command::Get { key, value_mode } => {
            let value = store.engine()?.get(&key)?.ok_or(LdbError::KeyNotFound)?;
            out.write_all(&super::codec::encode_bytes(&value, value_mode))?;
            out.write_all(b"\n")?;
        }
        Command::Put { key, value } => {
            store.engine()?.put(&key, &value)?;
            writeln!(out, "OK")?;
        }
        Command::Delete { key } => {
            store.engine()?.delete(&key)?;
            writeln!(out, "OK")?;
        }
        Command::BatchPut { pairs } => {
            store.engine()?.write_batch(pairs)?;
            writeln!(out, "OK")?;
        }
        Command::Scan {
            range,
            max_keys,
            encoding,
        } => {
            scan::run_scan(store.engine()?, &range, max_keys, encoding, out)?;
        }
        Command::Dump {
            range,
            max_keys,
            mode,
            count_only,
        } => {
            dump::dump(store.engine()?, &range, max_keys, mode, count_only, out)?;
        }
        Command::Load { mode } => {
            dump::load(store.engine()?, input, mode)?;
            writeln!(out, "OK")?;
        }
        Command::Compact { range } => {
            admin::compact(store.engine()?, &range)?;
            writeln!(out, "OK")?;
        }
        Command::ReduceLevels { new_levels } => {
            admin::reduce_levels(store.engine()?, new_levels)?;
            writeln!(out, "OK")?;
        }
        Command::DumpWal { walfile, header } => {
            // Opening the store would replay and truncate the log being inspected
            let path = walfile.unwrap_or_else(|| store.wal_path());
            admin::dump_wal(&path, header, out)?;
        }
    }
    Ok(())
}

// =============================================================================
// Typed Extraction
// =============================================================================

/// Flag access restricted to the flags the command accepts
struct Args<'a> {
    matches: &'a ArgMatches,
    spec: &'static CommandSpec,
}

impl<'a> Args<'a> {
    fn applies(&self, name: &str) -> bool {
        self.spec.accepts(name) || schema::GLOBAL_FLAGS.iter().any(|f| f.name == name)
    }

    fn is_present(&self, name: &str) -> bool {
        self.applies(name) && self.matches.value_source(name).is_some()
    }

    fn flag(&self, name: &str) -> bool {
        self.applies(name) && self.matches.get_one::<bool>(name).copied().unwrap_or(false)
    }

    fn optional_flag(&self, name: &str) -> Option<bool> {
        if !self.applies(name) {
            return None;
        }
        self.matches.get_one::<bool>(name).copied()
    }

    fn string(&self, name: &str) -> Option<&'a String> {
        if !self.applies(name) {
            return None;
        }
        self.matches.get_one::<String>(name)
    }

    fn int<N: TryFrom<i64>>(&self, name: &str) -> Result<Option<N>> {
        if !self.applies(name) {
            return Ok(None);
        }
        match self.matches.get_one::<i64>(name) {
            None => Ok(None),
            Some(&raw) => N::try_from(raw).map(Some).map_err(|_| {
                LdbError::Usage(format!("--{}={} is out of range", name, raw))
            }),
        }
    }

    /// `--from` / `--to`, decoded with the key encoding
    fn range(&self, mode: EncodingMode) -> Result<KeyRange> {
        let from = self.string(schema::FROM).map(|s| decode(s, mode)).transpose()?;
        let to = self.string(schema::TO).map(|s| decode(s, mode)).transpose()?;
        Ok(KeyRange::new(from, to))
    }
}

fn store_options(args: &Args<'_>) -> Result<StoreOptions> {
    let compression = args
        .string(schema::COMPRESSION_TYPE)
        .map(|s| s.parse::<CompressionType>())
        .transpose()?;

    Ok(StoreOptions {
        create_if_missing: args.flag(schema::CREATE_IF_MISSING),
        disable_wal: args.flag(schema::DISABLE_WAL),
        bloom_bits: args.int(schema::BLOOM_BITS)?,
        compression,
        block_size: args.int(schema::BLOCK_SIZE)?,
        auto_compaction: args.optional_flag(schema::AUTO_COMPACTION),
        write_buffer_size: args.int(schema::WRITE_BUFFER_SIZE)?,
        file_size: args.int(schema::FILE_SIZE)?,
    })
}

fn build_command(args: &Args<'_>, positionals: &[String]) -> Result<Command> {
    let encoding = Encoding::from_flags(
        args.flag(schema::HEX),
        args.flag(schema::KEY_HEX),
        args.flag(schema::VALUE_HEX),
    );

    let command = match args.spec.kind {
        CommandKind::Get => Command::Get {
            key: decode(&positionals[0], encoding.key)?,
            value_mode: encoding.value,
        },
        CommandKind::Put => Command::Put {
            key: decode(&positionals[0], encoding.key)?,
            value: decode(&positionals[1], encoding.value)?,
        },
        CommandKind::Delete => Command::Delete {
            key: decode(&positionals[0], encoding.key)?,
        },
        CommandKind::BatchPut => {
            // Every pair is decoded before anything is written
            let pairs = positionals
                .chunks_exact(2)
                .map(|pair| {
                    let key = decode(&pair[0], encoding.key)?;
                    let value = decode(&pair[1], encoding.value)?;
                    Ok((key, value))
                })
                .collect::<Result<Vec<_>>>()?;
            Command::BatchPut { pairs }
        }
        CommandKind::Scan => Command::Scan {
            range: args.range(encoding.key)?,
            max_keys: args.int(schema::MAX_KEYS)?,
            encoding,
        },
        CommandKind::Dump => Command::Dump {
            range: args.range(encoding.key)?,
            max_keys: args.int(schema::MAX_KEYS)?,
            mode: encoding.key,
            count_only: args.flag(schema::COUNT_ONLY),
        },
        CommandKind::Load => Command::Load { mode: encoding.key },
        CommandKind::Compact => Command::Compact {
            range: args.range(encoding.key)?,
        },
        CommandKind::ReduceLevels => Command::ReduceLevels {
            new_levels: args.int(schema::NEW_LEVELS)?.ok_or_else(|| {
                LdbError::Usage("reduce_levels requires --new_levels".to_string())
            })?,
        },
        CommandKind::DumpWal => Command::DumpWal {
            walfile: args.string(schema::WALFILE).map(PathBuf::from),
            header: args.flag(schema::HEADER),
        },
    };

    Ok(command)
}

fn clap_error(err: clap::Error) -> LdbError {
    let rendered = err.render().to_string();
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => LdbError::Help(rendered),
        _ => LdbError::Usage(rendered.trim_end().to_string()),
    }
}
