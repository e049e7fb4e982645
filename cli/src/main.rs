//! faultline CLI: build, decode and check service error records.
//!
//! Usage:
//! ```bash
//! # List registered kinds and their defaults
//! faultline kinds
//!
//! # Build an error and print its record
//! faultline new ValidationError --property email --message "Email is invalid" --json
//!
//! # Decode a record received from a peer
//! faultline decode --record '{"id":"1","errorType":"NotFoundError",...}'
//!
//! # Is this value one of ours?
//! faultline check --file response-body.json
//! ```

mod logging;

use std::env;
use std::fs;
use std::process;

use anyhow::{anyhow, bail, Context, Result};
use faultline_core::{codec, is_taxonomy_error, ErrorKind, ErrorOptions, Level, ServiceError};
use serde_json::{json, Value};

use logging::LogConfig;

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();
    let (log_config, args) = match split_log_flags(args) {
        Ok(split) => split,
        Err(e) => {
            eprintln!("Error: {e:#}");
            process::exit(1);
        }
    };
    logging::init_tracing(&log_config);

    if args.is_empty() {
        print_usage();
        process::exit(1);
    }

    let result = match args[0].as_str() {
        "kinds" => cmd_kinds(&args[1..]),
        "new" => cmd_new(&args[1..]),
        "decode" => cmd_decode(&args[1..]),
        "check" => match cmd_check(&args[1..]) {
            Ok(true) => Ok(()),
            Ok(false) => process::exit(2),
            Err(e) => Err(e),
        },
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        "version" | "--version" | "-V" => {
            println!("faultline {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            print_usage();
            process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn print_usage() {
    println!("faultline {}", env!("CARGO_PKG_VERSION"));
    println!("Build, decode and check service error records\n");
    println!("USAGE:");
    println!("    faultline [LOG FLAGS] <COMMAND>\n");
    println!("LOG FLAGS (before the command):");
    println!("    --log-level <LEVEL>          Default filter level (info)");
    println!("    --log-component <NAME=LEVEL> Per-crate level, repeatable");
    println!("    --log-config <PATH>          JSON file: level, components, json");
    println!("    --log-json                   JSON log lines on stderr\n");
    println!("COMMANDS:");
    println!("    kinds     List registered error kinds");
    println!("    new       Build an error of a kind");
    println!("    decode    Decode an error record");
    println!("    check     Exit 0 if a value is an error record, 2 otherwise");
    println!("    version   Print version");
    println!("    help      Print this help\n");
    println!("NEW:");
    println!("    faultline new <KIND> [FLAGS]");
    println!("    --message <TEXT>     Override the default message");
    println!("    --code <CODE>        Machine-readable code");
    println!("    --property <NAME>    Offending field");
    println!("    --status <N>         Override the status code");
    println!("    --level <LEVEL>      normal | critical");
    println!("    --help-text <TEXT>   Help text");
    println!("    --context <JSON|TEXT> Diagnostic context");
    println!("    --redirect <URL>     Redirect target");
    println!("    --wrap <MESSAGE>     Wrap a generic error with this message");
    println!("    --hide-stack         Leave the stack out of the record");
    println!("    --json               Output the record as JSON\n");
    println!("DECODE / CHECK:");
    println!("    --record <JSON>      Record as inline JSON");
    println!("    --file <PATH>        Read the record from a file");
    println!("    --json               Output as JSON (decode only)\n");
    println!("ENVIRONMENT:");
    println!("    {}         Tracing filter directive (overrides --log-level)", logging::LOG_ENV);
}

/// Read the global logging flags that precede the command. Scanning stops
/// at the first other argument, so command flag values are never consumed.
fn split_log_flags(args: Vec<String>) -> Result<(LogConfig, Vec<String>)> {
    let mut file = None;
    let mut level = None;
    let mut json = false;
    let mut components = Vec::new();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--log-level" => level = Some(take_value(&args, &mut i, "--log-level")?.to_string()),
            "--log-component" => {
                components.push(take_value(&args, &mut i, "--log-component")?.to_string())
            }
            "--log-config" => file = Some(take_value(&args, &mut i, "--log-config")?.to_string()),
            "--log-json" => json = true,
            _ => break,
        }
        i += 1;
    }

    let mut config = match file {
        Some(path) => LogConfig::load(path)?,
        None => LogConfig::default(),
    };
    if let Some(level) = level {
        config.level = level;
    }
    if json {
        config.json = true;
    }
    for spec in &components {
        config.set_component(spec)?;
    }
    Ok((config, args[i..].to_vec()))
}

fn take_value<'a>(args: &'a [String], i: &mut usize, flag: &str) -> Result<&'a str> {
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("{flag} requires a value"))
}

// ─── kinds ────────────────────────────────────────────────────────────────────

fn cmd_kinds(args: &[String]) -> Result<()> {
    let as_json = match args {
        [] => false,
        [flag] if flag == "--json" => true,
        [flag, ..] => bail!("Unknown flag: {flag}"),
    };

    if as_json {
        let kinds: Vec<Value> = ErrorKind::ALL
            .iter()
            .map(|k| {
                let d = k.defaults();
                json!({
                    "errorType": k.name(),
                    "statusCode": d.status_code,
                    "level": d.level,
                    "message": d.message,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&kinds)?);
    } else {
        for kind in ErrorKind::ALL {
            let d = kind.defaults();
            println!(
                "{:<28} {:>3}  {:<8}  {}",
                kind.name(),
                d.status_code,
                d.level.as_str(),
                d.message
            );
        }
    }
    Ok(())
}

// ─── new ──────────────────────────────────────────────────────────────────────

fn cmd_new(args: &[String]) -> Result<()> {
    let Some((kind_name, flags)) = args.split_first() else {
        bail!("new requires a kind name (see `faultline kinds`)");
    };
    let kind: ErrorKind = kind_name.parse()?;

    let mut options = ErrorOptions::new();
    let mut as_json = false;

    let mut i = 0;
    while i < flags.len() {
        match flags[i].as_str() {
            "--message" => options = options.message(take_value(flags, &mut i, "--message")?),
            "--code" => options = options.code(take_value(flags, &mut i, "--code")?),
            "--property" => options = options.property(take_value(flags, &mut i, "--property")?),
            "--redirect" => options = options.redirect(take_value(flags, &mut i, "--redirect")?),
            "--help-text" => options = options.help(take_value(flags, &mut i, "--help-text")?),
            "--status" => {
                let raw = take_value(flags, &mut i, "--status")?;
                let status: u16 = raw
                    .parse()
                    .with_context(|| format!("invalid status code: {raw}"))?;
                options = options.status_code(status);
            }
            "--level" => {
                let level: Level = take_value(flags, &mut i, "--level")?.parse()?;
                options = options.level(level);
            }
            "--context" => {
                let raw = take_value(flags, &mut i, "--context")?;
                let context = serde_json::from_str::<Value>(raw)
                    .unwrap_or_else(|_| Value::String(raw.to_string()));
                options = options.context(context);
            }
            "--wrap" => options = options.wrap(take_value(flags, &mut i, "--wrap")?),
            "--hide-stack" => options = options.hide_stack(true),
            "--json" => as_json = true,
            flag => bail!("Unknown flag: {flag}"),
        }
        i += 1;
    }

    tracing::debug!(error_type = %kind, "building error");
    let err = ServiceError::new(kind, options);
    output(&err, as_json)
}

// ─── decode / check ───────────────────────────────────────────────────────────

struct Input {
    text: String,
    as_json: bool,
}

fn read_input(args: &[String], allow_json_flag: bool) -> Result<Input> {
    let mut text = None;
    let mut as_json = false;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--record" => text = Some(take_value(args, &mut i, "--record")?.to_string()),
            "--file" => {
                let path = take_value(args, &mut i, "--file")?;
                text = Some(
                    fs::read_to_string(path).with_context(|| format!("reading {path}"))?,
                );
            }
            "--json" if allow_json_flag => as_json = true,
            flag => bail!("Unknown flag: {flag}"),
        }
        i += 1;
    }

    let text = text.ok_or_else(|| anyhow!("--record or --file is required"))?;
    Ok(Input { text, as_json })
}

fn cmd_decode(args: &[String]) -> Result<()> {
    let input = read_input(args, true)?;
    let err = codec::from_json(&input.text).context("decoding error record")?;
    output(&err, input.as_json)
}

fn cmd_check(args: &[String]) -> Result<bool> {
    let input = read_input(args, false)?;
    let value: Value = serde_json::from_str(&input.text).context("parsing JSON")?;
    let ours = is_taxonomy_error(&value);
    tracing::debug!(ours, "structural check");
    if ours {
        println!("yes: {}", value["errorType"].as_str().unwrap_or_default());
    } else {
        println!("no");
    }
    Ok(ours)
}

// ─── Output ───────────────────────────────────────────────────────────────────

fn output(err: &ServiceError, as_json: bool) -> Result<()> {
    if as_json {
        println!("{}", codec::to_json_pretty(err)?);
        return Ok(());
    }

    println!("{err}");
    println!("  Id:       {}", err.id());
    println!("  Status:   {}", err.status_code);
    println!("  Level:    {}", err.level);
    if let Some(code) = &err.code {
        println!("  Code:     {code}");
    }
    if let Some(property) = &err.property {
        println!("  Property: {property}");
    }
    if let Some(help) = &err.help {
        println!("  Help:     {help}");
    }
    if let Some(redirect) = &err.redirect {
        println!("  Redirect: {redirect}");
    }
    if let Some(context) = &err.context {
        println!("  Context:  {context}");
    }
    for (key, value) in &err.metadata {
        println!("  Meta:     {key}={value}");
    }
    if !err.hide_stack {
        if let Some(stack) = &err.stack {
            println!("  Stack:");
            for line in stack.lines() {
                println!("    {line}");
            }
        }
    }
    Ok(())
}
