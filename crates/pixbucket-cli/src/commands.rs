use std::sync::Arc;

use anyhow::{bail, Context};
use colored::Colorize;
use serde_json::json;

use pixbucket_bucket::{Backend, BatchFailure, Bucket, BucketError};
use pixbucket_codec::Codec;
use pixbucket_gateway::DirectoryGateway;
use pixbucket_index::{FsIndexStore, IndexStore};
use pixbucket_types::Value;

use crate::cli::*;
use crate::config::CliConfig;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = CliConfig::load(&cli.config)?;
    let backend = open_backend(&config).await?;
    let format = cli.format;

    match cli.command {
        Command::New(args) => cmd_new(backend, args, format),
        Command::Put(args) => cmd_put(backend, args, format).await,
        Command::Get(args) => cmd_get(backend, args, format).await,
        Command::Rm(args) => cmd_rm(backend, args, format).await,
        Command::Ls(args) => cmd_ls(backend, args, format),
        Command::Drop(args) => cmd_drop(backend, args, format).await,
        Command::Buckets => cmd_buckets(backend, format),
    }
}

async fn open_backend(config: &CliConfig) -> anyhow::Result<Backend> {
    let gateway = DirectoryGateway::open(config.gateway.clone())
        .await
        .with_context(|| format!("opening image store at {}", config.gateway.root.display()))?;
    let index = FsIndexStore::open(config.index.clone())
        .with_context(|| format!("opening index at {}", config.index.root.display()))?;
    Ok(Backend::new(Arc::new(gateway), Arc::new(index)).with_codec(Codec::new(config.codec.clone())))
}

/// Split `NAME=VALUE` and parse the value as JSON unless `raw`.
fn parse_object(arg: &str, raw: bool) -> anyhow::Result<(String, Value)> {
    let (name, text) = arg
        .split_once('=')
        .with_context(|| format!("expected NAME=VALUE, got {arg:?}"))?;
    let value = if raw {
        Value::from(text)
    } else {
        let parsed: serde_json::Value = serde_json::from_str(text)
            .with_context(|| format!("value of {name:?} is not valid JSON (use --raw for plain text)"))?;
        Value::from(parsed)
    };
    Ok((name.to_string(), value))
}

fn print_json(value: &serde_json::Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_failures(failure: &BatchFailure) {
    for (name, reason) in &failure.failed {
        println!("  {} {} ({})", "failed:".red(), name, reason.dimmed());
    }
}

fn cmd_new(backend: Backend, args: NewArgs, format: OutputFormat) -> anyhow::Result<()> {
    let bucket: Bucket = match args.name {
        Some(name) => Bucket::new(name, backend)?,
        None => Bucket::create(backend)?,
    };
    match format {
        OutputFormat::Json => print_json(&json!({ "bucket": bucket.name() })),
        OutputFormat::Text => {
            println!("{} Created bucket {}", "✓".green().bold(), bucket.name().bold());
            Ok(())
        }
    }
}

async fn cmd_put(backend: Backend, args: PutArgs, format: OutputFormat) -> anyhow::Result<()> {
    let objects = args
        .objects
        .iter()
        .map(|arg| parse_object(arg, args.raw))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let mut bucket: Bucket = Bucket::open(&args.bucket, backend)?;
    let names: Vec<String> = objects.iter().map(|(name, _)| name.clone()).collect();
    for (name, value) in objects {
        bucket.stage(name, value)?;
    }

    let failure = match bucket.commit().await {
        Ok(()) => None,
        Err(BucketError::BatchFailed(failure)) => Some(failure),
        Err(e) => return Err(e.into()),
    };
    let uploaded: Vec<&String> = names
        .iter()
        .filter(|n| failure.as_ref().map_or(true, |f| !f.is_failed(n)))
        .collect();

    match format {
        OutputFormat::Json => print_json(&json!({
            "bucket": bucket.name(),
            "uploaded": uploaded,
            "failed": failure.as_ref().map(|f| f.failed.clone()).unwrap_or_default(),
        }))?,
        OutputFormat::Text => {
            for name in &uploaded {
                println!("  {} {}", "uploaded:".green(), name);
            }
            if let Some(failure) = &failure {
                print_failures(failure);
            }
        }
    }

    if let Some(failure) = failure {
        bail!("{failure}");
    }
    Ok(())
}

async fn cmd_get(backend: Backend, args: GetArgs, format: OutputFormat) -> anyhow::Result<()> {
    let bucket: Bucket = Bucket::load(&args.bucket, backend)?;
    let value = bucket.get(&args.name).await?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(&value.to_json())?),
        OutputFormat::Text => print_json(&value.to_json())?,
    }
    Ok(())
}

async fn cmd_rm(backend: Backend, args: RmArgs, format: OutputFormat) -> anyhow::Result<()> {
    let mut bucket: Bucket = Bucket::load(&args.bucket, backend)?;
    bucket.delete_obj(&args.name).await?;
    match format {
        OutputFormat::Json => print_json(&json!({ "deleted": args.name })),
        OutputFormat::Text => {
            println!("{} Deleted {} from {}", "✓".green().bold(), args.name.yellow(), bucket.name().bold());
            Ok(())
        }
    }
}

fn cmd_ls(backend: Backend, args: LsArgs, format: OutputFormat) -> anyhow::Result<()> {
    let bucket: Bucket = Bucket::load(&args.bucket, backend)?;
    let names = bucket.uploaded_names();

    match format {
        OutputFormat::Json => {
            let objects: Vec<serde_json::Value> = names
                .iter()
                .map(|name| {
                    let remote_id = bucket.remote_handle(name).map(|h| h.remote_id);
                    json!({ "name": name, "remote_id": remote_id })
                })
                .collect();
            print_json(&json!({ "bucket": bucket.name(), "objects": objects }))
        }
        OutputFormat::Text => {
            if names.is_empty() {
                println!("Bucket {} is empty.", bucket.name().bold());
            }
            for name in &names {
                match bucket.remote_handle(name) {
                    Some(handle) if args.long => println!("{}  {}", handle.remote_id.dimmed(), name),
                    _ => println!("{name}"),
                }
            }
            Ok(())
        }
    }
}

async fn cmd_drop(backend: Backend, args: DropArgs, format: OutputFormat) -> anyhow::Result<()> {
    let mut bucket: Bucket = Bucket::load(&args.bucket, backend)?;
    let count = bucket.uploaded_names().len();

    match bucket.delete_bucket().await {
        Ok(()) => match format {
            OutputFormat::Json => print_json(&json!({ "dropped": bucket.name(), "objects": count })),
            OutputFormat::Text => {
                println!(
                    "{} Dropped bucket {} ({} objects)",
                    "✓".green().bold(),
                    bucket.name().bold(),
                    count
                );
                Ok(())
            }
        },
        Err(BucketError::BatchFailed(failure)) => {
            if format == OutputFormat::Text {
                print_failures(&failure);
                println!("Bucket {} kept; run drop again to retry.", bucket.name().bold());
            }
            bail!("{failure}")
        }
        Err(e) => Err(e.into()),
    }
}

fn cmd_buckets(backend: Backend, format: OutputFormat) -> anyhow::Result<()> {
    let names = backend.index.list()?;
    match format {
        OutputFormat::Json => print_json(&json!(names)),
        OutputFormat::Text => {
            if names.is_empty() {
                println!("No buckets.");
            }
            for name in names {
                println!("{name}");
            }
            Ok(())
        }
    }
}
