use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "pixbucket",
    about = "pixbucket: object buckets stored as images",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// TOML configuration file; defaults apply if it does not exist
    #[arg(short, long, global = true, default_value = "pixbucket.toml")]
    pub config: PathBuf,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a new bucket
    New(NewArgs),
    /// Upload one or more objects in a single batch
    Put(PutArgs),
    /// Print an object as JSON
    Get(GetArgs),
    /// Delete one object
    Rm(RmArgs),
    /// List the objects in a bucket
    Ls(LsArgs),
    /// Delete a bucket and every object in it
    Drop(DropArgs),
    /// List known buckets
    Buckets,
}

#[derive(Args)]
pub struct NewArgs {
    /// Bucket name; a random one is chosen when omitted
    pub name: Option<String>,
}

#[derive(Args)]
pub struct PutArgs {
    pub bucket: String,
    /// Objects as NAME=JSON
    #[arg(required = true)]
    pub objects: Vec<String>,
    /// Store values as plain strings instead of parsing JSON
    #[arg(long)]
    pub raw: bool,
}

#[derive(Args)]
pub struct GetArgs {
    pub bucket: String,
    pub name: String,
}

#[derive(Args)]
pub struct RmArgs {
    pub bucket: String,
    pub name: String,
}

#[derive(Args)]
pub struct LsArgs {
    pub bucket: String,
    /// Show remote ids
    #[arg(short, long)]
    pub long: bool,
}

#[derive(Args)]
pub struct DropArgs {
    pub bucket: String,
}
