use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "azpager",
    version,
    about = "List paged collections and drive long-running operations against Azure-style REST APIs"
)]
pub struct Cli {
    /// Configuration file, instead of ./azpager.toml
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Service endpoint, overrides the configured one
    #[arg(long, global = true, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Value for the api-version query parameter
    #[arg(long, global = true)]
    pub api_version: Option<String>,

    /// More log output on stderr (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print every item of a paged listing as one JSON line
    List(ListArgs),
    /// Start a long-running operation and wait for its result
    Run(RunArgs),
    /// GET a single resource
    Get(GetArgs),
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Path relative to the endpoint, or an absolute URL
    pub path: String,

    /// Print one summary line per page instead of the items
    #[arg(long)]
    pub pages: bool,

    /// Response field holding the items
    #[arg(long, value_name = "FIELD")]
    pub item_field: Option<String>,

    /// Response field holding the next link or continuation token
    #[arg(long, value_name = "FIELD")]
    pub link_field: Option<String>,

    /// Read the continuation token from this response header
    #[arg(long, value_name = "HEADER")]
    pub token_header: Option<String>,

    /// Echo the token back as this query parameter instead of following a link
    #[arg(long, value_name = "PARAM", conflicts_with = "echo_header")]
    pub echo_query: Option<String>,

    /// Echo the token back as this request header instead of following a link
    #[arg(long, value_name = "HEADER")]
    pub echo_header: Option<String>,

    /// Stop after this many pages
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    pub max_pages: Option<u64>,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// HTTP method of the initiating request, e.g. PUT
    pub method: String,

    /// Path relative to the endpoint, or an absolute URL
    pub path: String,

    /// JSON file sent as request body; `-` reads stdin
    #[arg(long, value_name = "FILE")]
    pub body: Option<PathBuf>,

    /// Poll interval when the service suggests none
    #[arg(long, value_name = "MS")]
    pub interval_ms: Option<u64>,

    /// Give up after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout_secs: Option<u64>,

    /// Path suffix of the cancel action on the status monitor, e.g. `:cancel`
    #[arg(long, value_name = "SUFFIX", conflicts_with = "cancel_delete")]
    pub cancel_suffix: Option<String>,

    /// Cancel by sending DELETE to the status monitor
    #[arg(long)]
    pub cancel_delete: bool,
}

#[derive(Debug, Args)]
pub struct GetArgs {
    /// Path relative to the endpoint, or an absolute URL
    pub path: String,
}
