use crate::args::{Cli, Command, GetArgs, ListArgs, RunArgs};
use anyhow::{Context, Result, bail};
use azpager_client::auth::EnvTokenCredential;
use azpager_client::builder::{ClientBuilder, ClientConfig, ListOptions, LroOptions, ServiceClient};
use azpager_client::common::ClientError;
use azpager_client::http::{CancelRoute, Method, TokenPlacement};
use azpager_client::model::Page;
use futures::TryStreamExt;
use serde_json::{Value, json};
use std::io::{Read, Write};
use std::path::Path;
use std::time::Duration;

/// Runs the parsed command, writing results to stdout.
pub async fn execute(cli: Cli, config: ClientConfig) -> Result<()> {
    let client = build_client(config)?;
    let mut stdout = std::io::stdout().lock();

    match cli.command {
        Command::List(args) => list(&client, &args, &mut stdout).await,
        Command::Run(args) => run(&client, &args, &mut stdout).await,
        Command::Get(args) => get(&client, &args, &mut stdout).await,
    }
}

/// Bearer tokens are taken from `AZPAGER_TOKEN` when it is set.
pub fn build_client(config: ClientConfig) -> Result<ServiceClient> {
    let mut builder = ClientBuilder::new(config);
    if EnvTokenCredential::is_configured() {
        log::debug!("Authenticating with the token from the environment");
        builder = builder.credential(EnvTokenCredential::new());
    }
    builder.build().context("Failed to create the service client")
}

pub fn list_options(args: &ListArgs) -> ListOptions {
    let token_placement = match (&args.echo_query, &args.echo_header) {
        (Some(param), _) => TokenPlacement::Query(param.clone()),
        (None, Some(header)) => TokenPlacement::Header(header.clone()),
        (None, None) => TokenPlacement::NextLink,
    };

    ListOptions {
        item_field: args.item_field.clone(),
        link_field: args.link_field.clone(),
        token_header: args.token_header.clone(),
        token_placement,
        max_pages: args.max_pages.and_then(|n| usize::try_from(n).ok()),
        ..Default::default()
    }
}

pub async fn list<W: Write>(client: &ServiceClient, args: &ListArgs, out: &mut W) -> Result<()> {
    let pager = client.list::<Value>(&args.path, list_options(args))?;

    if args.pages {
        let mut pages = pager.as_pages();
        let mut index = 0usize;
        while let Some(page) = pages.try_next().await? {
            index += 1;
            writeln!(out, "{}", page_summary(index, &page))?;
        }
        log::info!("Listed {index} page(s) of {}", args.path);
    } else {
        let mut items = pager.as_sequence();
        let mut count = 0usize;
        while let Some(item) = items.try_next().await? {
            count += 1;
            writeln!(out, "{item}")?;
        }
        log::info!("Listed {count} item(s) of {}", args.path);
    }

    Ok(())
}

fn page_summary(index: usize, page: &Page<Value>) -> Value {
    json!({
        "page": index,
        "items": page.len(),
        "has_more": page.has_more(),
        "total_count": page.total_count,
        "request_id": page.metadata.request_id,
        "request_charge": page.metadata.request_charge,
    })
}

pub fn parse_method(raw: &str) -> Result<Method> {
    Method::from_bytes(raw.to_uppercase().as_bytes())
        .with_context(|| format!("Invalid HTTP method '{raw}'"))
}

/// Reads a JSON body from `path`, or from stdin for `-`.
pub fn read_body(path: &Path) -> Result<Value> {
    let raw = if path == Path::new("-") {
        let mut raw = String::new();
        std::io::stdin()
            .read_to_string(&mut raw)
            .context("Failed to read request body from stdin")?;
        raw
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read request body from {}", path.display()))?
    };

    serde_json::from_str(&raw).context("Request body is not valid JSON")
}

fn lro_options(args: &RunArgs) -> LroOptions {
    let cancel = match (&args.cancel_suffix, args.cancel_delete) {
        (Some(suffix), _) => Some(CancelRoute::PollUrlSuffix(suffix.clone())),
        (None, true) => Some(CancelRoute::DeletePollUrl),
        (None, false) => None,
    };

    LroOptions {
        poll_interval: args.interval_ms.map(Duration::from_millis),
        cancel,
        ..Default::default()
    }
}

/// Starts the operation and waits for it. Ctrl-C stops waiting and, when a
/// cancel route is configured, asks the service to cancel.
pub async fn run<W: Write>(client: &ServiceClient, args: &RunArgs, out: &mut W) -> Result<()> {
    let method = parse_method(&args.method)?;
    let body = args.body.as_deref().map(read_body).transpose()?;

    let mut poller = client
        .begin::<Value>(method, &args.path, body, lro_options(args))
        .await
        .with_context(|| format!("Failed to start {} {}", args.method, args.path))?;
    eprintln!(
        "Operation {} accepted: {}",
        poller.operation_id().unwrap_or("<unnamed>"),
        poller.status()
    );

    let interval = args
        .interval_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| client.poll_interval());
    let timeout = args
        .timeout_secs
        .map(Duration::from_secs)
        .unwrap_or_else(|| client.operation_timeout());

    let token = poller.cancellation_token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Interrupted, stopping...");
            token.cancel();
        }
    });
    let outcome = poller.wait_for_completion(interval, timeout).await;
    interrupt.abort();

    match outcome {
        Ok(value) => {
            eprintln!(
                "Operation finished after {} poll(s): {}",
                poller.poll_count(),
                poller.status()
            );
            writeln!(out, "{}", serde_json::to_string_pretty(&value)?)?;
            Ok(())
        }
        Err(ClientError::OperationCancelled { .. }) if !poller.is_done() => {
            if !poller.supports_cancel() {
                bail!("Stopped waiting; the operation may still be running on the service");
            }
            poller
                .cancel()
                .await
                .context("Failed to cancel the operation on the service")?;
            bail!("Operation cancelled")
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn get<W: Write>(client: &ServiceClient, args: &GetArgs, out: &mut W) -> Result<()> {
    let value: Value = client.get(&args.path).await?;
    writeln!(out, "{}", serde_json::to_string_pretty(&value)?)?;
    Ok(())
}
