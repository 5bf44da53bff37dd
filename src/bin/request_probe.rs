//! request-probe: 通过结构化结果客户端发出单个请求并输出 JSON
//!
//! Usage:
//!   request-probe <url> [--method <verb>] [--config <file.yaml>] [--level 0|1|2]
//!                       [--data <json>] [--header name:value]... [--token <access token>]
//!                       [--no-retry]

use anyhow::{anyhow, bail, Context};
use reqwest::Method;
use serde_json::json;
use service_request::client::NoRetry;
use service_request::notify::TracingNotifier;
use service_request::session::{InMemoryTokenStore, ACCESS_TOKEN_KEY};
use service_request::{
    BearerTokenHooks, ClientConfig, ExtractLevel, FlatRequestClient, RequestDescriptor,
};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

struct ProbeArgs {
    url: String,
    method: Method,
    config: Option<String>,
    level: ExtractLevel,
    data: Option<serde_json::Value>,
    headers: Vec<(String, String)>,
    token: Option<String>,
    no_retry: bool,
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }
    match args[1].as_str() {
        "help" | "--help" | "-h" => print_usage(),
        "version" | "--version" | "-V" => {
            println!("request-probe {}", env!("CARGO_PKG_VERSION"))
        }
        _ => {
            if let Err(e) = run(&args[1..]) {
                eprintln!("Error: {e:#}");
                std::process::exit(1);
            }
        }
    }
}

fn print_usage() {
    println!(
        r#"request-probe: issue one request and print the settled outcome

USAGE:
    request-probe <URL> [OPTIONS]

OPTIONS:
    --method <verb>          HTTP method (default GET)
    --config <file>          Client configuration YAML
    --level <0|1|2>          Extraction level (default 1)
    --data <json>            JSON request body
    --header <name:value>    Extra header, repeatable
    --token <token>          Access token sent as bearer authorization
    --no-retry               Disable automatic retry

ENVIRONMENT:
    RUST_LOG                             Log filter (default info)
    SERVICE_REQUEST_TIMEOUT_SECS         Transport timeout override
    SERVICE_REQUEST_PROXY_URL            Proxy for all requests
    SERVICE_REQUEST_MAX_RETRIES          Retry cap override"#
    );
}

fn parse_args(args: &[String]) -> anyhow::Result<ProbeArgs> {
    let mut iter = args.iter();
    let url = iter.next().ok_or_else(|| anyhow!("missing URL"))?.clone();
    let mut probe = ProbeArgs {
        url,
        method: Method::GET,
        config: None,
        level: ExtractLevel::default(),
        data: None,
        headers: Vec::new(),
        token: None,
        no_retry: false,
    };

    while let Some(flag) = iter.next() {
        let mut value = |name: &str| {
            iter.next()
                .cloned()
                .ok_or_else(|| anyhow!("{name} needs a value"))
        };
        match flag.as_str() {
            "--method" => {
                let m = value("--method")?;
                probe.method = Method::from_bytes(m.to_uppercase().as_bytes())
                    .with_context(|| format!("invalid method {m}"))?;
            }
            "--config" => probe.config = Some(value("--config")?),
            "--level" => {
                let level: u8 = value("--level")?.parse().context("--level must be 0, 1 or 2")?;
                probe.level = ExtractLevel::try_from(level).map_err(|e| anyhow!(e))?;
            }
            "--data" => {
                probe.data = Some(serde_json::from_str(&value("--data")?).context("--data is not JSON")?)
            }
            "--header" => {
                let raw = value("--header")?;
                let (name, v) = raw
                    .split_once(':')
                    .ok_or_else(|| anyhow!("--header expects name:value"))?;
                probe.headers.push((name.trim().to_string(), v.trim().to_string()));
            }
            "--token" => probe.token = Some(value("--token")?),
            "--no-retry" => probe.no_retry = true,
            other => bail!("unknown option {other}"),
        }
    }
    Ok(probe)
}

fn run(args: &[String]) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let probe = parse_args(args)?;
    let config = match &probe.config {
        Some(path) => ClientConfig::from_yaml_file(path)
            .with_context(|| format!("loading {path}"))?,
        None => ClientConfig::default(),
    };

    let tokens = match &probe.token {
        Some(token) => InMemoryTokenStore::new().with_token(ACCESS_TOKEN_KEY, token.clone()),
        None => InMemoryTokenStore::new(),
    };
    let tokens = Arc::new(tokens);

    let mut builder = FlatRequestClient::builder()
        .with_config(config)
        .with_hooks(Arc::new(BearerTokenHooks::new(tokens)))
        .with_notifier(Arc::new(TracingNotifier::default()));
    if probe.no_retry {
        builder = builder.with_retry_policy(Arc::new(NoRetry));
    }
    let client = builder.build_flat()?;

    let mut descriptor = RequestDescriptor::new(probe.method, probe.url).extract_level(probe.level);
    if let Some(body) = probe.data {
        descriptor = descriptor.json(body);
    }
    for (name, value) in &probe.headers {
        descriptor = descriptor.header(name, value);
    }

    let runtime = tokio::runtime::Runtime::new().context("starting runtime")?;
    let outcome = runtime.block_on(client.request(descriptor));

    let printed = json!({
        "ok": outcome.is_ok(),
        "status": outcome.response.as_ref().map(|r| r.status),
        "data": outcome.data.as_ref().map(|d| d.to_value()),
        "error": outcome.error.as_ref().map(|e| json!({
            "kind": e.kind(),
            "code": e.code(),
            "message": e.message(),
            "report": e.report(),
        })),
    });
    println!("{}", serde_json::to_string_pretty(&printed)?);

    if outcome.is_ok() {
        Ok(())
    } else {
        std::process::exit(2)
    }
}
