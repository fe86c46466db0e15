//! Print the newest name operations as JSON lines
//!
//! Usage:
//!   cargo run --bin nameops_query -- [--page-size N] [--offset N] [--prefix P] [--with-value]
//!
//! Reads the same environment as `nameops_runtime` (NAMEOPS_DB_PATH, NAMEOPS_COLLECTION, ...).

use dotenv::dotenv;
use nameops::{open_backend, NameOp, NameOpFilter, PageRequest, RuntimeConfig, StoreSlot};
use std::env;

struct QueryArgs {
    page: PageRequest,
    filter: NameOpFilter,
}

fn parse_args(args: &[String]) -> Result<QueryArgs, String> {
    let mut page = PageRequest::default();
    let mut filter = NameOpFilter::default();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--page-size" => {
                page.page_size = next_number(&mut iter, "--page-size")?;
            }
            "--offset" => {
                page.offset = next_number(&mut iter, "--offset")?;
            }
            "--prefix" => {
                let prefix = iter.next().ok_or("--prefix needs a value")?;
                filter.name_prefix = Some(prefix.clone());
            }
            "--with-value" => filter.with_value_only = true,
            other => return Err(format!("unknown argument: {}", other)),
        }
    }

    Ok(QueryArgs { page, filter })
}

fn next_number<'a>(iter: &mut impl Iterator<Item = &'a String>, flag: &str) -> Result<usize, String> {
    iter.next()
        .ok_or_else(|| format!("{} needs a value", flag))?
        .parse()
        .map_err(|e| format!("{}: {}", flag, e))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let query = parse_args(&args)?;
    let config = RuntimeConfig::from_env()?;

    let slot = StoreSlot::new();
    let store = slot
        .get_or_open(open_backend(&config)?, config.store_options())
        .await?;

    let keep = |op: &NameOp| query.filter.matches(op);
    let ops = store.query(query.page, Some(&keep)).await?;
    for op in &ops {
        println!("{}", serde_json::to_string(op)?);
    }
    log::info!("Printed {} name operations", ops.len());

    if let Err(e) = slot.shutdown().await {
        log::error!("❌ {}", e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_args() {
        let parsed = parse_args(&args(&["--page-size", "5", "--offset", "10", "--prefix", "e/", "--with-value"])).unwrap();
        assert_eq!(parsed.page, PageRequest::new(5, 10));
        assert_eq!(parsed.filter.name_prefix.as_deref(), Some("e/"));
        assert!(parsed.filter.with_value_only);
    }

    #[test]
    fn test_parse_args_defaults_and_errors() {
        let parsed = parse_args(&[]).unwrap();
        assert_eq!(parsed.page, PageRequest::default());

        assert!(parse_args(&args(&["--offset"])).is_err());
        assert!(parse_args(&args(&["--page-size", "many"])).is_err());
        assert!(parse_args(&args(&["--verbose"])).is_err());
    }
}
