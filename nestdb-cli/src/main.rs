//! One-shot nestdb client
//!
//! Builds a single request either from command line flags or from a JSON
//! file, sends it as one frame and prints the framed response.

use anyhow::{bail, Context, Result};
use clap::Parser;
use nestdb_core::protocol::{read_frame, write_frame, Request};
use nestdb_core::{Key, Value};
use std::path::PathBuf;
use tokio::net::TcpStream;

#[derive(Parser, Debug)]
#[command(name = "nestdb-cli")]
#[command(about = "Send one request to a nestdb server")]
#[command(version)]
struct Args {
    /// Request type: get, set, delete or exit
    #[arg(short = 't', long = "type")]
    kind: Option<String>,

    /// Key: a field name or a JSON array of names for nested access
    #[arg(short = 'k', long, value_parser = parse_key)]
    key: Option<Key>,

    /// Value for set: any JSON, bare words are sent as strings
    #[arg(short = 'v', long, value_parser = parse_value)]
    value: Option<Value>,

    /// Read the raw request JSON from this file instead of flags
    #[arg(short = 'i', long = "in")]
    file: Option<PathBuf>,

    /// Server address
    #[arg(short = 's', long, default_value = "127.0.0.1:15000")]
    server: String,
}

/// A key flag is either a JSON array of names or a bare field name.
fn parse_key(raw: &str) -> Result<Key, String> {
    if let Ok(key @ Key::Path(_)) = serde_json::from_str::<Key>(raw) {
        return Ok(key);
    }
    Ok(Key::Field(raw.to_string()))
}

/// A value flag is any JSON; input that does not parse is sent as a string.
fn parse_value(raw: &str) -> Result<Value, String> {
    Ok(serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string())))
}

fn build_payload(args: &Args) -> Result<Vec<u8>> {
    match (&args.file, &args.kind) {
        (Some(_), Some(_)) => {
            bail!("specify either --in <file> or --type <type>, not both")
        }
        (None, None) => {
            bail!("specify a request: --type <type> [--key ..] [--value ..], or --in <file>")
        }
        (Some(file), None) => {
            let content = std::fs::read_to_string(file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            Ok(content.into_bytes())
        }
        (None, Some(kind)) => {
            let request = Request::new(kind.clone(), args.key.clone(), args.value.clone());
            Ok(serde_json::to_vec(&request)?)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let payload = build_payload(&args)?;

    let mut stream = TcpStream::connect(&args.server)
        .await
        .with_context(|| format!("failed to connect to {}", args.server))?;

    write_frame(&mut stream, &payload).await?;
    println!("Sent: {}", String::from_utf8_lossy(&payload));

    let reply = read_frame(&mut stream).await?;
    println!("Received: {}", String::from_utf8_lossy(&reply));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_parsing() {
        assert_eq!(parse_key("name").unwrap(), Key::Field("name".into()));
        assert_eq!(
            parse_key(r#"["a","b"]"#).unwrap(),
            Key::Path(vec!["a".into(), "b".into()])
        );
        // a quoted string is still a plain field name
        assert_eq!(parse_key("\"x\"").unwrap(), Key::Field("\"x\"".into()));
    }

    #[test]
    fn test_value_parsing() {
        assert_eq!(parse_value("5").unwrap(), Value::Int(5));
        assert!(parse_value("{\"a\":1}").unwrap().is_object());
        assert_eq!(parse_value("plain text").unwrap(), Value::from("plain text"));
    }

    #[test]
    fn test_flag_exclusivity() {
        let args = Args::parse_from(["nestdb-cli", "-t", "exit", "--in", "x.json"]);
        assert!(build_payload(&args).is_err());
        let args = Args::parse_from(["nestdb-cli"]);
        assert!(build_payload(&args).is_err());
        let args = Args::parse_from(["nestdb-cli", "-t", "get", "-k", "name"]);
        let payload = build_payload(&args).unwrap();
        assert_eq!(
            String::from_utf8(payload).unwrap(),
            r#"{"type":"get","key":"name"}"#
        );
    }
}
