//! TallyKV CLI Client
//!
//! One-shot command-line interface: sends a single command and prints
//! the reply.

use clap::{Parser, Subcommand};
use tallykv::protocol::Reply;
use tallykv::Client;

/// TallyKV CLI
#[derive(Parser, Debug)]
#[command(name = "tallykv-cli")]
#[command(about = "CLI for the TallyKV key-value store")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:8962")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get { key: String },

    /// Set a key-value pair (clears any expiry)
    Set { key: String, value: String },

    /// Delete a key
    Del { key: String },

    /// Check whether a key exists
    Exists { key: String },

    /// Expire a key after a number of seconds
    Expire {
        key: String,
        #[arg(allow_negative_numbers = true)]
        seconds: i64,
    },

    /// Remove the expiry of a key
    Persist { key: String },

    /// Seconds until a key expires (-1 no expiry, -2 no key)
    Ttl { key: String },

    /// Add to an integer value, e.g. `incr-by hits 1 CONSTRAINT LE 100`
    IncrBy {
        key: String,
        #[arg(allow_hyphen_values = true)]
        delta: String,
        /// Constraint clauses
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        constraints: Vec<String>,
    },

    /// Add to a decimal value
    IncrByFloat {
        key: String,
        #[arg(allow_hyphen_values = true)]
        delta: String,
        /// Constraint clauses
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        constraints: Vec<String>,
    },

    /// List keys from a cursor ("" starts at the beginning)
    Scan {
        #[arg(default_value = "")]
        cursor: String,
        /// Only keys with this prefix
        #[arg(long)]
        prefix: Option<String>,
        /// Descending order
        #[arg(long)]
        reverse: bool,
        /// Print values next to keys
        #[arg(long)]
        values: bool,
    },

    /// Stop the server
    Shutdown,
}

impl Commands {
    /// Command name and arguments as sent on the wire
    fn into_request(self) -> (&'static str, Vec<String>) {
        match self {
            Commands::Get { key } => ("Get", vec![key]),
            Commands::Set { key, value } => ("Set", vec![key, value]),
            Commands::Del { key } => ("Del", vec![key]),
            Commands::Exists { key } => ("Exists", vec![key]),
            Commands::Expire { key, seconds } => ("Expire", vec![key, seconds.to_string()]),
            Commands::Persist { key } => ("Persist", vec![key]),
            Commands::Ttl { key } => ("Ttl", vec![key]),
            Commands::IncrBy {
                key,
                delta,
                constraints,
            } => ("IncrBy", [vec![key, delta], constraints].concat()),
            Commands::IncrByFloat {
                key,
                delta,
                constraints,
            } => ("IncrByFloat", [vec![key, delta], constraints].concat()),
            Commands::Scan {
                cursor,
                prefix,
                reverse,
                values,
            } => {
                let mut args = vec![cursor];
                if let Some(prefix) = prefix {
                    args.push("PREFIX".into());
                    args.push(prefix);
                }
                if reverse {
                    args.push("WITH_REVERSE".into());
                }
                if values {
                    args.push("WITH_VALUE".into());
                }
                ("Scan", args)
            }
            Commands::Shutdown => ("Shutdown", Vec::new()),
        }
    }
}

fn main() {
    let args = Args::parse();

    let mut client = match Client::connect(&args.server) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    };

    let (name, command_args) = args.command.into_request();
    let request = tallykv::protocol::Request::new(name, command_args);

    match client.request(&request) {
        Ok(Reply::Error(message)) => {
            eprintln!("(error) {}", message);
            std::process::exit(1);
        }
        Ok(reply) => print_reply(&reply, 0),
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    }
}

fn print_reply(reply: &Reply, indent: usize) {
    let pad = " ".repeat(indent);
    match reply {
        Reply::Simple(text) => println!("{}{}", pad, text),
        Reply::Error(message) => println!("{}(error) {}", pad, message),
        Reply::Integer(n) => println!("{}(integer) {}", pad, n),
        Reply::Bulk(bytes) => println!("{}\"{}\"", pad, String::from_utf8_lossy(bytes)),
        Reply::Null => println!("{}(nil)", pad),
        Reply::Array(items) if items.is_empty() => println!("{}(empty array)", pad),
        Reply::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                print!("{}{}) ", pad, i + 1);
                print_reply(item, 0);
            }
        }
    }
}
