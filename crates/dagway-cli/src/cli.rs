use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "dagway",
    about = "dagway: serve content-addressed files over HTTP",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Serve a local directory through the gateway
    Serve(ServeArgs),
    /// Print the content identifier of a file or directory
    Hash(HashArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Address to listen on
    #[arg(long)]
    pub bind: Option<SocketAddr>,
    /// Reserved path prefix
    #[arg(long)]
    pub prefix: Option<String>,
    /// File or directory to serve
    #[arg(long)]
    pub root: Option<PathBuf>,
}

#[derive(Args)]
pub struct HashArgs {
    pub path: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_serve() {
        let cli = Cli::try_parse_from([
            "dagway", "serve", "--bind", "0.0.0.0:8080", "--root", "site", "--prefix", "dag",
        ])
        .unwrap();
        if let Command::Serve(args) = cli.command {
            assert_eq!(args.bind, Some("0.0.0.0:8080".parse().unwrap()));
            assert_eq!(args.root, Some(PathBuf::from("site")));
            assert_eq!(args.prefix.as_deref(), Some("dag"));
            assert!(args.config.is_none());
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn serve_rejects_bad_address() {
        assert!(Cli::try_parse_from(["dagway", "serve", "--bind", "nowhere"]).is_err());
    }

    #[test]
    fn parse_hash() {
        let cli = Cli::try_parse_from(["dagway", "hash", "./public"]).unwrap();
        if let Command::Hash(args) = cli.command {
            assert_eq!(args.path, PathBuf::from("./public"));
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_verbose() {
        let cli = Cli::try_parse_from(["dagway", "--verbose", "hash", "."]).unwrap();
        assert!(cli.verbose);
    }

    #[test]
    fn parse_json_format() {
        let cli = Cli::try_parse_from(["dagway", "--format", "json", "hash", "."]).unwrap();
        assert!(matches!(cli.format, OutputFormat::Json));
    }
}
