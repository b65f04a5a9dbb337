use std::path::Path;

use anyhow::Context;
use colored::Colorize;
use serde_json::json;

use dagway_server::{DagwayServer, ServerConfig};
use dagway_store::hash_path;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => cmd_serve(args),
        Command::Hash(args) => cmd_hash(args, &cli.format),
    }
}

/// Apply command-line overrides on top of the file (or default) configuration.
fn load_config(args: &ServeArgs) -> anyhow::Result<ServerConfig> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::from_file(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(prefix) = &args.prefix {
        config.gateway.prefix = prefix.clone();
    }
    if let Some(root) = &args.root {
        config.root = Some(root.clone());
    }
    Ok(config)
}

fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let config = load_config(&args)?;
    let base = format!("http://{}{}", config.bind_addr, config.gateway.mount_point());

    match &config.root {
        Some(root) => {
            let cid = hash_path(root).with_context(|| format!("cannot read {}", root.display()))?;
            println!("{} Serving {}", "✓".green().bold(), root.display().to_string().bold());
            println!("  Root: {}", cid.to_string().yellow());
            println!("  URL:  {}", format!("{base}/{cid}/").cyan());
        }
        None => {
            println!("{} No root given; the node starts empty.", "!".yellow().bold());
            println!("  Gateway: {}", format!("{base}/").cyan());
        }
    }

    let server = DagwayServer::new(config)?;
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(server.serve())?;
    Ok(())
}

fn cmd_hash(args: HashArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let cid = hash_path(&args.path)
        .with_context(|| format!("cannot read {}", args.path.display()))?;
    match format {
        OutputFormat::Text => println!("{}  {}", cid.to_string().yellow(), display(&args.path)),
        OutputFormat::Json => println!(
            "{}",
            json!({
                "path": display(&args.path),
                "cid": cid.to_string(),
                "codec": cid.codec().to_string(),
            })
        ),
    }
    Ok(())
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("dagway.toml");
        std::fs::write(
            &file,
            "bind_addr = \"127.0.0.1:7000\"\nroot = \"from-file\"\n[gateway]\nprefix = \"dag\"\n",
        )
        .unwrap();

        let cli = Cli::try_parse_from([
            "dagway",
            "serve",
            "--config",
            file.to_str().unwrap(),
            "--root",
            "from-flag",
        ])
        .unwrap();
        let Command::Serve(args) = cli.command else { panic!("wrong command") };
        let config = load_config(&args).unwrap();

        assert_eq!(config.bind_addr.port(), 7000);
        assert_eq!(config.gateway.prefix, "dag");
        assert_eq!(config.root, Some("from-flag".into()));
    }

    #[test]
    fn defaults_without_config() {
        let cli = Cli::try_parse_from(["dagway", "serve", "--prefix", "content"]).unwrap();
        let Command::Serve(args) = cli.command else { panic!("wrong command") };
        let config = load_config(&args).unwrap();
        assert_eq!(config.gateway.mount_point(), "/content");
        assert!(config.root.is_none());
    }

    #[test]
    fn hash_of_missing_path_fails() {
        let args = HashArgs { path: "/nonexistent/dagway".into() };
        assert!(cmd_hash(args, &OutputFormat::Text).is_err());
    }

    #[test]
    fn hash_of_directory_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "a").unwrap();
        let args = HashArgs { path: dir.path().to_path_buf() };
        assert!(cmd_hash(args, &OutputFormat::Json).is_ok());
    }
}
