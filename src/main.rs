use anyhow::{Context, Result};
use clap::Parser;
use hookcheck::cache::FileCache;
use hookcheck::cli::{Cli, Command, OutputFormat};
use hookcheck::config::HookcheckConfig;
use hookcheck::hooks::{ClassOverrides, HookTable, HostState, RewriteReport, Rewriter};
use hookcheck::reflect::ClassCatalog;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

fn load_config(cli: &Cli) -> Result<HookcheckConfig> {
    match &cli.config {
        Some(path) => HookcheckConfig::from_toml(path),
        None => Ok(HookcheckConfig::default()),
    }
}

#[derive(Serialize)]
struct GenerateOutput<'a> {
    report: &'a RewriteReport,
    overrides: &'a ClassOverrides,
}

/// Print a generation report in text form
fn print_report(report: &RewriteReport, host: &HostState) {
    for entry in &report.entries {
        println!(
            "{:<9} {} -> {} [{}] {}",
            format!("{:?}", entry.outcome).to_lowercase(),
            entry.target_class,
            entry.proxy_class,
            entry.cache_key,
            &entry.fingerprint[..12]
        );
    }
    println!(
        "{} proxies, {} written, {} skipped",
        report.entries.len(),
        report.written(),
        report.skipped
    );

    if !host.overrides.is_empty() {
        println!();
        println!("Class overrides:");
        for (original, proxy) in host.overrides.iter() {
            println!("  {} => {}", original, proxy);
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;

    match cli.command {
        Command::Generate {
            hooks,
            classes,
            format,
        } => {
            let catalog = ClassCatalog::from_file(&classes)?;
            let table = HookTable::from_toml(&hooks)?;
            let mut host = HostState::new(table);
            let mut cache = FileCache::new(config.cache_directory());

            let rewriter = Rewriter::from_config(catalog, &config);
            let report = rewriter
                .rewrite(&mut host, &mut cache)
                .context("Proxy generation failed")?;

            match format {
                OutputFormat::Text => print_report(&report, &host),
                OutputFormat::Json => {
                    let output = GenerateOutput {
                        report: &report,
                        overrides: &host.overrides,
                    };
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
            }
        }
        Command::Show {
            classes,
            target,
            new_name,
        } => {
            let catalog = ClassCatalog::from_file(&classes)?;
            let source = config
                .synthesizer()
                .synthesize(&catalog, &target, &new_name);
            println!("{}", source);
        }
        Command::Key { class } => {
            let rewriter = Rewriter::from_config(ClassCatalog::new(), &config);
            let key = rewriter.cache_key(&class)?;
            println!("{}", key);
        }
        Command::Flush => {
            let mut cache = FileCache::new(config.cache_directory());
            let removed = cache.flush()?;
            println!("Removed {} cache entries from {}", removed, cache.directory().display());
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);
    run(cli)
}
