//! EmoGuard CLI
//!
//! CLI tool for compiling stored rules, guarding saved pages and checking
//! selectors before they are stored.

use std::fs;
use std::time::Instant;

use clap::{Parser, Subcommand};

use eg_compiler::{validate_pattern, Settings, StorageArea};
use eg_core::dom::Dom;
use eg_core::url::{extract_host, frame_domain};
use eg_core::{GuardEngine, HtmlDom, JAIL_ATTRIBUTE};

#[derive(Parser)]
#[command(name = "eg-cli")]
#[command(about = "EmoGuard rule compiler and page guard")]
struct Cli {
    /// Log engine activity (repeat for more)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the effective selectors for a domain
    Compile {
        /// `chrome.storage.sync` export (JSON)
        #[arg(short, long)]
        sync: Option<String>,

        /// `chrome.storage.local` export (JSON)
        #[arg(short, long)]
        local: Option<String>,

        /// Domain whose RuleSet is merged with the all-sites RuleSet
        #[arg(short, long)]
        domain: String,
    },

    /// Run the guard engine over a saved HTML page
    Guard {
        /// Page to guard
        #[arg(short, long)]
        input: String,

        /// Where to write the guarded page; stdout if omitted
        #[arg(short, long)]
        output: Option<String>,

        /// `chrome.storage.sync` export (JSON); fresh-install defaults if omitted
        #[arg(short, long)]
        sync: Option<String>,

        /// `chrome.storage.local` export (JSON)
        #[arg(short, long)]
        local: Option<String>,

        /// Page URL, used to pick the domain's RuleSet
        #[arg(short, long, default_value = "https://localhost/")]
        url: String,

        /// Extra keyword (repeatable), added to the stored ones
        #[arg(short, long)]
        keyword: Vec<String>,
    },

    /// Check selectors the way the authoring UI does
    Validate {
        /// Selectors to check
        #[arg(required = true)]
        selectors: Vec<String>,
    },

    /// Print the storage contents written on first run
    Defaults,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Compile { sync, local, domain } => cmd_compile(sync.as_deref(), local.as_deref(), &domain),
        Commands::Guard {
            input,
            output,
            sync,
            local,
            url,
            keyword,
        } => cmd_guard(&input, output.as_deref(), sync.as_deref(), local.as_deref(), &url, keyword),
        Commands::Validate { selectors } => cmd_validate(&selectors),
        Commands::Defaults => cmd_defaults(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn read_area(path: Option<&str>) -> Result<Option<StorageArea>, String> {
    let Some(path) = path else {
        return Ok(None);
    };
    let json = fs::read_to_string(path).map_err(|e| format!("Failed to read '{}': {}", path, e))?;
    StorageArea::from_json(&json)
        .map(Some)
        .map_err(|e| format!("Failed to parse '{}': {}", path, e))
}

fn load_settings(sync: Option<&str>, local: Option<&str>) -> Result<Settings, String> {
    let sync = read_area(sync)?.unwrap_or_else(StorageArea::fresh_install);
    let local = read_area(local)?.unwrap_or_default();
    Ok(Settings::resolve(&sync, &local))
}

fn cmd_compile(sync: Option<&str>, local: Option<&str>, domain: &str) -> Result<(), String> {
    let settings = load_settings(sync, local)?;
    let state = settings.engine_state(domain);

    println!("Domain: {}", domain);
    println!("  Enabled:         {}", state.enabled);
    println!("  Keywords:        {}", state.keywords.len());
    println!("  Element shallow: {}", state.selectors.element_shallow);
    println!("  Element deep:    {}", state.selectors.element_deep);
    println!("  Text:            {}", state.selectors.text);

    Ok(())
}

fn cmd_guard(
    input: &str,
    output: Option<&str>,
    sync: Option<&str>,
    local: Option<&str>,
    url: &str,
    extra_keywords: Vec<String>,
) -> Result<(), String> {
    let html = fs::read_to_string(input).map_err(|e| format!("Failed to read '{}': {}", input, e))?;
    let host = extract_host(url).ok_or_else(|| format!("No host in URL '{}'", url))?;
    let domain = frame_domain(&[], host).unwrap_or_default();

    let settings = load_settings(sync, local)?;
    let mut state = settings.engine_state(&domain);
    state.keywords.extend(extra_keywords);
    if !state.is_armed() {
        log::warn!("engine is disabled or has no keywords; the page is unchanged");
    }

    let start = Instant::now();
    let mut engine = GuardEngine::new(HtmlDom::parse(&html), state);
    let jailed = engine
        .guard_current()
        .map_err(|e| format!("Guard pass failed: {}", e))?;
    let elapsed = start.elapsed();

    let placeholders = engine
        .dom()
        .query_all_documents(&format!("[{JAIL_ATTRIBUTE}]"))
        .map_err(|e| e.to_string())?
        .len();
    let guarded = engine.dom().to_html();

    match output {
        Some(path) => fs::write(path, &guarded).map_err(|e| format!("Failed to write '{}': {}", path, e))?,
        None => println!("{}", guarded),
    }

    eprintln!("Guarded '{}' for {}", input, domain);
    eprintln!("  Jailed:       {}", jailed);
    eprintln!("  Placeholders: {}", placeholders);
    eprintln!("  Time:         {:.1}ms", elapsed.as_secs_f64() * 1000.0);

    Ok(())
}

fn cmd_validate(selectors: &[String]) -> Result<(), String> {
    let mut invalid = 0usize;
    for selector in selectors {
        match validate_pattern(selector) {
            Ok(normalized) => println!("ok       {}", normalized),
            Err(e) => {
                println!("invalid  {}", e);
                invalid += 1;
            }
        }
    }

    if invalid > 0 {
        return Err(format!("{} of {} selectors are invalid", invalid, selectors.len()));
    }
    Ok(())
}

fn cmd_defaults() -> Result<(), String> {
    let defaults = serde_json::to_string_pretty(&StorageArea::fresh_install()).map_err(|e| e.to_string())?;
    println!("{}", defaults);
    Ok(())
}
