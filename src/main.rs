use std::path::PathBuf;

use anyhow::{ensure, Context};
use clap::Parser;
use findmark::config::types::Config;
use findmark::dom::load::load_path;
use findmark::dom::serialize::{outline, to_markup};
use findmark::search::overlay::search_bar_view;
use findmark::search::{SearchOptions, SearchSession};

/// Find and highlight every match of a query in an XHTML or Markdown document.
#[derive(Parser, Debug)]
#[command(name = "findmark", version, about)]
struct CliArgs {
    /// Config file path override.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Match case exactly.
    #[arg(long)]
    case_sensitive: bool,

    /// Treat the query as a regular expression.
    #[arg(long)]
    regex: bool,

    /// Print a JSON report instead of markup.
    #[arg(long)]
    json: bool,

    /// Advance the cursor this many times before printing.
    #[arg(long, value_name = "N", default_value_t = 0)]
    next: usize,

    /// Print the default configuration and exit.
    #[arg(long)]
    print_default_config: bool,

    /// Document to search (.md/.markdown as Markdown, anything else as XHTML).
    #[arg(required_unless_present = "print_default_config")]
    file: Option<PathBuf>,

    /// Text or pattern to find.
    #[arg(required_unless_present = "print_default_config")]
    query: Option<String>,
}

fn main() {
    let args = CliArgs::parse();

    if args.print_default_config {
        print!("{}", Config::print_default());
        return;
    }

    env_logger::init();

    if let Err(e) = run(args) {
        log::error!("findmark failed: {e:#}");
        eprintln!("findmark: {e:#}");
        std::process::exit(1);
    }
}

fn run(args: CliArgs) -> anyhow::Result<()> {
    let file = args.file.context("missing <FILE>")?;
    let query = args.query.context("missing <QUERY>")?;

    let config_path = args.config.clone().unwrap_or_else(Config::default_path);
    let config = match Config::load(&config_path) {
        Ok(cfg) => {
            log::info!("Config loaded from {}", config_path.display());
            cfg
        }
        Err(e) if args.config.is_some() => {
            return Err(e).with_context(|| format!("loading {}", config_path.display()));
        }
        Err(e) => {
            log::warn!("Config load error ({}), using defaults", e);
            Config::default()
        }
    };

    let mut doc = load_path(&file).with_context(|| format!("reading {}", file.display()))?;
    let pristine = outline(&doc);
    log::info!("Loaded {} ({} nodes)", file.display(), doc.node_count());

    // Command-line flags turn options on; the config decides the rest.
    let defaults = config.search.options();
    let options = SearchOptions {
        case_sensitive: defaults.case_sensitive || args.case_sensitive,
        use_regex: defaults.use_regex || args.regex,
    };

    let mut session = SearchSession::new(&config);
    session.activate();
    session.run_search(&mut doc, &query, options);
    for _ in 0..args.next {
        session.next(&mut doc);
    }

    let view = search_bar_view(&session);
    if args.json {
        let output = serde_json::json!({
            "report": session.report(),
            "view": view,
            "markup": to_markup(&doc),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{}", to_markup(&doc));
        eprintln!("{}", view.render_line(40));
    }

    session.deactivate(&mut doc);
    ensure!(
        outline(&doc) == pristine,
        "document was not restored after deactivation"
    );
    Ok(())
}
