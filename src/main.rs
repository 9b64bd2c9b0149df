use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use console::Term;
use dialoguer::Confirm;
use dustoff::selector::GroupedSelector;
use dustoff::size::{format_size, parse_size};
use dustoff::{
    ActionKind, Cleaner, ExtensionFilter, FileEntry, Filters, MAX_ENTRIES, ScanResult, Session,
    SortKey, action, scanner,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dustoff")]
#[command(about = "Find files nobody has touched in a long time and clean them up")]
#[command(version)]
struct Cli {
    /// Directory to scan (defaults to current directory)
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Only show entries not accessed for at least this many days
    #[arg(long, value_name = "DAYS", default_value_t = 0)]
    older_than: u64,

    /// Only show entries at least this large (e.g. 500, 10K, 1.5M, 2G)
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    min_size: Option<u64>,

    /// Only show entries whose name contains this text (case-insensitive)
    #[arg(long, value_name = "TEXT")]
    name: Option<String>,

    /// Only show entries with this extension ("all" disables)
    #[arg(long, value_name = "EXT", default_value = "all")]
    ext: String,

    /// Sort order of the listing
    #[arg(long, value_enum, default_value_t = SortArg::ModifiedDesc)]
    sort: SortArg,

    /// Stop scanning after this many entries
    #[arg(long, value_name = "N", default_value_t = MAX_ENTRIES)]
    limit: usize,

    /// List directories as well as files
    #[arg(long)]
    include_dirs: bool,

    /// Print the raw scan result as JSON and exit
    #[arg(long, conflicts_with_all = ["delete", "trash", "move_to"])]
    json: bool,

    /// Permanently delete the chosen entries
    #[arg(long, conflicts_with_all = ["trash", "move_to"])]
    delete: bool,

    /// Move the chosen entries to the trash
    #[arg(long, conflicts_with = "move_to")]
    trash: bool,

    /// Move the chosen entries into this directory
    #[arg(long, value_name = "DIR")]
    move_to: Option<PathBuf>,

    /// Show what would be done without changing anything
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Skip the picker and the confirmation prompt, acting on every listed entry
    #[arg(short = 'y', long)]
    yes: bool,

    /// Log engine activity to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum SortArg {
    SizeAsc,
    SizeDesc,
    ModifiedAsc,
    ModifiedDesc,
    AccessedAsc,
    AccessedDesc,
    NameAsc,
    NameDesc,
}

impl From<SortArg> for SortKey {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::SizeAsc => SortKey::SizeAsc,
            SortArg::SizeDesc => SortKey::SizeDesc,
            SortArg::ModifiedAsc => SortKey::ModifiedAsc,
            SortArg::ModifiedDesc => SortKey::ModifiedDesc,
            SortArg::AccessedAsc => SortKey::AccessedAsc,
            SortArg::AccessedDesc => SortKey::AccessedDesc,
            SortArg::NameAsc => SortKey::NameAsc,
            SortArg::NameDesc => SortKey::NameDesc,
        }
    }
}

impl Cli {
    fn action(&self) -> Option<ActionKind> {
        if self.delete {
            Some(ActionKind::Delete)
        } else if self.trash {
            Some(ActionKind::Trash)
        } else {
            self.move_to.clone().map(ActionKind::MoveTo)
        }
    }

    fn filters(&self) -> Filters {
        Filters {
            name: self.name.clone().unwrap_or_default(),
            extension: self.ext.parse().unwrap_or(ExtensionFilter::All),
            min_age_days: self.older_than,
            min_size: self.min_size.unwrap_or(0),
            files_only: !self.include_dirs,
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "warn,dustoff=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn scan_with_spinner(cli: &Cli) -> Result<ScanResult> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner:.cyan} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message(format!("Scanning {}...", cli.path.display()));

    let mut seen = 0usize;
    let result = scanner::walk_with_progress(&cli.path, cli.limit, |_| {
        seen += 1;
        if seen % 500 == 0 {
            spinner.set_message(format!("Scanning {}... {} entries", cli.path.display(), seen));
        }
    });
    spinner.finish_and_clear();

    Ok(result?)
}

fn format_row(entry: &FileEntry, now: u64, width: usize) -> String {
    let marker = if entry.is_directory { "/" } else { "" };
    format!(
        "  {:<width$}  {:>10}  {:>6}",
        format!("{}{}", entry.path, marker),
        format_size(entry.size),
        format!("{}d", entry.age_days(now)),
        width = width
    )
}

fn print_scan_summary(scan: &ScanResult) {
    println!(
        "Scanned {}: {} entries ({})",
        scan.scan_path.bold(),
        scan.total_count.to_string().green().bold(),
        format_size(scan.total_size).green().bold()
    );
    if scan.limited {
        println!(
            "{} stopped after {} entries; totals are lower bounds",
            "warning:".yellow().bold(),
            scan.max_entries
        );
    }
    if scan.skipped > 0 {
        println!("{}", format!("{} entries could not be read", scan.skipped).dimmed());
    }
}

fn run(cli: Cli) -> Result<()> {
    let scan = scan_with_spinner(&cli)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&scan)?);
        return Ok(());
    }

    print_scan_summary(&scan);

    let now = now_secs();
    let mut session = Session::new(scan);
    session.filters = cli.filters();
    session.sort = cli.sort.into();

    let view = session.view(now);
    if view.is_empty() {
        println!("\n{}", "Nothing matches the filters.".yellow());
        return Ok(());
    }

    let width = view.iter().map(|e| e.path.len() + 1).max().unwrap_or(50);
    let matching_size: u64 = view.iter().map(|e| e.size).sum();
    println!(
        "\n{} matching entries ({})\n",
        view.len().to_string().green().bold(),
        format_size(matching_size).green().bold()
    );
    for entry in &view {
        println!("{}", format_row(entry, now, width));
    }

    let Some(kind) = cli.action() else {
        return Ok(());
    };

    if cli.dry_run {
        println!(
            "\n{} {} {} entries ({})",
            "Dry run - nothing will be changed:".yellow(),
            kind.verb(),
            view.len(),
            format_size(matching_size)
        );
        return Ok(());
    }

    let chosen: Vec<PathBuf> = if cli.yes {
        view.iter().map(|e| PathBuf::from(&e.path)).collect()
    } else {
        if !Term::stderr().is_term() {
            bail!("refusing to pick entries without a terminal; pass --yes to act on every listed entry");
        }
        GroupedSelector::new(view, now)
            .run()
            .context("interactive selection failed")?
    };

    if chosen.is_empty() {
        println!("\n{}", "Nothing selected.".yellow());
        return Ok(());
    }
    for path in &chosen {
        session.toggle(path);
    }

    let scan = session.scan().context("no scan loaded")?;
    let proposal = action::propose(kind, session.selected(), scan);

    if !cli.yes {
        let warning = if proposal.kind().is_reversible() {
            String::new()
        } else {
            format!(" {}", "This cannot be undone.".red().bold())
        };
        let confirmed = Confirm::new()
            .with_prompt(format!("{}?{}", proposal.summary(), warning))
            .default(false)
            .interact()
            .unwrap_or(false);
        if !confirmed {
            println!("\n{}", "Cancelled.".yellow());
            return Ok(());
        }
    }

    println!("\n{} {} entries...", proposal.kind().verb().red().bold(), proposal.paths().len());
    let freed = proposal.known_size();
    let outcome = action::execute(proposal, &Cleaner::new());

    if !outcome.failed.is_empty() {
        println!("\n{}", "Failed:".red());
        for (path, err) in &outcome.failed {
            println!("  {} - {}", path.display(), err);
        }
    }

    if !outcome.succeeded.is_empty() {
        println!(
            "\n{} {} of {} entries ({} selected)",
            "Done!".green().bold(),
            outcome.succeeded.len().to_string().green(),
            outcome.attempted(),
            format_size(freed).green().bold()
        );
    }

    session.reconcile(&outcome);
    if let Some(remaining) = session.scan() {
        println!(
            "{}",
            format!(
                "{} entries ({}) remain in the scan",
                remaining.total_count,
                format_size(remaining.total_size)
            )
            .dimmed()
        );
    }

    if outcome.hard_failures().next().is_some() {
        bail!("{} entries could not be processed", outcome.hard_failures().count());
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(err) = run(cli) {
        eprintln!("{} {:#}", "error:".red().bold(), err);
        std::process::exit(1);
    }
}
