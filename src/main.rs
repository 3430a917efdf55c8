// Entry point and high-level CLI flow.
//
// With a subcommand the binary does one thing and exits (non-zero on error).
// Without one it falls back to the numbered menu, which keeps a single
// `Session` alive so a file is loaded once and the mapping can be tweaked and
// re-analyzed as often as needed.
use chrono::{Days, Local};
use clap::{Args, Parser, Subcommand, ValueEnum};
use kpi_report::demo::{build_demo_seeded, DemoKind, DEMO_DAYS};
use kpi_report::loader::{self, SHEETS_SOURCE_NAME};
use kpi_report::output::print_dashboard;
use kpi_report::store::{FeedbackStore, MappingStore, Vote};
use kpi_report::util::format_int;
use kpi_report::{Result, Session, Settings, Table};
use log::{error, warn};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "kpi_report")]
#[command(version, about = "KPI dashboard for small-business sales and expense sheets")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Where saved mappings and feedback are kept
    #[arg(long, global = true, env = "KPI_REPORT_DATA_DIR", default_value = ".kpi_report")]
    data_dir: PathBuf,

    /// Where exported reports are written
    #[arg(long, global = true, env = "KPI_REPORT_EXPORT_DIR", default_value = ".")]
    export_dir: PathBuf,

    /// More log output (-v info, -vv debug)
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a .csv, .xlsx or .xls file
    Analyze {
        file: PathBuf,
        #[command(flatten)]
        mapping: MappingArgs,
    },
    /// Analyze a public Google Sheet (share link or spreadsheet id)
    Sheet {
        url: String,
        #[command(flatten)]
        mapping: MappingArgs,
    },
    /// Analyze generated demo data
    Demo {
        /// loss or growth
        kind: DemoKind,
        /// Seed for reproducible data
        #[arg(long)]
        seed: Option<u64>,
        #[command(flatten)]
        mapping: MappingArgs,
    },
    /// Record or inspect feedback
    Feedback {
        #[command(subcommand)]
        action: FeedbackAction,
    },
}

#[derive(Args)]
struct MappingArgs {
    /// Revenue column
    #[arg(long)]
    revenue: Option<String>,
    /// Cost column (repeat for several)
    #[arg(long = "cost")]
    costs: Vec<String>,
    /// Product column
    #[arg(long)]
    product: Option<String>,
    /// Date column
    #[arg(long)]
    date: Option<String>,
    /// Also write the JSON report to the export directory
    #[arg(long)]
    export: bool,
}

#[derive(Subcommand)]
enum FeedbackAction {
    Add {
        #[arg(long, value_enum)]
        vote: VoteArg,
        #[arg(long)]
        comment: String,
    },
    List,
    Clear,
}

#[derive(Clone, Copy, ValueEnum)]
enum VoteArg {
    Helpful,
    NeedsImprovement,
    WouldPay,
}

impl From<VoteArg> for Vote {
    fn from(v: VoteArg) -> Self {
        match v {
            VoteArg::Helpful => Vote::Helpful,
            VoteArg::NeedsImprovement => Vote::NeedsImprovement,
            VoteArg::WouldPay => Vote::WouldPay,
        }
    }
}

/// Read a single line of input after printing `prompt`.
fn read_line(prompt: &str) -> String {
    print!("{}", prompt);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

fn read_choice() -> String {
    read_line("Enter choice: ")
}

/// Ask whether to return to the main menu. `true` for Y, `false` for N.
fn prompt_back_to_menu() -> bool {
    loop {
        match read_line("Back to Main Menu (Y/N): ").to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

fn demo_start() -> chrono::NaiveDate {
    Local::now().date_naive() - Days::new(DEMO_DAYS)
}

fn load_into(session: &mut Session, source_name: &str, table: Table) {
    println!(
        "Loaded {} ({} rows, {} columns)\n",
        source_name,
        format_int(table.row_count() as u64),
        table.columns().len()
    );
    session.load(source_name, table);
}

// Report an error in interactive mode; the session keeps its previous table.
fn report(e: &kpi_report::ReportError) {
    error!("{}", e);
    eprintln!("Error: {}\n", e);
}

fn handle_load_file(session: &mut Session) {
    let input = read_line("Path to .csv/.xlsx/.xls: ");
    if input.is_empty() {
        return;
    }
    let path = Path::new(&input);
    match loader::load_file(path) {
        Ok(table) => load_into(session, &source_name_for(path), table),
        Err(e) => report(&e),
    }
}

fn handle_import_sheet(session: &mut Session) {
    let input = read_line("Google Sheets URL or spreadsheet id: ");
    println!("Fetching...");
    match loader::fetch_sheet(&input) {
        Ok(table) => load_into(session, SHEETS_SOURCE_NAME, table),
        Err(e) => report(&e),
    }
}

fn handle_demo(session: &mut Session) {
    println!("[1] Loss demo");
    println!("[2] Growth demo");
    let kind = match read_choice().as_str() {
        "1" => DemoKind::Loss,
        "2" => DemoKind::Growth,
        _ => {
            println!("Invalid choice. Please enter 1 or 2.\n");
            return;
        }
    };
    let table = build_demo_seeded(kind, demo_start(), None);
    load_into(session, kind.source_name(), table);
}

// Print the columns with 1-based indices and let the user pick one.
// Blank input clears the role; `None` means the input was invalid.
fn pick_column(columns: &[String]) -> Option<Option<String>> {
    for (i, c) in columns.iter().enumerate() {
        println!("  [{}] {}", i + 1, c);
    }
    let input = read_line("Column number (blank for none): ");
    if input.is_empty() {
        return Some(None);
    }
    match input.parse::<usize>() {
        Ok(n) if (1..=columns.len()).contains(&n) => Some(Some(columns[n - 1].clone())),
        _ => {
            println!("Invalid column.\n");
            None
        }
    }
}

fn handle_edit_mapping(session: &mut Session) {
    if session.table().is_none() {
        println!("Error: No data loaded. Please load a file first (option 1).\n");
        return;
    }
    loop {
        let m = session.mapping();
        let show = |c: &Option<String>| match c.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => "(none)".to_string(),
        };
        println!("Column mapping for {}:", session.source_name());
        println!("[1] Revenue: {}", show(&m.revenue_column));
        let costs = if m.cost_columns.is_empty() {
            "(none)".to_string()
        } else {
            m.cost_columns.join(", ")
        };
        println!("[2] Costs:   {}", costs);
        println!("[3] Product: {}", show(&m.product_column));
        println!("[4] Date:    {}", show(&m.date_column));
        println!("[5] Done\n");

        let choice = read_choice();
        if choice == "5" {
            println!();
            return;
        }
        let columns = session.columns().to_vec();
        let result = match choice.as_str() {
            "1" => pick_column(&columns).map(|c| session.set_revenue(c)),
            "2" => match pick_column(&columns) {
                Some(Some(c)) => Some(session.toggle_cost(&c)),
                _ => None,
            },
            "3" => pick_column(&columns).map(|c| session.set_product(c)),
            "4" => pick_column(&columns).map(|c| session.set_date(c)),
            _ => {
                println!("Invalid choice. Please enter 1-5.\n");
                None
            }
        };
        if let Some(Err(e)) = result {
            report(&e);
        }
    }
}

/// Returns `false` when the user chose to exit.
fn handle_show_dashboard(session: &Session) -> bool {
    match session.dashboard() {
        Some(d) => {
            print_dashboard(session.source_name(), &d);
            prompt_back_to_menu()
        }
        None => {
            println!("Error: No data loaded. Please load a file first (option 1).\n");
            true
        }
    }
}

fn handle_export(session: &Session, settings: &Settings) {
    match session.export(settings.export_dir()) {
        Ok(Some(path)) => println!("Report exported to {}\n", path.display()),
        Ok(None) => println!("Error: No data loaded. Please load a file first (option 1).\n"),
        Err(e) => report(&e),
    }
}

fn handle_feedback(feedback: &FeedbackStore) {
    let stats = feedback.stats();
    println!(
        "Feedback so far: {} total ({} helpful, {} needs improvement, {} would pay)",
        stats.total, stats.helpful, stats.needs_improvement, stats.would_pay
    );
    println!("[1] Helpful");
    println!("[2] Needs improvement");
    println!("[3] Would pay");
    let vote = match read_choice().as_str() {
        "1" => Vote::Helpful,
        "2" => Vote::NeedsImprovement,
        "3" => Vote::WouldPay,
        _ => {
            println!("Invalid choice. Please enter 1, 2 or 3.\n");
            return;
        }
    };
    let comment = read_line("Comment: ");
    match feedback.submit(vote, &comment) {
        Ok(_) => println!("Thanks! Feedback saved.\n"),
        Err(e) => report(&e),
    }
}

fn run_interactive(settings: &Settings) {
    let mut session = Session::new(Some(MappingStore::new(settings.mappings_path())));
    let feedback = FeedbackStore::new(settings.feedback_path());

    loop {
        println!("KPI Report");
        println!("[1] Load a file");
        println!("[2] Import a Google Sheet");
        println!("[3] Load demo data");
        println!("[4] Edit column mapping");
        println!("[5] Show dashboard");
        println!("[6] Export report");
        println!("[7] Leave feedback");
        println!("[8] Exit\n");
        match read_choice().as_str() {
            "1" => handle_load_file(&mut session),
            "2" => handle_import_sheet(&mut session),
            "3" => handle_demo(&mut session),
            "4" => handle_edit_mapping(&mut session),
            "5" => {
                println!();
                if !handle_show_dashboard(&session) {
                    println!("Exiting the program.");
                    break;
                }
            }
            "6" => handle_export(&session, settings),
            "7" => handle_feedback(&feedback),
            "8" => {
                println!("Exiting the program.");
                break;
            }
            _ => println!("Invalid choice. Please enter 1-8.\n"),
        }
    }
}

fn source_name_for(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn apply_overrides(session: &mut Session, args: &MappingArgs) -> Result<()> {
    let mut mapping = session.mapping().clone();
    let mut changed = false;
    let mut check = |name: &str| {
        if !session.columns().iter().any(|c| c == name) {
            warn!("Column '{}' not found in {}", name, session.source_name());
        }
        changed = true;
    };

    if let Some(c) = &args.revenue {
        check(c);
        mapping.revenue_column = Some(c.clone());
    }
    if !args.costs.is_empty() {
        for c in &args.costs {
            check(c);
        }
        mapping.cost_columns = args.costs.clone();
    }
    if let Some(c) = &args.product {
        check(c);
        mapping.product_column = Some(c.clone());
    }
    if let Some(c) = &args.date {
        check(c);
        mapping.date_column = Some(c.clone());
    }

    if changed {
        session.set_mapping(mapping)?;
    }
    Ok(())
}

fn run_analysis(
    settings: &Settings,
    source_name: &str,
    table: Table,
    args: &MappingArgs,
) -> Result<()> {
    let mut session = Session::new(Some(MappingStore::new(settings.mappings_path())));
    session.load(source_name, table);
    apply_overrides(&mut session, args)?;

    if let Some(d) = session.dashboard() {
        print_dashboard(session.source_name(), &d);
    }
    if args.export {
        if let Some(path) = session.export(settings.export_dir())? {
            println!("Report exported to {}", path.display());
        }
    }
    Ok(())
}

fn run_feedback(settings: &Settings, action: FeedbackAction) -> Result<()> {
    let store = FeedbackStore::new(settings.feedback_path());
    match action {
        FeedbackAction::Add { vote, comment } => {
            let item = store.submit(vote.into(), &comment)?;
            println!("Saved feedback {} ({})", item.id, item.vote);
        }
        FeedbackAction::List => {
            let items = store.list();
            if items.is_empty() {
                println!("No feedback yet.");
            }
            for item in items {
                println!(
                    "{}  {:<18} {}",
                    item.created_at.format("%Y-%m-%d %H:%M"),
                    item.vote.to_string(),
                    item.comment
                );
            }
        }
        FeedbackAction::Clear => {
            store.clear()?;
            println!("Feedback cleared.");
        }
    }
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let settings = Settings::new(cli.data_dir, cli.export_dir);
    match cli.command {
        None => run_interactive(&settings),
        Some(Commands::Analyze { file, mapping }) => {
            let table = loader::load_file(&file)?;
            run_analysis(&settings, &source_name_for(&file), table, &mapping)?;
        }
        Some(Commands::Sheet { url, mapping }) => {
            let table = loader::fetch_sheet(&url)?;
            run_analysis(&settings, SHEETS_SOURCE_NAME, table, &mapping)?;
        }
        Some(Commands::Demo {
            kind,
            seed,
            mapping,
        }) => {
            let table = build_demo_seeded(kind, demo_start(), seed);
            run_analysis(&settings, kind.source_name(), table, &mapping)?;
        }
        Some(Commands::Feedback { action }) => run_feedback(&settings, action)?,
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
