use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser};
use tracing::info;
use tracing_subscriber::EnvFilter;

use tutor_search::display::{time_slot_card, tutor_list};
use tutor_search::{
    ClientConfig, HttpDirectoryClient, InMemoryDirectory, ScheduleDirectory, SearchPage,
    TutorDirectory, DEFAULT_HOURS_OFFSET,
};

/// Browse tutors and search their available time slots.
#[derive(Parser, Debug)]
#[command(name = "tutor-search", version)]
struct Cli {
    /// Backend base URL (overrides TUTOR_SEARCH_BASE_URL)
    #[arg(long)]
    base_url: Option<String>,

    /// Bearer token sent with each request (overrides TUTOR_SEARCH_API_TOKEN)
    #[arg(long)]
    api_token: Option<String>,

    /// Request timeout in milliseconds (overrides TUTOR_SEARCH_TIMEOUT_MS)
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Read tutors and time slots from a JSON fixture instead of the backend
    #[arg(long, conflicts_with_all = ["base_url", "api_token", "timeout_ms"])]
    fixture: Option<PathBuf>,

    /// Tutor first or last name contains
    #[arg(short, long, default_value = "")]
    name: String,

    /// Subject name contains
    #[arg(short, long, default_value = "")]
    subject: String,

    /// Minimum hourly price for the slot search
    #[arg(long, default_value = "")]
    price_min: String,

    /// Maximum hourly price for the slot search
    #[arg(long, default_value = "")]
    price_max: String,

    /// Minimum average rating for the slot search
    #[arg(long, default_value = "")]
    rating_min: String,

    /// Maximum average rating for the slot search
    #[arg(long, default_value = "")]
    rating_max: String,

    /// Also search available time slots with the filters above
    #[arg(long)]
    slots: bool,

    /// Hours subtracted from slot times before display
    #[arg(long, default_value_t = DEFAULT_HOURS_OFFSET, allow_negative_numbers = true)]
    hours_offset: i64,

    /// Print JSON instead of text cards
    #[arg(long)]
    json: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

type Directories = (Arc<dyn TutorDirectory>, Arc<dyn ScheduleDirectory>);

fn directories(cli: &Cli) -> Result<Directories> {
    if let Some(path) = &cli.fixture {
        let directory = Arc::new(
            InMemoryDirectory::from_file(path)
                .with_context(|| format!("loading fixture {}", path.display()))?,
        );
        let tutors: Arc<dyn TutorDirectory> = directory.clone();
        let schedule: Arc<dyn ScheduleDirectory> = directory;
        return Ok((tutors, schedule));
    }

    let mut config = ClientConfig::from_env().context("reading client configuration")?;
    if let Some(base_url) = &cli.base_url {
        config.base_url = base_url.clone();
    }
    if let Some(api_token) = &cli.api_token {
        config.api_token = Some(api_token.clone());
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config.timeout_ms = timeout_ms;
    }

    info!(base_url = %config.base_url, "using backend");
    let client = Arc::new(HttpDirectoryClient::new(config).context("creating HTTP client")?);
    let tutors: Arc<dyn TutorDirectory> = client.clone();
    let schedule: Arc<dyn ScheduleDirectory> = client;
    Ok((tutors, schedule))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let (tutor_directory, schedule_directory) = directories(&cli)?;
    let mut page = SearchPage::new(tutor_directory, schedule_directory);

    page.set_name_query(cli.name.as_str());
    page.set_subject_query(cli.subject.as_str());
    {
        let bounds = page.bounds_mut();
        bounds.price_min = cli.price_min.clone();
        bounds.price_max = cli.price_max.clone();
        bounds.rating_min = cli.rating_min.clone();
        bounds.rating_max = cli.rating_max.clone();
    }

    // Failures are logged by the page; the output shows whatever state is left
    let loaded = page.load().await;
    let searched = if cli.slots {
        Some(page.search_slots().await.is_some())
    } else {
        None
    };

    if cli.json {
        let output = serde_json::json!({
            "tutors": page.tutors().filtered(),
            "total": page.tutors().tutors().len(),
            "timeSlots": page.schedule().slots(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print!("{}", tutor_list(page.tutors()));
        if cli.slots {
            println!("Available time slots: {}", page.schedule().slots().len());
            println!();
            for slot in page.schedule().slots() {
                println!("{}", time_slot_card(slot, cli.hours_offset));
            }
        }
    }

    if !loaded && searched != Some(true) {
        bail!("no data could be loaded from the directories");
    }
    Ok(())
}
