use clap::Parser;
use outage_schedule::config::cli::{parse_date_arg, Command};
use outage_schedule::config::{AppConfig, LogFormat};
use outage_schedule::core::calendar::{event_from_record, google_calendar_link};
use outage_schedule::core::time_format::{civil_date, format_long_date, format_short_date, format_time};
use outage_schedule::domain::model::OutageRecord;
use outage_schedule::domain::ports::Clock;
use outage_schedule::utils::error::{ErrorSeverity, OutageError};
use outage_schedule::utils::{logger, validation::Validate};
use outage_schedule::{
    CalendarExporter, CliConfig, HeadlessRuntime, HttpOutageFeed, ScheduleEngine, ScheduleView,
    SunTimeService, TracingAnalytics, UpdateEnforcer, UpdateState,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    let config = match cli.load_app_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(exit_code(&e));
        }
    };

    match config.logging.format {
        LogFormat::Compact => logger::init_cli_logger(cli.verbose),
        LogFormat::Json => logger::init_json_logger(cli.verbose),
    }

    tracing::info!("Starting outage-schedule {}", config.app.version);
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(&cli, &config).await {
        tracing::error!("❌ {} (Severity: {:?})", e, e.severity());
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e);
        eprintln!("💡 {}", e.recovery_suggestion());

        let code = exit_code(&e);
        if code > 0 {
            std::process::exit(code);
        }
    }

    Ok(())
}

fn exit_code(e: &OutageError) -> i32 {
    match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}

async fn run(cli: &CliConfig, config: &AppConfig) -> outage_schedule::Result<()> {
    let clock = cli.clock()?;

    match &cli.command {
        Command::Schedule { date } => {
            let view = load_schedule(config, clock.clone()).await?;
            match parse_date_arg(date.as_deref())? {
                Some(date) => {
                    println!("Outages on {}", date);
                    print_records(&view.on_date(date));
                }
                None => print_schedule(&view),
            }
        }
        Command::Ics { id, output, url } => {
            let view = load_schedule(config, clock.clone()).await?;
            let record = find_record(&view, id)?;
            let ics = CalendarExporter::new(clock).to_ics(&event_from_record(record, url.clone()));
            match output {
                Some(path) => {
                    std::fs::write(path, ics.as_bytes())?;
                    println!("📁 Calendar file saved to: {}", path.display());
                }
                None => print!("{}", ics),
            }
        }
        Command::CalendarLink { id, url } => {
            let view = load_schedule(config, clock).await?;
            let record = find_record(&view, id)?;
            println!("{}", google_calendar_link(&event_from_record(record, url.clone())));
        }
        Command::Sun { date } => {
            let date = parse_date_arg(date.as_deref())?.unwrap_or_else(|| civil_date(&clock.now()));
            let service = SunTimeService::new(config.sun_times_config());
            let times = service.get(date).await;
            println!("Sun times for {}", date);
            println!("  Sunrise:     {}", times.sunrise_formatted);
            println!("  Sunset:      {}", times.sunset_formatted);
            if !times.day_length.is_empty() {
                println!("  Day length:  {}", times.day_length);
            }
            if !times.golden_hour.is_empty() {
                println!("  Golden hour: {}", times.golden_hour);
            }
        }
        Command::CheckVersion => {
            let enforcer = UpdateEnforcer::new(
                config.update_config()?,
                HeadlessRuntime::new(),
                TracingAnalytics,
                clock,
            );
            match enforcer.check_for_updates().await {
                UpdateState::UpToDate => println!("✅ Build {} is up to date", config.app.version),
                UpdateState::Reloading => println!("⚠️ Build {} must be updated", config.app.version),
                _ => println!("Version check skipped; see logs"),
            }
        }
    }

    Ok(())
}

async fn load_schedule(config: &AppConfig, clock: Arc<dyn Clock>) -> outage_schedule::Result<ScheduleView> {
    let feed = HttpOutageFeed::new(config.feed_endpoints(), config.feed_timeout());
    ScheduleEngine::new(feed, clock, config.mock_config()).load().await
}

fn find_record<'a>(view: &'a ScheduleView, id: &str) -> outage_schedule::Result<&'a OutageRecord> {
    view.find(id).ok_or_else(|| OutageError::ValidationError {
        message: format!("no outage with id {}", id),
    })
}

fn print_schedule(view: &ScheduleView) {
    println!("Today, {}", format_long_date(&view.generated_at));
    print_records(&view.today.iter().collect::<Vec<_>>());
    println!();
    println!("Upcoming");
    print_records(&view.upcoming.iter().collect::<Vec<_>>());
    println!();
    println!("Past ({} outages)", view.past.len());
}

fn print_records(records: &[&OutageRecord]) {
    if records.is_empty() {
        println!("  (none)");
        return;
    }
    for record in records {
        println!(
            "  [{}] {} {}-{}  {} ({})  {}",
            record.id,
            format_short_date(&record.start),
            format_time(&record.start),
            format_time(&record.end),
            record.locality,
            record.district,
            record.streets
        );
    }
}
