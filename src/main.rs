use clap::Parser;
use miette::{IntoDiagnostic, Result};
use pg_settle::application::commands::InboundCommand;
use pg_settle::application::payment_service::PaymentService;
use pg_settle::config::AppConfig;
use pg_settle::domain::ports::PaymentStoreBox;
use pg_settle::domain::search::{PageRequest, PaymentSearch};
use pg_settle::infrastructure::event_log::JsonLinesEventPublisher;
use pg_settle::infrastructure::in_memory::InMemoryPaymentStore;
use pg_settle::infrastructure::toss::TossPaymentsClient;
use pg_settle::interfaces::consumer::{CommittedOffsets, Delivery, RefundRequestedConsumer};
use pg_settle::interfaces::csv::payment_writer::PaymentWriter;
use pg_settle::interfaces::jsonl::command_reader::CommandReader;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input file of JSON-lines commands (verify_payment, refund_requested)
    input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// File receiving published events as JSON lines. Defaults to stderr.
    #[arg(long)]
    events_out: Option<PathBuf>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(false)
        .init();
}

#[cfg(feature = "storage-rocksdb")]
fn open_store(db_path: Option<PathBuf>) -> Result<PaymentStoreBox> {
    use pg_settle::infrastructure::rocksdb::RocksDBPaymentStore;

    match db_path {
        Some(path) => {
            info!(path = %path.display(), "using RocksDB storage");
            let store = RocksDBPaymentStore::open(path).into_diagnostic()?;
            Ok(Box::new(store))
        }
        None => Ok(Box::new(InMemoryPaymentStore::new())),
    }
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_store(db_path: Option<PathBuf>) -> Result<PaymentStoreBox> {
    if db_path.is_some() {
        warn!(
            "Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
        );
    }
    Ok(Box::new(InMemoryPaymentStore::new()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = AppConfig::from_env().into_diagnostic()?;
    let store = open_store(cli.db_path)?;
    let gateway = TossPaymentsClient::new(&config.gateway).into_diagnostic()?;
    let (publisher, relay) = match cli.events_out {
        Some(path) => {
            let file = tokio::fs::File::create(path).await.into_diagnostic()?;
            JsonLinesEventPublisher::spawn(file, config.topics.clone())
        }
        None => JsonLinesEventPublisher::spawn(tokio::io::stderr(), config.topics.clone()),
    };

    let service = Arc::new(PaymentService::new(
        store,
        Box::new(gateway),
        Box::new(publisher),
    ));
    let consumer = RefundRequestedConsumer::new(service.clone());
    let offsets = CommittedOffsets::new();

    let file = File::open(cli.input).into_diagnostic()?;
    let reader = CommandReader::new(BufReader::new(file));
    for (line, command) in reader.commands() {
        match command {
            Ok(InboundCommand::VerifyPayment(cmd)) => {
                if let Err(e) = service.verify_and_register(cmd).await {
                    warn!(line, code = e.code(), error = %e, "payment verification rejected");
                }
            }
            Ok(InboundCommand::RefundRequested(event)) => {
                let delivery = Delivery {
                    partition: 0,
                    offset: line as i64,
                    payload: event,
                };
                if let Err(e) = consumer.handle(delivery, &offsets).await {
                    warn!(line, code = e.code(), error = %e, "refund request left unacknowledged");
                }
            }
            Err(e) => {
                warn!(line, error = %e, "skipping malformed command");
            }
        }
    }

    let payments = service
        .search_payments(&PaymentSearch::default(), PageRequest::unpaged())
        .await
        .into_diagnostic()?;

    // Dropping the last service handle closes the event channel.
    drop(consumer);
    drop(service);
    let published = relay.await.into_diagnostic()?.into_diagnostic()?;
    info!(
        published,
        committed_offset = ?offsets.last_committed(),
        "processing finished"
    );

    let stdout = io::stdout();
    let mut writer = PaymentWriter::new(stdout.lock());
    writer.write_payments(&payments.items).into_diagnostic()?;

    Ok(())
}
