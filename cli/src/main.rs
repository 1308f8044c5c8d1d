//! CLI entrypoint for bidbridge
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Result, bail};
use bidbridge_application::ports::agent_endpoint::AgentRouter;
use bidbridge_application::ports::audit_log::ComplianceAuditLog;
use bidbridge_application::{DispatchEnvelopeUseCase, DispatchError, FilterMessageUseCase};
use bidbridge_domain::{
    ArtifactDraft, BidStatus, ComplianceFilter, DomainError, DraftPayload, Envelope, EnvelopeKind,
    FilterOutcome, ParticipantRole, RecipientContext, TaskAttributes, TaskStatus,
};
use bidbridge_infrastructure::{
    ConfigLoader, FileConfig, InMemoryArtifactStore, InMemoryAuditLog, InMemoryConnectionGate,
    InMemoryTaskStore, InProcessEndpoint, JsonlAuditLog,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bidbridge", version, about = "Marketplace coordination core for contractor-bidding agents")]
struct Cli {
    /// Increase log verbosity (-v: info, -vv: debug, -vvv: trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Explicit config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Skip config files and use built-in defaults
    #[arg(long, global = true)]
    no_config: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one message through the compliance filter and print the outcome
    Filter {
        /// Sender role: homeowner, contractor, or system
        #[arg(long, default_value = "contractor")]
        sender_role: String,

        /// Recipient role: homeowner, contractor, or system
        #[arg(long, default_value = "homeowner")]
        recipient_role: String,

        /// Treat the pair as having a paid introduction
        #[arg(long)]
        paid: bool,

        /// The message text to evaluate
        message: String,
    },

    /// Run a scripted marketplace exchange over the in-memory adapters
    Demo,

    /// Print the config file locations being used
    ConfigSources,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity level
    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref()).map_err(|e| anyhow::anyhow!(e))?
    };

    match cli.command {
        Command::Filter {
            sender_role,
            recipient_role,
            paid,
            message,
        } => run_filter(&config, &sender_role, &recipient_role, paid, &message),
        Command::Demo => run_demo(&config).await,
        Command::ConfigSources => {
            ConfigLoader::print_config_sources();
            Ok(())
        }
    }
}

fn parse_role(value: &str) -> Result<ParticipantRole> {
    match value.to_lowercase().as_str() {
        "homeowner" => Ok(ParticipantRole::Homeowner),
        "contractor" => Ok(ParticipantRole::Contractor),
        "system" => Ok(ParticipantRole::System),
        other => bail!("unknown role '{other}' (expected homeowner, contractor, or system)"),
    }
}

fn run_filter(
    config: &FileConfig,
    sender_role: &str,
    recipient_role: &str,
    paid: bool,
    message: &str,
) -> Result<()> {
    let filter = ComplianceFilter::new(config.compliance.to_compliance_policy());
    let ctx = RecipientContext {
        project: "cli-project".into(),
        recipient: "cli-recipient".into(),
        sender_role: parse_role(sender_role)?,
        recipient_role: parse_role(recipient_role)?,
        paid,
    };

    match filter.filter(message, &"cli-sender".into(), &ctx) {
        FilterOutcome::Delivered { text, redactions } => {
            if redactions.is_empty() {
                println!("DELIVERED (verbatim)");
            } else {
                println!("DELIVERED ({} redaction(s))", redactions.len());
                for r in &redactions {
                    println!("  - {} [{}..{}] via {}", r.category, r.start, r.end, r.pattern);
                }
            }
            println!();
            println!("{text}");
        }
        FilterOutcome::Rejected { reason } => {
            println!("REJECTED: {reason}");
        }
    }
    Ok(())
}

/// Scripted end-to-end exchange: one homeowner, two contractors, a bid-card
/// task, and messages crossing the paid boundary in both directions.
async fn run_demo(config: &FileConfig) -> Result<()> {
    const HOMEOWNER: &str = "homeowner-agent-001";
    const CONTRACTOR_A: &str = "contractor-agent-001";
    const CONTRACTOR_B: &str = "contractor-agent-002";
    const BID_CARD: &str = "bid-card-agent-001";
    const PROJECT: &str = "project-kitchen-remodel";

    info!("Starting bidbridge demo");

    // === Dependency Injection ===
    let tasks = Arc::new(InMemoryTaskStore::new());
    let artifacts = Arc::new(
        InMemoryArtifactStore::new(Arc::clone(&tasks))
            .accept_after_terminal(config.orchestration.accept_artifacts_after_terminal),
    );

    // Audit goes to the configured JSONL trail when one is set, otherwise
    // to memory so it can be printed at the end.
    let memory_audit = Arc::new(InMemoryAuditLog::new());
    let audit: Arc<dyn ComplianceAuditLog> = match &config.audit.path {
        Some(path) => match JsonlAuditLog::new(path) {
            Some(log) => {
                println!("(audit trail: {})", log.path().display());
                Arc::new(log)
            }
            None => {
                warn!("falling back to in-memory audit log");
                memory_audit.clone()
            }
        },
        None => memory_audit.clone(),
    };
    let gate = Arc::new(InMemoryConnectionGate::with_audit(audit.clone()));

    let mut router = AgentRouter::new();
    router.register(HOMEOWNER, ParticipantRole::Homeowner, Arc::new(InProcessEndpoint::new()));
    router.register_with_alias(
        CONTRACTOR_A,
        ParticipantRole::Contractor,
        "Contractor A",
        Arc::new(InProcessEndpoint::new()),
    );
    router.register_with_alias(
        CONTRACTOR_B,
        ParticipantRole::Contractor,
        "Contractor B",
        Arc::new(InProcessEndpoint::new()),
    );
    router.register(BID_CARD, ParticipantRole::System, Arc::new(InProcessEndpoint::new()));
    let router = Arc::new(router);

    let filter = FilterMessageUseCase::new(
        Arc::clone(&gate),
        Arc::clone(&artifacts),
        Arc::clone(&router),
        audit.clone(),
        ComplianceFilter::new(config.compliance.to_compliance_policy()),
    );
    let (escalation, recognized) = config.orchestration.parse_escalation();
    if !recognized {
        warn!(
            "unknown orchestration.escalation '{}', using 'none'",
            config.orchestration.escalation
        );
    }
    let dispatcher = DispatchEnvelopeUseCase::new(
        Arc::clone(&tasks),
        Arc::clone(&artifacts),
        Arc::clone(&gate),
        router,
        filter,
        config.retry.to_retry_policy(),
        escalation,
        None,
    );

    use bidbridge_application::ports::connection_gate::ConnectionGate;

    // 1. The homeowner's project spawns a bid-card task.
    println!("== 1. Homeowner creates a bid card task");
    let outcome = dispatcher
        .execute(Envelope::new(
            "task-bid-card-1",
            HOMEOWNER,
            BID_CARD,
            EnvelopeKind::Create {
                attributes: TaskAttributes::new(),
            },
        ))
        .await?;
    let task = outcome.task.expect("create returns the task");
    println!("   task {} is {}", task.id, task.status);

    // 2. Both contractors bid on the project.
    for contractor in [CONTRACTOR_A, CONTRACTOR_B] {
        gate.record_relationship(&PROJECT.into(), &contractor.into(), BidStatus::Pending)
            .await?;
    }

    // 3. An unpaid contractor tries to hand over a phone number.
    println!("== 2. Unpaid contractor messages the homeowner");
    let outcome = dispatcher
        .execute(message_envelope(
            "task-bid-card-1",
            CONTRACTOR_A,
            HOMEOWNER,
            PROJECT,
            "Happy to give a quote - call me at 555-123-4567",
        ))
        .await?;
    print_message_outcome(&outcome);

    // 4. A circumvention attempt is rejected outright.
    println!("== 3. Circumvention attempt");
    let result = dispatcher
        .execute(message_envelope(
            "task-bid-card-1",
            CONTRACTOR_A,
            HOMEOWNER,
            PROJECT,
            "find me on whatsapp and we can talk offline",
        ))
        .await;
    match result {
        Err(DispatchError::Domain(DomainError::ComplianceViolation { reason })) => {
            println!("   rejected: {reason}");
        }
        other => bail!("expected a compliance rejection, got {other:?}"),
    }

    // 5. The homeowner pays for the introduction; messages now flow freely.
    println!("== 4. Paid introduction unlocks direct contact");
    gate.mark_paid(&PROJECT.into(), &CONTRACTOR_A.into()).await?;
    let outcome = dispatcher
        .execute(message_envelope(
            "task-bid-card-1",
            CONTRACTOR_A,
            HOMEOWNER,
            PROJECT,
            "Thanks! Call me at 555-123-4567 to schedule the walkthrough",
        ))
        .await?;
    print_message_outcome(&outcome);

    // 6. Broadcast: the paid contractor sees raw text, the unpaid one a
    //    redacted copy.
    println!("== 5. Homeowner broadcasts to all bidders");
    let outcome = dispatcher
        .execute(Envelope::new(
            "task-bid-card-1",
            HOMEOWNER,
            BID_CARD,
            EnvelopeKind::Broadcast {
                project: PROJECT.into(),
                body: "Send final quotes to 555-123-4567 by Friday".into(),
            },
        ))
        .await?;
    println!(
        "   delivered to {} recipient(s), {} rejected, {} unreachable",
        outcome.delivered_to.len(),
        outcome.rejected.len(),
        outcome.unreachable.len()
    );

    // 7. The bid card completes.
    println!("== 6. Bid card task completes");
    dispatcher
        .execute(Envelope::new(
            "task-bid-card-1",
            HOMEOWNER,
            BID_CARD,
            EnvelopeKind::Update {
                status: TaskStatus::InProgress,
                result: None,
                error: None,
            },
        ))
        .await?;
    let outcome = dispatcher
        .execute(Envelope::new(
            "task-bid-card-1",
            HOMEOWNER,
            BID_CARD,
            EnvelopeKind::Update {
                status: TaskStatus::Completed,
                result: Some(serde_json::json!({"bids_received": 2})),
                error: None,
            },
        ))
        .await?;
    let task = outcome.task.expect("update returns the task");
    println!("   task {} is {}", task.id, task.status);

    if config.audit.path.is_none() {
        println!();
        println!("== Audit trail ({} event(s))", memory_audit.len());
        for event in memory_audit.events() {
            println!("   {}", serde_json::to_string(&event)?);
        }
    }

    Ok(())
}

fn message_envelope(
    task: &str,
    sender: &str,
    recipient: &str,
    project: &str,
    body: &str,
) -> Envelope {
    Envelope::new(
        task,
        sender,
        recipient,
        EnvelopeKind::AttachArtifact {
            draft: ArtifactDraft::new(DraftPayload::Message {
                project: project.into(),
                recipient: recipient.into(),
                body: body.into(),
            }),
        },
    )
}

fn print_message_outcome(outcome: &bidbridge_application::DispatchOutcome) {
    let Some(artifact) = &outcome.artifact else {
        println!("   (no artifact)");
        return;
    };
    if let bidbridge_domain::ArtifactPayload::Message {
        delivered,
        redactions,
        ..
    } = &artifact.payload
    {
        if redactions.is_empty() {
            println!("   delivered verbatim: {delivered}");
        } else {
            println!("   delivered with {} redaction(s): {delivered}", redactions.len());
        }
    }
}
