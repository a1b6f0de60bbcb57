//! Settlementd - settlement case lifecycle daemon
//!
//! CLI entry point: runs the daemon (`serve`) or one-shot case
//! operations (plan, generate, status).

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use eyre::{Context, Result, bail};
use tracing::{debug, info};

use settlementd::cli::{Cli, Command};
use settlementd::config::Config;
use settlementd::http::{self, AppState};
use settlementd::monitor::MonitorRegistry;
use settlementd::state::{StateManager, advance};
use settlementd::templates::{BatchKind, DocumentBody, TemplateEngine};
use settlementd::tickets::ZendeskClient;
use settlementd::{CaseStatus, plan};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("settlementd")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            other => {
                eprintln!("Warning: Unknown log-level '{other}', defaulting to INFO");
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(log_dir.join("settlementd.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    debug!(store_path = %config.store_path.display(), "Configuration loaded");

    match cli.command {
        Some(Command::Serve) | None => cmd_serve(&config).await,
        Some(Command::Plan { case_ref }) => cmd_plan(&config, &case_ref).await,
        Some(Command::Generate {
            case_ref,
            batch,
            output,
        }) => cmd_generate(&config, &case_ref, &batch, &output).await,
        Some(Command::Status { case_ref }) => cmd_status(&config, &case_ref).await,
        Some(Command::Cases) => cmd_cases(&config).await,
    }
}

/// Run the daemon: rehydrate monitoring sessions, serve HTTP, drain on
/// ctrl-c
async fn cmd_serve(config: &Config) -> Result<()> {
    let state = StateManager::spawn(&config.store_path)?;
    let client = Arc::new(ZendeskClient::new(
        config.ticketing.base_url.clone(),
        config.ticketing.token.clone(),
    ));
    let engine = TemplateEngine::new()?;
    let registry = Arc::new(MonitorRegistry::new(
        state.clone(),
        client,
        engine,
        config.monitoring.settings(),
    ));

    let resumed = registry.rehydrate().await?;
    info!(resumed, "Daemon starting");
    println!("settlementd: {resumed} monitoring session(s) resumed");

    let addr: std::net::SocketAddr = config
        .http_bind
        .parse()
        .with_context(|| format!("Invalid http_bind '{}'", config.http_bind))?;
    let app = AppState {
        registry: registry.clone(),
        state: state.clone(),
    };

    http::serve(addr, app, async {
        let _ = tokio::signal::ctrl_c().await;
        info!("Shutdown signal received");
    })
    .await?;

    // drain: in-flight ticks finish, checkpoints are already persisted
    registry.shutdown().await;
    state.shutdown().await;
    println!("settlementd: stopped");
    Ok(())
}

/// Calculate the settlement plan and move the case forward
async fn cmd_plan(config: &Config, case_ref: &str) -> Result<()> {
    let state = StateManager::spawn(&config.store_path)?;
    let mut case = state
        .get_case(case_ref)
        .await?
        .ok_or_else(|| eyre::eyre!("Case {case_ref} not found"))?;

    let plan = plan::calculate(&case.financials, &case.creditors)?;
    println!("Plan for {case_ref}: {:?}", plan.kind);
    println!("  garnishable: {}", plan.garnishable_amount.format_eur_de());
    println!("  total debt:  {}", plan.total_debt.format_eur_de());
    println!("  quota:       {:.2} %", plan.repayment_quota_percent());
    for allocation in &plan.allocations {
        println!(
            "  {} -> {} / month",
            allocation.creditor_name,
            allocation.monthly_amount.format_eur_de()
        );
    }

    case.plan = Some(plan);
    if case.status == CaseStatus::Intake {
        advance(&mut case, CaseStatus::PlanCalculated)?;
    }
    case.touch();
    state.put_case(case).await?;
    state.shutdown().await;
    Ok(())
}

/// Generate a document batch and write the files to a directory
async fn cmd_generate(config: &Config, case_ref: &str, batch: &str, output: &std::path::Path) -> Result<()> {
    let Some(batch) = BatchKind::parse(batch) else {
        bail!(
            "Unknown batch '{batch}' (expected one of: settlement_proposal, zero_payment_plan, insolvency_petition)"
        );
    };

    let state = StateManager::spawn(&config.store_path)?;
    let mut case = state
        .get_case(case_ref)
        .await?
        .ok_or_else(|| eyre::eyre!("Case {case_ref} not found"))?;

    let engine = TemplateEngine::new()?;
    let documents = engine.generate(&case, batch, Utc::now().date_naive())?;

    fs::create_dir_all(output).context("Failed to create output directory")?;
    for document in &documents {
        let path = output.join(&document.filename);
        match &document.body {
            DocumentBody::Text(text) => fs::write(&path, text)?,
            DocumentBody::Form(values) => fs::write(&path, serde_json::to_string_pretty(values)?)?,
        }
        println!("wrote {}", path.display());
    }

    case.record_documents(documents.into_iter().map(|d| d.record).collect());
    // a freshly generated proposal batch counts as dispatched
    if batch == BatchKind::SettlementProposal && case.status == CaseStatus::PlanCalculated {
        advance(&mut case, CaseStatus::ProposalSent)?;
        println!("case {case_ref} -> {}", case.status.as_str());
    }
    state.put_case(case).await?;
    state.shutdown().await;
    Ok(())
}

/// Print one case with creditors and response statistics
async fn cmd_status(config: &Config, case_ref: &str) -> Result<()> {
    let state = StateManager::spawn(&config.store_path)?;
    let case = state
        .get_case(case_ref)
        .await?
        .ok_or_else(|| eyre::eyre!("Case {case_ref} not found"))?;

    println!("{} [{}]", case.reference, case.status.as_str());
    println!("  debtor:     {}", case.debtor.full_name);
    println!("  total debt: {}", case.total_debt().format_eur_de());
    for creditor in &case.creditors {
        println!(
            "  - {} {} ({})",
            creditor.name,
            creditor.claim_amount.format_eur_de(),
            creditor.response_status.as_str()
        );
    }
    if let Some(stats) = &case.statistics {
        println!(
            "  responses: {}/{} accepted, {} declined/counter, {} silent",
            stats.count_accepted, stats.count_total, stats.count_declined_or_counter, stats.count_no_response
        );
        println!(
            "  quorum: {:.1} % by count, {:.1} % by sum -> {:?}",
            stats.acceptance_count_percent(),
            stats.acceptance_sum_percent(),
            stats.outcome
        );
    }
    if let Some(session) = state.get_session(case_ref).await? {
        println!(
            "  monitoring: active={} interval={}m last_checked={} erroring={}",
            session.active, session.interval_minutes, session.last_checked_at, session.erroring
        );
    }
    state.shutdown().await;
    Ok(())
}

/// List every case with its lifecycle status
async fn cmd_cases(config: &Config) -> Result<()> {
    let state = StateManager::spawn(&config.store_path)?;
    let mut cases = state.list_cases().await?;
    cases.sort_by(|a, b| a.reference.cmp(&b.reference));

    if cases.is_empty() {
        println!("No cases in store");
    }
    for case in cases {
        println!(
            "{:<20} {:<26} {:>2} creditor(s) {}",
            case.reference,
            case.status.as_str(),
            case.creditors.len(),
            case.total_debt().format_eur_de()
        );
    }
    state.shutdown().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use settlementd::domain::{EmploymentStatus, FinancialSnapshot, Gender, MaritalStatus};
    use settlementd::{Case, Creditor, Debtor, Money};
    use tempfile::TempDir;

    fn seeded_case() -> Case {
        let mut case = Case::new(
            "MAND_001",
            Debtor {
                full_name: "Mustermann, Max".to_string(),
                street: "Musterstrasse".to_string(),
                house_number: "12".to_string(),
                postal_code: "45127".to_string(),
                city: "Essen".to_string(),
                phone: None,
                email: None,
                gender: Gender::Maennlich,
                marital_status: MaritalStatus::Ledig,
                employment: EmploymentStatus::Angestellt,
                children: 0,
            },
            FinancialSnapshot {
                net_income: Money::from_eur(2200),
                dependents: 0,
            },
        );
        case.creditors.push(Creditor::new("A", "addr", Money::from_eur(500)));
        case.plan = Some(plan::calculate(&case.financials, &case.creditors).unwrap());
        advance(&mut case, CaseStatus::PlanCalculated).unwrap();
        case
    }

    #[tokio::test]
    async fn test_generate_proposal_dispatches_case() {
        let temp = TempDir::new().unwrap();
        let config = Config {
            store_path: temp.path().join("store"),
            ..Config::default()
        };

        let state = StateManager::spawn(&config.store_path).unwrap();
        state.put_case(seeded_case()).await.unwrap();
        state.shutdown().await;

        let output = temp.path().join("out");
        cmd_generate(&config, "MAND_001", "settlement_proposal", &output)
            .await
            .unwrap();

        let state = StateManager::spawn(&config.store_path).unwrap();
        let case = state.get_case("MAND_001").await.unwrap().unwrap();
        assert_eq!(case.status, CaseStatus::ProposalSent);
        assert!(case.proposal_sent_at.is_some());
        assert!(case.has_batch(BatchKind::SettlementProposal.as_str()));
        state.shutdown().await;

        // regeneration of the same batch leaves the status alone
        cmd_generate(&config, "MAND_001", "settlement_proposal", &output)
            .await
            .unwrap();
        let state = StateManager::spawn(&config.store_path).unwrap();
        let case = state.get_case("MAND_001").await.unwrap().unwrap();
        assert_eq!(case.status, CaseStatus::ProposalSent);
        state.shutdown().await;
    }
}
