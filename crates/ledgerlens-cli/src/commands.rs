//! Command implementations for the LedgerLens CLI

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use ledgerlens_core::{
    DocumentKind, DocumentStatus, ExtractionBackend, Ledger, Pipeline, Transaction,
};
use uuid::Uuid;

/// Pick the document kind from the file extension
fn kind_for(file: &Path) -> DocumentKind {
    match file.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("pdf") => DocumentKind::Pdf,
        _ => DocumentKind::Image,
    }
}

/// Upload one file and wait for its terminal state
async fn ingest_file(pipeline: &Pipeline, file: &Path) -> Result<Uuid> {
    if !file.exists() {
        return Err(anyhow!("File not found: {}", file.display()));
    }
    let raw_content = std::fs::read(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let mut events = pipeline.subscribe_events();
    let id = pipeline.upload_document(raw_content, kind_for(file))?;

    loop {
        let doc = pipeline.get_document(id)?;
        if doc.status.is_terminal() {
            return Ok(id);
        }
        events
            .recv()
            .await
            .context("Event stream closed before extraction finished")?;
    }
}

fn print_transactions(transactions: &[Transaction]) {
    for tx in transactions {
        println!(
            "    {}  {:>10}  {:<16} {}",
            tx.date,
            format!("{:+.2}", tx.signed_amount()),
            format!("({})", tx.category),
            tx.description
        );
    }
}

fn print_document(pipeline: &Pipeline, id: Uuid) -> Result<()> {
    let doc = pipeline.get_document(id)?;
    match doc.status {
        DocumentStatus::Completed => {
            println!(
                "✓ {} extracted, {} transaction(s)",
                doc.kind.as_str(),
                doc.extracted_transactions.len()
            );
            print_transactions(&doc.extracted_transactions);
            if let Some(analysis) = &doc.analysis {
                println!("    {}", analysis);
            }
        }
        DocumentStatus::Rejected => {
            let reason = doc.analysis.as_deref().unwrap_or("no reason given");
            println!("✗ {} rejected: {}", doc.kind.as_str(), reason);
        }
        other => println!("  {} is {}", doc.kind.as_str(), other.as_str()),
    }
    Ok(())
}

/// Ingest documents, optionally merging the results into a ledger
pub async fn cmd_ingest(files: &[std::path::PathBuf], merge: bool, json: bool) -> Result<()> {
    let pipeline = Pipeline::from_env();
    if !pipeline.is_available() {
        return Err(anyhow!(
            "No extraction service configured. Set LEDGERLENS_AI_HOST (and \
             LEDGERLENS_AI_API_KEY if the service requires one)."
        ));
    }

    let mut ids = Vec::new();
    for file in files {
        println!("Ingesting {}...", file.display());
        ids.push(ingest_file(&pipeline, file).await?);
    }

    if json {
        let docs: Vec<_> = ids
            .iter()
            .map(|&id| pipeline.get_document(id))
            .collect::<ledgerlens_core::Result<_>>()?;
        println!("{}", serde_json::to_string_pretty(&docs)?);
        return Ok(());
    }

    for &id in &ids {
        print_document(&pipeline, id)?;
    }

    if merge {
        let mut ledger = Ledger::new();
        for &id in &ids {
            pipeline.merge_into_ledger(id, &mut ledger)?;
        }
        println!("\nLedger ({} transactions):", ledger.len());
        print_transactions(ledger.all());
    }

    Ok(())
}

/// One chat exchange, optionally focused on a freshly ingested document
pub async fn cmd_chat(message: &str, file: Option<&Path>) -> Result<()> {
    let pipeline = Pipeline::from_env();

    let mut ledger = Ledger::new();
    let mut document_id = None;
    if let Some(file) = file {
        if !pipeline.is_available() {
            return Err(anyhow!(
                "No extraction service configured; cannot ingest {}",
                file.display()
            ));
        }
        println!("Ingesting {}...", file.display());
        let id = ingest_file(&pipeline, file).await?;
        print_document(&pipeline, id)?;
        pipeline.merge_into_ledger(id, &mut ledger)?;
        document_id = Some(id);
    }

    let ledger_ref = if ledger.is_empty() { None } else { Some(&ledger) };
    let reply = pipeline
        .send_chat_message(message, document_id, ledger_ref)
        .await?;
    println!("\n{}", reply.text);
    Ok(())
}

/// Ingest documents, merge everything, and print insights
pub async fn cmd_insights(files: &[std::path::PathBuf]) -> Result<()> {
    let pipeline = Pipeline::from_env();
    if !pipeline.is_available() {
        return Err(anyhow!("No extraction service configured"));
    }

    let mut ledger = Ledger::new();
    for file in files {
        println!("Ingesting {}...", file.display());
        let id = ingest_file(&pipeline, file).await?;
        print_document(&pipeline, id)?;
        pipeline.merge_into_ledger(id, &mut ledger)?;
    }

    if ledger.is_empty() {
        println!("\nNo transactions to analyze.");
        return Ok(());
    }

    let insights = pipeline.fetch_insights(&ledger).await;
    if insights.is_empty() {
        println!("\nNo insights available right now.");
    } else {
        println!("\nInsights:");
        for insight in &insights {
            println!("  • {}", insight);
        }
    }
    Ok(())
}

/// Show extraction service configuration and reachability
pub async fn cmd_status() -> Result<()> {
    let pipeline = Pipeline::from_env();

    match pipeline.client() {
        Some(client) => {
            println!("Extraction service");
            println!("  Host:  {}", client.host());
            println!("  Model: {}", client.model());
            if client.health_check().await {
                println!("  Reachable: yes");
            } else {
                println!("  Reachable: no");
            }
        }
        None => {
            println!("No extraction service configured.");
            println!("Set LEDGERLENS_AI_HOST to enable document ingestion.");
        }
    }
    Ok(())
}
