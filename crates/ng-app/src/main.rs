//! Replay graph events and table commands against a workbook snapshot
//!
//! Loads a JSON workbook, runs a script of steps through the synchronization
//! engine with an in-memory store and a headless graph, and prints every
//! table as CSV.

use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};

use ng_core::events::events::{
    BatchCommitted, CommandRequested, HandlerFailed, SyncAborted, VisualAttributeSetInWorkbook,
};
use ng_core::{CommandBus, CommandHandler, EventBus, SyncSettings};
use ng_data::mapping::ColorGradient;
use ng_data::{MemoryStore, RowSpan, SelectedRows, TabularStore, WorkbookSnapshot};
use ng_sync::{SyncError, SyncOrchestrator, TableKind};

mod script;
mod surface;

use script::{Script, Step};
use surface::ReplaySurface;

#[derive(Parser, Debug)]
#[command(
    name = "netgrid-replay",
    about = "Replay graph events and table commands against a workbook snapshot"
)]
struct Cli {
    /// Workbook snapshot (JSON)
    workbook: PathBuf,

    /// Script of steps to replay (JSON)
    script: PathBuf,

    /// Table and column names (JSON); defaults apply when omitted
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Write each table to <dir>/<table>.csv instead of stdout
    #[arg(long = "out-dir")]
    out_dir: Option<PathBuf>,

    /// Write the final workbook snapshot to this path
    #[arg(long = "snapshot-out")]
    snapshot_out: Option<PathBuf>,
}

/// Log every notification the engine raises
fn subscribe_notifications(bus: &EventBus) {
    bus.subscribe_fn::<BatchCommitted, _>(|e| {
        info!(
            "Committed {} column(s), {} row(s) to {}",
            e.columns_committed, e.rows_written, e.table
        );
    });
    bus.subscribe_fn::<VisualAttributeSetInWorkbook, _>(|e| {
        info!("{:?} set on {}", e.attribute, e.table);
    });
    bus.subscribe_fn::<SyncAborted, _>(|e| {
        warn!("{} aborted: {}", e.operation, e.reason);
    });
    bus.subscribe_fn::<HandlerFailed, _>(|e| {
        error!("{} failed: {}", e.event, e.error);
    });
    bus.subscribe_fn::<CommandRequested, _>(|e| {
        info!("Shell asked to run {:?}", e.command);
    });
}

/// A busy host is reported and skipped; anything else stops the replay
fn tolerate_busy<T>(operation: &str, result: Result<T, SyncError>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(SyncError::HostNotReady) => {
            warn!("{}: {}", operation, SyncError::HostNotReady);
            Ok(None)
        }
        Err(e) => Err(e).with_context(|| format!("{} failed", operation)),
    }
}

fn run_step(
    orchestrator: &SyncOrchestrator,
    store: &MemoryStore,
    surface: &ReplaySurface,
    step: &Step,
) -> Result<()> {
    match step {
        Step::GraphEvent(event) => {
            if let Some(report) = orchestrator.dispatch(event) {
                let total = report.total();
                info!(
                    "{}: {} row(s) written, {} skipped",
                    event.name(),
                    total.rows_written,
                    total.rows_skipped
                );
            }
        }
        Step::SetVisualAttribute(value) => {
            if let Some(false) =
                tolerate_busy("Set attribute", orchestrator.set_visual_attribute(*value))?
            {
                info!("No selected rows took {:?}", value.attribute());
            }
        }
        Step::Command(command) => {
            tolerate_busy("Command", orchestrator.send_no_param(*command))?;
        }
        Step::GroupCommand(command) => {
            if let Some(groups) =
                tolerate_busy("Group command", orchestrator.run_group_command(*command))?
            {
                info!("{:?}: {:?}", command, groups);
            }
        }
        Step::ActivateSheet(sheet) => {
            store
                .activate_sheet(sheet)
                .with_context(|| format!("Failed to activate sheet {}", sheet))?;
        }
        Step::SelectRows { table, first, last } => {
            let kind = TableKind::from(*table);
            let handle = orchestrator.table_controller(kind).table()?;
            store.select_rows(&handle, &SelectedRows::new(vec![RowSpan::new(*first, *last)]))?;
            tolerate_busy("Table selection", orchestrator.on_table_selection_changed(kind))?;
        }
        Step::SelectInGraph {
            vertices,
            edges,
            groups,
        } => {
            surface.set_selection(vertices.clone(), edges.clone(), groups.clone());
            tolerate_busy("Graph selection", orchestrator.on_graph_selection_changed())?;
        }
        Step::CollapsedGroups(groups) => surface.set_collapsed(groups.clone()),
        Step::SetReady(ready) => store.set_ready(*ready),
        Step::AutofillNumeric {
            table,
            source,
            dest,
            mapping,
        } => {
            if let Some(outcome) = tolerate_busy(
                "Autofill",
                orchestrator.autofill_numeric((*table).into(), source, dest, mapping),
            )? {
                info!("Autofilled {} from {}: {:?}", dest, source, outcome);
            }
        }
        Step::AutofillColor {
            table,
            source,
            dest,
            mapping,
            from,
            to,
        } => {
            let gradient = ColorGradient::new(*from, *to);
            if let Some(outcome) = tolerate_busy(
                "Autofill",
                orchestrator.autofill_color((*table).into(), source, dest, mapping, gradient),
            )? {
                info!("Autofilled {} from {}: {:?}", dest, source, outcome);
            }
        }
        Step::AutofillCategories {
            table,
            source,
            dest,
        } => {
            if let Some(outcome) = tolerate_busy(
                "Autofill",
                orchestrator.autofill_categories((*table).into(), source, dest),
            )? {
                info!("Autofilled {} from {}: {:?}", dest, source, outcome);
            }
        }
    }
    Ok(())
}

fn write_tables(store: &MemoryStore, out_dir: Option<&PathBuf>) -> Result<()> {
    for table in store.snapshot().tables {
        let Some(handle) = store.try_get_table(&table.sheet, &table.table) else {
            continue;
        };
        match out_dir {
            Some(dir) => {
                let path = dir.join(format!("{}.csv", table.table));
                let file = File::create(&path)
                    .with_context(|| format!("Failed to create {}", path.display()))?;
                store.write_csv(&handle, file)?;
                info!("Wrote {}", path.display());
            }
            None => {
                println!("# {}", handle);
                store.write_csv(&handle, io::stdout())?;
                println!();
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let settings = match &cli.settings {
        Some(path) => SyncSettings::from_json_file(path)
            .with_context(|| format!("Failed to load settings {}", path.display()))?,
        None => SyncSettings::default(),
    };
    let snapshot = WorkbookSnapshot::from_json_file(&cli.workbook)
        .with_context(|| format!("Failed to load workbook {}", cli.workbook.display()))?;
    let store = Arc::new(MemoryStore::from_snapshot(snapshot)?);
    let script = Script::from_json_file(&cli.script)?;

    let surface = Arc::new(ReplaySurface::new());
    let commands = Arc::new(CommandBus::new());
    let notifications = Arc::new(EventBus::new());
    subscribe_notifications(&notifications);

    let orchestrator = SyncOrchestrator::new(
        settings,
        store.clone(),
        surface.clone(),
        commands.clone(),
        notifications,
    );
    // The graph sees commands after every table
    commands.subscribe(surface.clone() as Arc<dyn CommandHandler>);

    let groups = orchestrator.on_workbook_read()?;
    info!(
        "Replaying {} step(s) against {} table(s), {} group(s)",
        script.steps.len(),
        store.snapshot().tables.len(),
        groups
    );

    for (index, step) in script.steps.iter().enumerate() {
        run_step(&orchestrator, &store, &surface, step)
            .with_context(|| format!("Step {} failed", index + 1))?;
    }

    if let Some(path) = &cli.snapshot_out {
        let json = store.snapshot().to_json_string()?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write snapshot {}", path.display()))?;
    }
    write_tables(&store, cli.out_dir.as_ref())
}
