//! Document-level synchronization
//!
//! The orchestrator owns the three table controllers, subscribes them to the
//! command bus, and turns graph events into table batches. Every batch is
//! preceded by a host readiness check; a busy host aborts the whole
//! operation before anything is written.

use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::RwLock;

use ng_core::events::events::{
    BatchCommitted, CommandRequested, HandlerFailed, SyncAborted, VisualAttributeSetInWorkbook,
};
use ng_core::{
    AttributeValue, AttributesEditedInGraph, CollapsedGroupId, Command, CommandBus,
    CommandHandler, EventBus, GraphEvent, GraphRect, GroupCommand, GroupsCollapsedOrExpanded,
    LayoutCompleted, NoParamCommand, RowId, SubscriptionId, SyncSettings, VerticesMoved,
    VisualizationSurface,
};
use ng_data::mapping::{
    map_to_category_colors, map_to_color, map_to_numeric_range, AutofillOutcome, ColorGradient,
};
use ng_data::{DataError, NumericMapping, TableHandle, TabularStore};

use crate::controller::{
    BatchOutcome, EdgeController, GroupController, TableController, TableKind, VertexController,
};
use crate::guard::ActiveSheetGuard;
use crate::selection::SelectionCoordinator;
use crate::SyncError;

/// Per-table outcomes of one synchronization operation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    pub tables: Vec<(TableKind, BatchOutcome)>,
}

impl SyncReport {
    pub fn record(&mut self, kind: TableKind, outcome: BatchOutcome) {
        self.tables.push((kind, outcome));
    }

    /// Outcomes summed over every table
    pub fn total(&self) -> BatchOutcome {
        let mut total = BatchOutcome::default();
        for (_, outcome) in &self.tables {
            total.merge(*outcome);
        }
        total
    }

    pub fn outcome(&self, kind: TableKind) -> BatchOutcome {
        let mut total = BatchOutcome::default();
        for (_, outcome) in self.tables.iter().filter(|(k, _)| *k == kind) {
            total.merge(*outcome);
        }
        total
    }

    pub fn is_empty(&self) -> bool {
        self.total().is_empty()
    }
}

/// Keeps the workbook tables and the visualization surface consistent
pub struct SyncOrchestrator {
    settings: SyncSettings,
    store: Arc<dyn TabularStore>,
    surface: Arc<dyn VisualizationSurface>,
    commands: Arc<CommandBus>,
    notifications: Arc<EventBus>,

    edges: Arc<EdgeController>,
    vertices: Arc<VertexController>,
    groups: Arc<GroupController>,
    subscriptions: Vec<SubscriptionId>,

    selection: SelectionCoordinator,
    /// Collapsed group to group-table Row ID, rebuilt whenever the graph is
    /// read or a collapsed group is missing from it
    collapsed_rows: RwLock<AHashMap<CollapsedGroupId, RowId>>,
}

impl SyncOrchestrator {
    /// Create the controllers and subscribe them to the command bus.
    ///
    /// The edge controller sees commands first, then vertices, then groups.
    pub fn new(
        settings: SyncSettings,
        store: Arc<dyn TabularStore>,
        surface: Arc<dyn VisualizationSurface>,
        commands: Arc<CommandBus>,
        notifications: Arc<EventBus>,
    ) -> Self {
        let edges = Arc::new(EdgeController::new(store.clone(), &settings));
        let vertices = Arc::new(VertexController::new(store.clone(), &settings));
        let groups = Arc::new(GroupController::new(store.clone(), &settings));

        let subscriptions = vec![
            commands.subscribe(edges.clone() as Arc<dyn CommandHandler>),
            commands.subscribe(vertices.clone() as Arc<dyn CommandHandler>),
            commands.subscribe(groups.clone() as Arc<dyn CommandHandler>),
        ];
        let selection = SelectionCoordinator::new(settings.general.sync_selection);

        Self {
            settings,
            store,
            surface,
            commands,
            notifications,
            edges,
            vertices,
            groups,
            subscriptions,
            selection,
            collapsed_rows: RwLock::new(AHashMap::new()),
        }
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    pub fn store(&self) -> &dyn TabularStore {
        self.store.as_ref()
    }

    pub fn surface(&self) -> &dyn VisualizationSurface {
        self.surface.as_ref()
    }

    pub fn commands(&self) -> &Arc<CommandBus> {
        &self.commands
    }

    pub fn notifications(&self) -> &Arc<EventBus> {
        &self.notifications
    }

    pub fn edges(&self) -> &EdgeController {
        &self.edges
    }

    pub fn vertices(&self) -> &VertexController {
        &self.vertices
    }

    pub fn groups(&self) -> &GroupController {
        &self.groups
    }

    pub fn selection(&self) -> &SelectionCoordinator {
        &self.selection
    }

    /// The shared controller for one table
    pub fn table_controller(&self, kind: TableKind) -> &TableController {
        match kind {
            TableKind::Edges => self.edges.table(),
            TableKind::Vertices => self.vertices.table(),
            TableKind::Groups => self.groups.table(),
        }
    }

    fn ensure_ready(&self, operation: &str) -> Result<(), SyncError> {
        if self.store.is_ready() {
            return Ok(());
        }
        tracing::warn!("Host not ready; abandoning {}", operation);
        Err(SyncError::HostNotReady)
    }

    // ---- Graph events ----

    /// Process one graph event and report what was written
    pub fn handle(&self, event: &GraphEvent) -> Result<SyncReport, SyncError> {
        self.ensure_ready(event.name())?;
        tracing::debug!("Handling {}", event.name());

        match event {
            GraphEvent::LayoutCompleted(e) => self.on_layout_completed(e),
            GraphEvent::VerticesMoved(e) => self.on_vertices_moved(e),
            GraphEvent::GroupsCollapsedOrExpanded(e) => self.on_groups_collapsed_or_expanded(e),
            GraphEvent::AttributesEditedInGraph(e) => self.on_attributes_edited_in_graph(e),
        }
    }

    /// Top-level entry for graph events.
    ///
    /// Failures never escape: they are logged and published to the shell as
    /// notifications.
    pub fn dispatch(&self, event: &GraphEvent) -> Option<SyncReport> {
        match self.handle(event) {
            Ok(report) => {
                self.publish_batches(&report);
                Some(report)
            }
            Err(SyncError::HostNotReady) => {
                self.notifications.publish(SyncAborted {
                    operation: event.name().to_string(),
                    reason: SyncError::HostNotReady.to_string(),
                });
                None
            }
            Err(e) => {
                tracing::error!("Handling {} failed: {}", event.name(), e);
                self.notifications.publish(HandlerFailed {
                    event: event.name().to_string(),
                    error: e.to_string(),
                });
                None
            }
        }
    }

    fn publish_batches(&self, report: &SyncReport) {
        for (kind, outcome) in &report.tables {
            if outcome.columns_committed == 0 {
                continue;
            }
            self.notifications.publish(BatchCommitted {
                table: self.table_controller(*kind).location().table.clone(),
                rows_written: outcome.rows_written,
                columns_committed: outcome.columns_committed,
            });
        }
    }

    /// Layout finished: write vertex locations, leaving locked vertices alone
    pub fn on_layout_completed(&self, event: &LayoutCompleted) -> Result<SyncReport, SyncError> {
        let mut report = SyncReport::default();
        report.record(
            TableKind::Vertices,
            self.vertices
                .set_vertex_locations(&event.vertices, event.graph_rect, true)?,
        );
        report.record(
            TableKind::Groups,
            self.write_collapsed_group_locations(event.graph_rect)?,
        );
        Ok(report)
    }

    /// The user dragged vertices: write their locations even if locked
    pub fn on_vertices_moved(&self, event: &VerticesMoved) -> Result<SyncReport, SyncError> {
        let mut report = SyncReport::default();
        report.record(
            TableKind::Vertices,
            self.vertices
                .set_vertex_locations(&event.vertices, event.graph_rect, false)?,
        );
        report.record(
            TableKind::Groups,
            self.write_collapsed_group_locations(event.graph_rect)?,
        );
        Ok(report)
    }

    /// Groups were collapsed or expanded.
    ///
    /// When the change came from a pane refresh rather than a direct user
    /// action, the next layout event writes the locations; writing them here
    /// too would double every write.
    pub fn on_groups_collapsed_or_expanded(
        &self,
        event: &GroupsCollapsedOrExpanded,
    ) -> Result<SyncReport, SyncError> {
        let mut report = SyncReport::default();
        if !event.redrawn_immediately {
            tracing::debug!("Group change not redrawn yet; locations follow the next layout");
            return Ok(report);
        }
        report.record(
            TableKind::Groups,
            self.write_collapsed_group_locations(event.graph_rect)?,
        );
        Ok(report)
    }

    /// Write attributes the user edited in the graph to both tables
    pub fn on_attributes_edited_in_graph(
        &self,
        event: &AttributesEditedInGraph,
    ) -> Result<SyncReport, SyncError> {
        let mut report = SyncReport::default();
        if let Some(edits) = &event.edge_edits {
            report.record(
                TableKind::Edges,
                self.edges.apply_edited_attributes(&event.edge_ids, edits)?,
            );
        }
        if let Some(edits) = &event.vertex_edits {
            report.record(
                TableKind::Vertices,
                self.vertices
                    .apply_edited_attributes(&event.vertex_ids, edits)?,
            );
        }
        Ok(report)
    }

    fn write_collapsed_group_locations(
        &self,
        graph_rect: GraphRect,
    ) -> Result<BatchOutcome, SyncError> {
        let collapsed = self.surface.collapsed_groups();
        if collapsed.is_empty() {
            return Ok(BatchOutcome::default());
        }
        if self.groups.table().try_table().is_none() {
            tracing::debug!("No group table; collapsed group locations not written");
            return Ok(BatchOutcome::default());
        }

        // Groups added to the workbook since the last read need a fresh table
        let stale = {
            let rows = self.collapsed_rows.read();
            collapsed.iter().any(|g| !rows.contains_key(&g.group))
        };
        if stale {
            self.on_workbook_read()?;
        }
        let rows = self.collapsed_rows.read();
        self.groups
            .set_collapsed_locations(&collapsed, &rows, graph_rect)
    }

    // ---- Collapsed group side table ----

    /// Rebuild the collapsed group side table from the group table.
    ///
    /// Returns the number of groups found.
    pub fn on_workbook_read(&self) -> Result<usize, SyncError> {
        let rows = self.groups.read_group_row_ids()?;
        let count = rows.len();
        *self.collapsed_rows.write() = rows;
        tracing::debug!("Read {} group(s) from the workbook", count);
        Ok(count)
    }

    /// Record the group-table row a collapsed group came from
    pub fn register_collapsed_group(&self, group: impl Into<CollapsedGroupId>, row_id: RowId) {
        self.collapsed_rows.write().insert(group.into(), row_id);
    }

    /// Group-table row of a collapsed group
    pub fn collapsed_group_row(&self, group: &str) -> Option<RowId> {
        self.collapsed_rows.read().get(group).copied()
    }

    // ---- Commands ----

    /// Apply a visual attribute to whatever table rows are selected.
    ///
    /// Returns whether some table applied it. The surface is refreshed
    /// afterwards with selection notifications suppressed, so the refresh
    /// doesn't wipe the table selection the user just acted on.
    pub fn set_visual_attribute(&self, value: AttributeValue) -> Result<bool, SyncError> {
        self.ensure_ready("SetVisualAttribute")?;

        let mut command = Command::set_visual_attribute(value);
        self.commands.send(&mut command);
        if !command.is_handled() {
            tracing::debug!("No selected table rows took {:?}", value.attribute());
            return Ok(false);
        }

        self.notifications.publish(VisualAttributeSetInWorkbook {
            attribute: value.attribute(),
            table: self.store.active_sheet(),
        });

        let _suppressed = self.selection.suppress();
        self.surface.refresh();
        Ok(true)
    }

    /// Send a no-parameter command to every subscriber.
    ///
    /// Reading the workbook also rebuilds the collapsed group side table.
    pub fn send_no_param(&self, command: NoParamCommand) -> Result<usize, SyncError> {
        if matches!(
            command,
            NoParamCommand::ReadWorkbook | NoParamCommand::ShowGraphAndReadWorkbook
        ) {
            self.ensure_ready("ReadWorkbook")?;
            self.on_workbook_read()?;
        }

        let delivered = self.commands.send(&mut Command::NoParam(command));
        if matches!(
            command,
            NoParamCommand::UpdateLayout | NoParamCommand::ReadWorkbook
        ) {
            self.notifications.publish(CommandRequested { command });
        }
        Ok(delivered)
    }

    /// Collapse or expand groups named in the group table.
    ///
    /// The collapsed flags are written first, then the surface is asked to
    /// redraw the groups through the command bus. Returns the groups acted on.
    pub fn run_group_command(
        &self,
        command: GroupCommand,
    ) -> Result<Vec<CollapsedGroupId>, SyncError> {
        self.ensure_ready("GroupCommand")?;

        let names: Vec<CollapsedGroupId> = if command.applies_to_selection() {
            let mut names: Vec<_> = self.groups.selected_group_names()?.into_iter().collect();
            names.sort();
            names
        } else {
            self.groups.all_group_names()?
        };
        if names.is_empty() {
            tracing::debug!("{:?}: no groups to act on", command);
            return Ok(names);
        }

        let collapse = command.collapses();
        let outcome = self.groups.set_collapsed_flags(&names, collapse)?;
        let mut report = SyncReport::default();
        report.record(TableKind::Groups, outcome);
        self.publish_batches(&report);

        self.commands.send(&mut Command::CollapseOrExpandGroups {
            collapse,
            groups: names.clone(),
        });
        Ok(names)
    }

    // ---- Autofill ----

    fn autofill<F>(&self, kind: TableKind, fill: F) -> Result<AutofillOutcome, SyncError>
    where
        F: FnOnce(&dyn TabularStore, &TableHandle) -> Result<AutofillOutcome, DataError>,
    {
        self.ensure_ready("Autofill")?;
        let table = self.table_controller(kind).table()?;
        let _active = ActiveSheetGuard::activate(self.store(), &table.sheet)?;
        Ok(fill(self.store(), &table)?)
    }

    /// Map a numeric column onto a numeric attribute column
    pub fn autofill_numeric(
        &self,
        kind: TableKind,
        source_column: &str,
        dest_column: &str,
        mapping: &NumericMapping,
    ) -> Result<AutofillOutcome, SyncError> {
        self.autofill(kind, |store, table| {
            map_to_numeric_range(store, table, source_column, dest_column, mapping)
        })
    }

    /// Map a numeric column onto a color gradient
    pub fn autofill_color(
        &self,
        kind: TableKind,
        source_column: &str,
        dest_column: &str,
        mapping: &NumericMapping,
        gradient: ColorGradient,
    ) -> Result<AutofillOutcome, SyncError> {
        self.autofill(kind, |store, table| {
            map_to_color(store, table, source_column, dest_column, mapping, gradient)
        })
    }

    /// Give each distinct value of a column its own color
    pub fn autofill_categories(
        &self,
        kind: TableKind,
        source_column: &str,
        dest_column: &str,
    ) -> Result<AutofillOutcome, SyncError> {
        self.autofill(kind, |store, table| {
            map_to_category_colors(store, table, source_column, dest_column)
        })
    }

    // ---- Selection ----

    /// The user changed the selection in one of the tables
    pub fn on_table_selection_changed(&self, kind: TableKind) -> Result<bool, SyncError> {
        self.ensure_ready("TableSelectionChanged")?;
        self.selection.on_table_selection_changed(
            kind,
            &self.edges,
            &self.vertices,
            &self.groups,
            self.surface.as_ref(),
        )
    }

    /// The user changed the selection in the graph
    pub fn on_graph_selection_changed(&self) -> Result<bool, SyncError> {
        self.ensure_ready("GraphSelectionChanged")?;
        self.selection.on_graph_selection_changed(
            &self.edges,
            &self.vertices,
            &self.groups,
            self.surface.as_ref(),
        )
    }
}

impl Drop for SyncOrchestrator {
    fn drop(&mut self) {
        for id in self.subscriptions.drain(..) {
            self.commands.unsubscribe(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ng_core::{CollapsedGroupVertex, PointF, VertexLocation};
    use ng_data::{CellValue, MemoryStore, RowSpan, SelectedRows};
    use parking_lot::Mutex;

    #[derive(Default)]
    struct StubSurface {
        collapsed: Mutex<Vec<CollapsedGroupVertex>>,
        refreshes: Mutex<usize>,
    }

    impl VisualizationSurface for StubSurface {
        fn collapsed_groups(&self) -> Vec<CollapsedGroupVertex> {
            self.collapsed.lock().clone()
        }
        fn is_collapsed_group(&self, group: &str) -> bool {
            self.collapsed.lock().iter().any(|g| g.group == group)
        }
        fn selected_vertex_ids(&self) -> Vec<RowId> {
            Vec::new()
        }
        fn selected_edge_ids(&self) -> Vec<RowId> {
            Vec::new()
        }
        fn selected_collapsed_groups(&self) -> Vec<CollapsedGroupId> {
            Vec::new()
        }
        fn select(&self, _vertex_ids: &[RowId], _edge_ids: &[RowId]) {}
        fn select_collapsed_groups(&self, _groups: &[CollapsedGroupId]) {}
        fn refresh(&self) {
            *self.refreshes.lock() += 1;
        }
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        surface: Arc<StubSurface>,
        notifications: Arc<EventBus>,
        orchestrator: SyncOrchestrator,
        vertices: TableHandle,
        groups: TableHandle,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        store.add_table("Edges", "Edges", &["ID", "Color"]);
        let vertices = store.add_table(
            "Vertices",
            "Vertices",
            &["ID", "Vertex", "Color", "Locked?", "X", "Y"],
        );
        let groups = store.add_table(
            "Groups",
            "Groups",
            &["ID", "Group", "Collapsed X", "Collapsed Y"],
        );
        for (id, name) in [(1_i64, "a"), (2, "b")] {
            store
                .append_row(&vertices, vec![("ID", id.into()), ("Vertex", name.into())])
                .unwrap();
        }
        store
            .append_row(&groups, vec![("ID", 5_i64.into()), ("Group", "g".into())])
            .unwrap();

        let surface = Arc::new(StubSurface::default());
        let notifications = Arc::new(EventBus::new());
        let orchestrator = SyncOrchestrator::new(
            SyncSettings::default(),
            store.clone(),
            surface.clone(),
            Arc::new(CommandBus::new()),
            notifications.clone(),
        );
        Fixture {
            store,
            surface,
            notifications,
            orchestrator,
            vertices,
            groups,
        }
    }

    fn rect() -> GraphRect {
        GraphRect::new(0.0, 0.0, 100.0, 100.0)
    }

    #[test]
    fn test_layout_writes_vertices_and_collapsed_groups() {
        let f = fixture();
        f.store.set_cell(&f.vertices, "Locked?", 2, "Yes".into()).unwrap();
        f.surface.collapsed.lock().push(CollapsedGroupVertex {
            group: "g".into(),
            location: PointF::new(0.0, 100.0),
        });

        let event = GraphEvent::LayoutCompleted(LayoutCompleted {
            graph_rect: rect(),
            vertices: vec![
                VertexLocation::new(1, 100.0, 0.0),
                VertexLocation::new(2, 100.0, 0.0),
            ],
        });
        let report = f.orchestrator.handle(&event).unwrap();

        assert_eq!(report.outcome(TableKind::Vertices).rows_written, 1);
        assert_eq!(report.outcome(TableKind::Vertices).rows_skipped, 1);
        assert_eq!(report.outcome(TableKind::Groups).rows_written, 1);
        assert_eq!(f.store.cell(&f.vertices, "X", 1), Some(CellValue::Number(9999.0)));
        assert_eq!(f.store.cell(&f.vertices, "X", 2), Some(CellValue::Empty));
        assert_eq!(f.store.cell(&f.groups, "Collapsed Y", 1), Some(CellValue::Number(0.0)));
        assert_eq!(f.orchestrator.collapsed_group_row("g"), Some(5));
    }

    #[test]
    fn test_refresh_driven_collapse_writes_nothing() {
        let f = fixture();
        f.surface.collapsed.lock().push(CollapsedGroupVertex {
            group: "g".into(),
            location: PointF::new(10.0, 10.0),
        });
        let event = |redrawn_immediately| {
            GraphEvent::GroupsCollapsedOrExpanded(GroupsCollapsedOrExpanded {
                graph_rect: rect(),
                redrawn_immediately,
            })
        };

        assert!(f.orchestrator.handle(&event(false)).unwrap().is_empty());
        assert_eq!(f.store.total_writes(), 0);

        f.orchestrator.handle(&event(true)).unwrap();
        assert_eq!(f.store.write_count(&f.groups, "Collapsed X"), 1);
        assert_eq!(f.store.write_count(&f.groups, "Collapsed Y"), 1);
    }

    #[test]
    fn test_busy_host_aborts_and_notifies() {
        let f = fixture();
        let aborted = Arc::new(Mutex::new(Vec::new()));
        let sink = aborted.clone();
        f.notifications
            .subscribe_fn::<SyncAborted, _>(move |e| sink.lock().push(e.operation.clone()));

        f.store.set_ready(false);
        let event = GraphEvent::VerticesMoved(VerticesMoved {
            graph_rect: rect(),
            vertices: vec![VertexLocation::new(1, 5.0, 5.0)],
        });

        assert!(f.orchestrator.dispatch(&event).is_none());
        assert_eq!(*aborted.lock(), vec!["VerticesMoved".to_string()]);
        assert_eq!(f.store.total_writes(), 0);
        assert!(matches!(
            f.orchestrator.set_visual_attribute(AttributeValue::Alpha(50.0)),
            Err(SyncError::HostNotReady)
        ));
    }

    #[test]
    fn test_failed_handler_is_reported() {
        let f = fixture();
        let failures = Arc::new(Mutex::new(Vec::new()));
        let sink = failures.clone();
        f.notifications
            .subscribe_fn::<HandlerFailed, _>(move |e| sink.lock().push(e.event.clone()));
        f.store.fail_writes_to(&f.vertices, "X");

        let event = GraphEvent::VerticesMoved(VerticesMoved {
            graph_rect: rect(),
            vertices: vec![VertexLocation::new(1, 5.0, 5.0)],
        });
        assert!(f.orchestrator.dispatch(&event).is_none());
        assert_eq!(*failures.lock(), vec!["VerticesMoved".to_string()]);
    }

    #[test]
    fn test_visual_attribute_goes_to_active_table_and_refreshes() {
        let f = fixture();
        f.store.activate_sheet("Vertices").unwrap();
        f.store
            .select_rows(&f.vertices, &SelectedRows::new(vec![RowSpan::single(2)]))
            .unwrap();
        let set = Arc::new(Mutex::new(Vec::new()));
        let sink = set.clone();
        f.notifications
            .subscribe_fn::<VisualAttributeSetInWorkbook, _>(move |e| sink.lock().push(e.table.clone()));

        let handled = f
            .orchestrator
            .set_visual_attribute(AttributeValue::Color(ng_core::Color::rgb(0, 0, 255)))
            .unwrap();

        assert!(handled);
        assert_eq!(f.store.cell(&f.vertices, "Color", 2), Some("Blue".into()));
        assert_eq!(*set.lock(), vec!["Vertices".to_string()]);
        assert_eq!(*f.surface.refreshes.lock(), 1);
        assert!(!f.orchestrator.selection().is_ignoring());
    }

    #[test]
    fn test_group_command_writes_flags_then_asks_surface() {
        let f = fixture();
        let sent = Arc::new(Mutex::new(Vec::new()));
        let sink = sent.clone();
        f.orchestrator.commands().subscribe_fn(move |command| {
            if let Command::CollapseOrExpandGroups { collapse, groups } = command {
                sink.lock().push((*collapse, groups.clone()));
            }
        });

        let names = f
            .orchestrator
            .run_group_command(GroupCommand::CollapseAllGroups)
            .unwrap();

        assert_eq!(names, vec!["g".to_string()]);
        assert_eq!(f.store.cell(&f.groups, "Collapsed?", 1), Some("Yes".into()));
        assert_eq!(*sent.lock(), vec![(true, vec!["g".to_string()])]);
    }

    #[test]
    fn test_drop_unsubscribes_controllers() {
        let f = fixture();
        let commands = f.orchestrator.commands().clone();
        assert_eq!(commands.subscriber_count(), 3);
        drop(f);
        assert_eq!(commands.subscriber_count(), 0);
    }
}
