use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use eframe::egui;
use tokio::runtime::Handle;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{debug, info, warn};

use crate::config::AppSettings;
use crate::graph::layout::{LayoutDirection, NODE_HEIGHT, NODE_WIDTH};
use crate::graph::{CoverageMetrics, IssueGraph, IssueStats, NodeKind, Position, RawGraphPayload, RelationCategory};
use crate::jira::JiraCredentials;
use crate::jira::client::ProxyClient;
use crate::session::{
    FORM_DATA_KEY, GRAPH_SNAPSHOT_KEY, NODE_POSITIONS_KEY, SessionStore, load_json, store_json,
};
use crate::testcase::{GeneratedTestCase, GeneratorClient, generate_for_issue};

pub mod canvas;
pub mod events;
pub mod selection;

use self::canvas::CanvasState;
use self::events::{StudioCommand, StudioEvent, VisualizeTarget};
use self::selection::SelectionTracker;

const APP_TITLE: &str = "jirascope studio";
const CANVAS_SCALE: f32 = 0.55;
const CANVAS_PADDING: f32 = 24.0;
const NO_ISSUES_MESSAGE: &str = "No JIRA issues found for visualization";
const ISSUES_CSV_FILE: &str = "jira-issues.csv";

pub fn run_studio(settings: &AppSettings, store: Arc<dyn SessionStore>) -> Result<()> {
    let runtime_handle = Handle::try_current().context("studio requires a tokio runtime")?;

    let (command_tx, command_rx) = unbounded_channel::<StudioCommand>();
    let (event_tx, event_rx) = unbounded_channel::<StudioEvent>();
    spawn_runtime_worker(&runtime_handle, settings.clone(), command_rx, event_tx);

    info!(
        proxy = %settings.proxy_base_url,
        generator = %settings.generator_base_url,
        "starting native studio shell"
    );

    eframe::run_native(
        APP_TITLE,
        eframe::NativeOptions::default(),
        Box::new(move |_cc| Ok(Box::new(StudioApp::new(command_tx, event_rx, store)))),
    )
    .map_err(|error| anyhow::anyhow!("studio UI exited with error: {error}"))
}

fn spawn_runtime_worker(
    handle: &Handle,
    settings: AppSettings,
    mut command_rx: UnboundedReceiver<StudioCommand>,
    event_tx: UnboundedSender<StudioEvent>,
) {
    let proxy = ProxyClient::new(settings.proxy_base_url.clone(), settings.http_timeout_ms);
    let generator = GeneratorClient::new(
        settings.generator_base_url.clone(),
        settings.http_timeout_ms,
    );

    let _task = handle.spawn(async move {
        while let Some(command) = command_rx.recv().await {
            let event = match command {
                StudioCommand::TestConnection { credentials } => {
                    match proxy.test_connection(&credentials).await {
                        Ok(response) => StudioEvent::ConnectionTested {
                            message: response.message,
                        },
                        Err(error) => StudioEvent::ConnectionFailed {
                            error: error.user_message(),
                        },
                    }
                }
                StudioCommand::LoadGraph {
                    credentials,
                    target,
                } => {
                    let result = match target {
                        VisualizeTarget::CentralIssue => proxy.visualize(&credentials).await,
                        VisualizeTarget::Project => proxy.visualize_project(&credentials).await,
                    };
                    match result {
                        Ok(payload) => graph_loaded_event(payload),
                        Err(error) => StudioEvent::GraphFailed {
                            error: error.user_message(),
                        },
                    }
                }
                StudioCommand::LoadIssueDetails {
                    credentials,
                    issue_key,
                    generation,
                } => match proxy.issue_details(&credentials, &issue_key).await {
                    Ok(details) => StudioEvent::DetailsLoaded {
                        issue_key,
                        generation,
                        details: Box::new(details),
                    },
                    Err(error) => StudioEvent::DetailsFailed {
                        issue_key,
                        generation,
                        error: error.user_message(),
                    },
                },
                StudioCommand::GenerateTestCase {
                    credentials,
                    issue_key,
                    cached_details,
                } => {
                    let result = generate_for_issue(
                        &proxy,
                        &generator,
                        &credentials,
                        &issue_key,
                        cached_details.as_deref(),
                    )
                    .await;
                    match result {
                        Ok(test_case) => StudioEvent::TestCaseReady {
                            issue_key,
                            test_case: Box::new(test_case),
                        },
                        Err(error) => StudioEvent::TestCaseFailed {
                            issue_key,
                            error: error.user_message(),
                        },
                    }
                }
                StudioCommand::Shutdown => break,
            };

            if event_tx.send(event).is_err() {
                break;
            }
        }
    });
}

/// Turns a raw proxy payload into the event the UI applies: a decoded graph
/// with statistics, or a failure when nothing usable came back.
fn graph_loaded_event(payload: RawGraphPayload) -> StudioEvent {
    let graph = IssueGraph::from_payload(payload);
    if graph.nodes.is_empty() {
        return StudioEvent::GraphFailed {
            error: NO_ISSUES_MESSAGE.to_owned(),
        };
    }
    let stats = IssueStats::collect(&graph.nodes);
    let coverage = CoverageMetrics::compute(&stats, &graph.edges);
    StudioEvent::GraphLoaded {
        graph,
        stats,
        coverage,
    }
}

struct StudioApp {
    command_tx: UnboundedSender<StudioCommand>,
    event_rx: UnboundedReceiver<StudioEvent>,
    store: Arc<dyn SessionStore>,
    form: JiraCredentials,
    visualize_project: bool,
    form_status: Option<String>,
    form_error: Option<String>,
    canvas: CanvasState,
    canvas_status: String,
    selection: SelectionTracker,
    generated_test_case: Option<(String, GeneratedTestCase)>,
    generation_error: Option<String>,
    generating: bool,
    graph_loading: bool,
    runtime_disconnected: bool,
}

impl StudioApp {
    fn new(
        command_tx: UnboundedSender<StudioCommand>,
        event_rx: UnboundedReceiver<StudioEvent>,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        let form = load_json::<JiraCredentials>(store.as_ref(), FORM_DATA_KEY)
            .unwrap_or_else(crate::config::credentials_from_env);

        let mut canvas = CanvasState::default();
        let mut canvas_status = "No graph loaded. Submit the form to fetch one.".to_owned();
        if let Some(graph) = load_json::<IssueGraph>(store.as_ref(), GRAPH_SNAPSHOT_KEY) {
            let stats = IssueStats::collect(&graph.nodes);
            let coverage = CoverageMetrics::compute(&stats, &graph.edges);
            canvas.set_graph(graph, stats, coverage);
            if let Some(positions) =
                load_json::<BTreeMap<String, Position>>(store.as_ref(), NODE_POSITIONS_KEY)
            {
                canvas.restore_positions(positions);
            }
            canvas_status = format!(
                "Restored previous graph ({} issues)",
                canvas.stats().total
            );
        }

        Self {
            command_tx,
            event_rx,
            store,
            form,
            visualize_project: false,
            form_status: None,
            form_error: None,
            canvas,
            canvas_status,
            selection: SelectionTracker::default(),
            generated_test_case: None,
            generation_error: None,
            generating: false,
            graph_loading: false,
            runtime_disconnected: false,
        }
    }

    fn send_command(&mut self, command: StudioCommand) {
        if self.command_tx.send(command).is_err() && !self.runtime_disconnected {
            warn!("studio runtime worker disconnected");
            self.runtime_disconnected = true;
            self.canvas_status = "Runtime worker disconnected. Restart studio.".to_owned();
        }
    }

    fn drain_events(&mut self) {
        loop {
            match self.event_rx.try_recv() {
                Ok(event) => self.apply_event(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if !self.runtime_disconnected {
                        warn!("studio runtime worker disconnected");
                        self.canvas_status =
                            "Runtime worker disconnected. Restart studio.".to_owned();
                    }
                    self.runtime_disconnected = true;
                    self.graph_loading = false;
                    self.generating = false;
                    break;
                }
            }
        }
    }

    fn apply_event(&mut self, event: StudioEvent) {
        match event {
            StudioEvent::ConnectionTested { message } => {
                self.form_error = None;
                self.form_status = Some(if message.is_empty() {
                    "Successfully connected to JIRA!".to_owned()
                } else {
                    message
                });
            }
            StudioEvent::ConnectionFailed { error } => {
                self.form_status = None;
                self.form_error = Some(error);
            }
            StudioEvent::GraphLoaded {
                graph,
                stats,
                coverage,
            } => {
                self.graph_loading = false;
                self.form_error = None;
                self.selection.clear();
                self.generated_test_case = None;
                self.generation_error = None;
                store_json(self.store.as_ref(), GRAPH_SNAPSHOT_KEY, &graph);
                self.canvas.set_graph(graph, stats, coverage);
                self.canvas_status = format!(
                    "Loaded {} issues, {} relationships",
                    stats.total, coverage.total_relationships
                );
            }
            StudioEvent::GraphFailed { error } => {
                self.graph_loading = false;
                self.canvas_status = "Graph load failed".to_owned();
                self.form_error = Some(error);
            }
            StudioEvent::DetailsLoaded {
                issue_key,
                generation,
                details,
            } => {
                if !self.selection.apply_loaded(generation, *details) {
                    debug!(issue_key, generation, "discarding stale issue details");
                }
            }
            StudioEvent::DetailsFailed {
                issue_key,
                generation,
                error,
            } => {
                if !self.selection.apply_failed(generation, error) {
                    debug!(issue_key, generation, "discarding stale details failure");
                }
            }
            StudioEvent::TestCaseReady {
                issue_key,
                test_case,
            } => {
                self.generating = false;
                self.generation_error = None;
                self.generated_test_case = Some((issue_key, *test_case));
            }
            StudioEvent::TestCaseFailed { issue_key, error } => {
                // Prior generated test case, if any, stays as it was.
                self.generating = false;
                warn!(issue_key, error = %error, "test case generation failed");
                self.generation_error = Some(error);
            }
        }
    }

    fn submit_visualize(&mut self) {
        let credentials = self.form.normalized();
        if let Err(error) = credentials.validate(!self.visualize_project) {
            self.form_error = Some(error.to_string());
            return;
        }

        self.form_error = None;
        self.form_status = None;
        self.graph_loading = true;
        self.canvas_status = "Loading graph...".to_owned();
        store_json(self.store.as_ref(), FORM_DATA_KEY, &credentials);

        let target = if self.visualize_project {
            VisualizeTarget::Project
        } else {
            VisualizeTarget::CentralIssue
        };
        self.send_command(StudioCommand::LoadGraph {
            credentials,
            target,
        });
    }

    fn submit_test_connection(&mut self) {
        let credentials = self.form.normalized();
        if let Err(error) = credentials.validate(false) {
            self.form_error = Some(error.to_string());
            return;
        }
        self.form_error = None;
        self.form_status = Some("Testing connection...".to_owned());
        self.send_command(StudioCommand::TestConnection { credentials });
    }

    fn select_issue(&mut self, issue_key: String) {
        self.selection.select(issue_key.clone());
        let Some(generation) = self.selection.begin_loading() else {
            return;
        };
        self.send_command(StudioCommand::LoadIssueDetails {
            credentials: self.form.normalized(),
            issue_key,
            generation,
        });
    }

    fn request_test_case(&mut self) {
        let Some(issue_key) = self.selection.selected_key().map(str::to_owned) else {
            return;
        };
        self.generating = true;
        self.generation_error = None;
        let cached_details = self.selection.details().cloned().map(Box::new);
        self.send_command(StudioCommand::GenerateTestCase {
            credentials: self.form.normalized(),
            issue_key,
            cached_details,
        });
    }

    fn export_issues_csv(&mut self) {
        let Some(graph) = self.canvas.graph() else {
            return;
        };
        let csv = crate::export::issues_csv(&graph.nodes);
        match crate::export::write_csv(std::path::Path::new(ISSUES_CSV_FILE), &csv) {
            Ok(()) => self.canvas_status = format!("Exported issue list to {ISSUES_CSV_FILE}"),
            Err(error) => {
                warn!(%error, "issue CSV export failed");
                self.canvas_status = "CSV export failed; see log".to_owned();
            }
        }
    }

    fn export_test_case_csv(&mut self) {
        let Some((issue_key, test_case)) = &self.generated_test_case else {
            return;
        };
        let file_name = format!("test-case-{issue_key}.csv");
        let csv = crate::export::test_case_csv(test_case);
        match crate::export::write_csv(std::path::Path::new(&file_name), &csv) {
            Ok(()) => self.canvas_status = format!("Exported test case to {file_name}"),
            Err(error) => {
                warn!(%error, "test case CSV export failed");
                self.canvas_status = "CSV export failed; see log".to_owned();
            }
        }
    }

    fn render_form_pane(&mut self, ui: &mut egui::Ui) {
        ui.heading("JIRA Connection");
        ui.add_space(4.0);

        ui.label("Username or email");
        ui.text_edit_singleline(&mut self.form.username);
        ui.label("API token");
        ui.add(egui::TextEdit::singleline(&mut self.form.api_token).password(true));
        ui.label("Base URL");
        ui.text_edit_singleline(&mut self.form.base_url);
        ui.label("Project ID");
        ui.text_edit_singleline(&mut self.form.project_id);
        ui.label("Central JIRA ID");
        ui.text_edit_singleline(&mut self.form.central_jira_id);
        ui.checkbox(&mut self.visualize_project, "Visualize whole project");

        ui.add_space(6.0);
        ui.horizontal(|ui| {
            if ui
                .add_enabled(!self.runtime_disconnected, egui::Button::new("Test Connection"))
                .clicked()
            {
                self.submit_test_connection();
            }
            let can_visualize = !self.graph_loading && !self.runtime_disconnected;
            if ui
                .add_enabled(can_visualize, egui::Button::new("Visualize"))
                .clicked()
            {
                self.submit_visualize();
            }
        });

        if self.graph_loading {
            ui.label("Loading graph...");
        }
        if let Some(status) = &self.form_status {
            ui.colored_label(egui::Color32::from_rgb(26, 103, 64), status);
        }
        if let Some(error) = &self.form_error {
            ui.colored_label(egui::Color32::from_rgb(173, 33, 33), error);
        }
        if self.runtime_disconnected {
            ui.colored_label(
                egui::Color32::from_rgb(173, 33, 33),
                "Runtime worker is disconnected.",
            );
        }
    }

    fn render_issue_list(&mut self, ui: &mut egui::Ui) {
        ui.heading("Issues");
        let mut listed: Vec<(String, String, String, NodeKind)> = self
            .canvas
            .displayed_nodes()
            .iter()
            .map(|node| {
                (
                    node.data.key.clone(),
                    node.data.summary.clone(),
                    node.id.clone(),
                    node.kind,
                )
            })
            .collect();
        listed.sort_by(|a, b| compare_issue_keys(&a.0, &b.0));

        if listed.is_empty() {
            ui.label("No JIRA issues found matching criteria");
            return;
        }

        let mut clicked = None;
        egui::ScrollArea::vertical()
            .id_salt("issue_list")
            .show(ui, |ui| {
                for (key, summary, _id, kind) in &listed {
                    let label = egui::RichText::new(format!("{key}: {summary}"))
                        .color(kind_color(*kind));
                    if ui
                        .add(egui::Label::new(label).sense(egui::Sense::click()))
                        .clicked()
                    {
                        clicked = Some(key.clone());
                    }
                }
            });
        if let Some(key) = clicked {
            self.select_issue(key);
        }
    }

    fn render_canvas_controls(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label("Search");
            let mut term = self.canvas.filter().search_term().to_owned();
            if ui.text_edit_singleline(&mut term).changed() {
                self.canvas.filter_mut().set_search_term(term);
                self.canvas.clear_highlight();
            }
            let can_highlight = !self.canvas.filter().search_term().trim().is_empty();
            if ui
                .add_enabled(can_highlight, egui::Button::new("Highlight Path"))
                .clicked()
                && !self.canvas.apply_highlight()
            {
                self.canvas_status = "No issues match the search term".to_owned();
            }
            if let Some(overlay) = self.canvas.highlight() {
                ui.label(format!("{} issues highlighted", overlay.len()));
                if ui.button("Clear highlight").clicked() {
                    self.canvas.clear_highlight();
                }
            }
        });

        ui.horizontal(|ui| {
            let stats = self.canvas.stats();
            for kind in crate::graph::ALL_NODE_KINDS {
                let selected = self.canvas.filter().is_selected(kind);
                let label = match kind {
                    NodeKind::Requirement => format!("Requirements ({})", stats.requirements),
                    NodeKind::Test => format!("Tests ({})", stats.tests),
                    NodeKind::Defect => format!("Defects ({})", stats.defects),
                    NodeKind::Related => format!("Other ({})", stats.other),
                    NodeKind::Central | NodeKind::Parent => capitalize(kind.as_str()),
                };
                if ui.selectable_label(selected, label).clicked() {
                    self.canvas.filter_mut().toggle_kind(kind);
                }
            }
        });

        ui.horizontal(|ui| {
            ui.label("Layout");
            for direction in [LayoutDirection::TopToBottom, LayoutDirection::LeftToRight] {
                let selected = self.canvas.direction() == direction;
                if ui.selectable_label(selected, direction.as_str()).clicked() {
                    self.canvas.set_direction(direction);
                }
            }
            if ui.button("Export CSV").clicked() {
                self.export_issues_csv();
            }
            ui.label(&self.canvas_status);
        });
    }

    fn render_graph_canvas(&mut self, ui: &mut egui::Ui) {
        struct PaintedNode {
            id: String,
            key: String,
            status: String,
            kind: NodeKind,
            position: Position,
            opacity: f32,
        }

        let (painted_nodes, painted_edges) = {
            let visible = self.canvas.displayed_nodes();
            let edges = self.canvas.displayed_edges(&visible);
            let nodes: Vec<PaintedNode> = visible
                .iter()
                .map(|node| PaintedNode {
                    id: node.id.clone(),
                    key: node.data.key.clone(),
                    status: node.data.status.clone(),
                    kind: node.kind,
                    position: self.canvas.position_of(node),
                    opacity: self
                        .canvas
                        .highlight()
                        .map_or(1.0, |overlay| overlay.opacity_for(&node.id)),
                })
                .collect();
            let edges: Vec<(String, String, RelationCategory, bool)> = edges
                .iter()
                .map(|edge| {
                    (
                        edge.source.clone(),
                        edge.target.clone(),
                        edge.category(),
                        edge.animated,
                    )
                })
                .collect();
            (nodes, edges)
        };

        let (response, painter) = ui.allocate_painter(
            ui.available_size(),
            egui::Sense::hover(),
        );
        let origin = response.rect.min + egui::vec2(CANVAS_PADDING, CANVAS_PADDING);
        let node_size = egui::vec2(NODE_WIDTH * CANVAS_SCALE, NODE_HEIGHT * CANVAS_SCALE);

        let mut centers = BTreeMap::<&str, egui::Pos2>::new();
        for node in &painted_nodes {
            let top_left = origin
                + egui::vec2(
                    node.position.x * CANVAS_SCALE,
                    node.position.y * CANVAS_SCALE,
                );
            centers.insert(node.id.as_str(), top_left + node_size / 2.0);
        }

        for (source, target, category, animated) in &painted_edges {
            let (Some(&from), Some(&to)) = (centers.get(source.as_str()), centers.get(target.as_str()))
            else {
                continue;
            };
            let stroke = egui::Stroke::new(2.0, edge_color(*category));
            if *animated {
                painter.extend(egui::Shape::dashed_line(&[from, to], stroke, 8.0, 5.0));
            } else {
                painter.line_segment([from, to], stroke);
            }
        }

        let mut dragged: Option<(String, egui::Vec2)> = None;
        let mut clicked: Option<String> = None;
        let mut drag_finished = false;
        for node in &painted_nodes {
            let top_left = origin
                + egui::vec2(
                    node.position.x * CANVAS_SCALE,
                    node.position.y * CANVAS_SCALE,
                );
            let rect = egui::Rect::from_min_size(top_left, node_size);
            let fill = kind_color(node.kind).gamma_multiply(node.opacity);
            let is_selected = self.selection.selected_key() == Some(node.key.as_str());
            if is_selected {
                painter.rect_filled(rect.expand(3.0), egui::CornerRadius::same(6), egui::Color32::WHITE);
            }
            painter.rect_filled(rect, egui::CornerRadius::same(4), fill);
            painter.text(
                rect.min + egui::vec2(6.0, 6.0),
                egui::Align2::LEFT_TOP,
                &node.key,
                egui::FontId::proportional(12.0),
                egui::Color32::WHITE.gamma_multiply(node.opacity),
            );
            painter.text(
                rect.min + egui::vec2(6.0, 24.0),
                egui::Align2::LEFT_TOP,
                &node.status,
                egui::FontId::proportional(10.0),
                status_color(&node.status).gamma_multiply(node.opacity),
            );

            let node_response = ui.interact(
                rect,
                ui.id().with(("graph-node", node.id.as_str())),
                egui::Sense::click_and_drag(),
            );
            if node_response.clicked() {
                clicked = Some(node.key.clone());
            }
            if node_response.dragged() {
                dragged = Some((node.id.clone(), node_response.drag_delta()));
            }
            if node_response.drag_stopped() {
                drag_finished = true;
            }
        }

        if let Some((node_id, delta)) = dragged {
            self.canvas
                .drag_node(&node_id, delta.x / CANVAS_SCALE, delta.y / CANVAS_SCALE);
        }
        if drag_finished {
            store_json(self.store.as_ref(), NODE_POSITIONS_KEY, self.canvas.positions());
        }
        if let Some(key) = clicked {
            self.select_issue(key);
        }
    }

    fn render_details_panel(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.heading("Issue Details");
            if ui.button("Clear").clicked() {
                self.selection.clear();
            }
        });
        let Some(issue_key) = self.selection.selected_key().map(str::to_owned) else {
            return;
        };

        let graph_node = self
            .canvas
            .graph()
            .and_then(|graph| graph.node_by_key(&issue_key))
            .cloned();
        if let Some(node) = &graph_node {
            ui.label(egui::RichText::new(&node.data.key).strong());
            ui.label(&node.data.summary);
            ui.label(format!("Type: {}", node.data.issue_type));
            ui.label(format!("Status: {}", node.data.status));
            if let Some(priority) = &node.data.priority {
                ui.label(format!("Priority: {priority}"));
            }
        }

        if self.selection.is_loading() {
            ui.label("Loading details...");
        }
        if let Some(error) = self.selection.detail_error() {
            ui.colored_label(egui::Color32::from_rgb(173, 33, 33), error);
        }
        if let Some(details) = self.selection.details() {
            ui.separator();
            ui.label(egui::RichText::new("Description").strong());
            ui.label(details.description.to_plain_text());
            if !details.labels.is_empty() {
                ui.label(format!("Labels: {}", details.labels.join(", ")));
            }
            if !details.components.is_empty() {
                ui.label(format!("Components: {}", details.components.join(", ")));
            }
            if !details.comments.is_empty() {
                ui.label(format!("Comments: {}", details.comments.len()));
            }
        }

        if let Some(node) = &graph_node {
            let connections: Vec<String> = self
                .canvas
                .graph()
                .map(|graph| {
                    graph
                        .connections_of(&node.id)
                        .into_iter()
                        .filter_map(|(edge, other_id)| {
                            let other = graph.node_by_id(other_id)?;
                            let direction = if edge.source == node.id {
                                "Outgoing"
                            } else {
                                "Incoming"
                            };
                            Some(format!("{} ({direction})", other.data.key))
                        })
                        .collect()
                })
                .unwrap_or_default();
            if !connections.is_empty() {
                ui.separator();
                ui.label(egui::RichText::new("Connections").strong());
                for connection in connections {
                    ui.label(connection);
                }
            }
        }

        ui.separator();
        let can_generate = !self.generating && !self.runtime_disconnected;
        if ui
            .add_enabled(can_generate, egui::Button::new("Generate Test Case"))
            .clicked()
        {
            self.request_test_case();
        }
        if self.generating {
            ui.label("Generating test case using AI...");
        }
        if let Some(error) = &self.generation_error {
            ui.colored_label(egui::Color32::from_rgb(173, 33, 33), error);
        }
        if let Some((key, test_case)) = &self.generated_test_case {
            ui.separator();
            ui.label(egui::RichText::new(format!("Test case for {key}")).strong());
            ui.label(&test_case.summary);
            ui.label(format!(
                "{} | {} | {} steps",
                test_case.test_type,
                test_case.priority,
                test_case.steps.len()
            ));
            if !test_case.precondition.is_empty() {
                ui.label(format!("Precondition: {}", test_case.precondition));
            }
            for (index, step) in test_case.steps.iter().enumerate() {
                ui.group(|ui| {
                    ui.label(format!("Step {}: {}", index + 1, step.step));
                    if !step.data.is_empty() {
                        ui.label(format!("Data: {}", step.data));
                    }
                    ui.label(format!("Expected: {}", step.expected));
                });
            }
            if ui.button("Export Test Case CSV").clicked() {
                self.export_test_case_csv();
            }
        }
    }

    fn render_analytics_strip(&self, ui: &mut egui::Ui) {
        let stats = self.canvas.stats();
        let coverage = self.canvas.coverage();
        ui.horizontal(|ui| {
            ui.label(format!("Total: {}", stats.total));
            ui.label(format!("Requirements: {}", stats.requirements));
            ui.label(format!("Tests: {}", stats.tests));
            ui.label(format!("Defects: {}", stats.defects));
            ui.label(format!("Other: {}", stats.other));
            ui.separator();
            ui.label(match coverage.test_coverage_ratio {
                Some(ratio) => format!("Test coverage: {ratio:.1}%"),
                None => "Test coverage: N/A".to_owned(),
            });
            ui.label(match coverage.defect_rate {
                Some(rate) => format!("Defect rate: {rate:.1}%"),
                None => "Defect rate: N/A".to_owned(),
            });
            ui.label(format!(
                "Relationships: {}",
                coverage.total_relationships
            ));
            ui.label(format!(
                "Avg connections: {:.1}",
                coverage.average_connections
            ));
        });
    }
}

impl Drop for StudioApp {
    fn drop(&mut self) {
        let _ = self.command_tx.send(StudioCommand::Shutdown);
    }
}

impl eframe::App for StudioApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_events();

        egui::SidePanel::left("studio_form_pane")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical()
                    .id_salt("form_pane")
                    .show(ui, |ui| {
                        self.render_form_pane(ui);
                        ui.separator();
                        self.render_issue_list(ui);
                    });
            });

        if self.selection.selected_key().is_some() {
            egui::SidePanel::right("studio_details_pane")
                .resizable(true)
                .default_width(340.0)
                .show(ctx, |ui| {
                    egui::ScrollArea::vertical()
                        .id_salt("details_pane")
                        .show(ui, |ui| self.render_details_panel(ui));
                });
        }

        egui::TopBottomPanel::bottom("studio_analytics").show(ctx, |ui| {
            self.render_analytics_strip(ui);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.render_canvas_controls(ui);
            ui.separator();
            self.render_graph_canvas(ui);
        });

        ctx.request_repaint_after(std::time::Duration::from_millis(120));
    }
}

fn kind_color(kind: NodeKind) -> egui::Color32 {
    match kind {
        NodeKind::Central => egui::Color32::from_rgb(0xff, 0x98, 0x00),
        NodeKind::Parent => egui::Color32::from_rgb(0x9c, 0x27, 0xb0),
        NodeKind::Requirement => egui::Color32::from_rgb(0x4d, 0xab, 0xf5),
        NodeKind::Test => egui::Color32::from_rgb(0x66, 0xbb, 0x6a),
        NodeKind::Defect => egui::Color32::from_rgb(0xf4, 0x43, 0x36),
        NodeKind::Related => egui::Color32::from_rgb(0x9e, 0x9e, 0x9e),
    }
}

fn edge_color(category: RelationCategory) -> egui::Color32 {
    match category {
        RelationCategory::Blocking => egui::Color32::from_rgb(0xf4, 0x43, 0x36),
        RelationCategory::Verification => egui::Color32::from_rgb(0x66, 0xbb, 0x6a),
        RelationCategory::Implementation => egui::Color32::from_rgb(0x4d, 0xab, 0xf5),
        RelationCategory::Other => egui::Color32::from_rgb(0x55, 0x55, 0x55),
    }
}

fn status_color(status: &str) -> egui::Color32 {
    let lower = status.to_ascii_lowercase();
    if lower.contains("done") || lower.contains("closed") || lower.contains("complete") {
        egui::Color32::from_rgb(0x66, 0xbb, 0x6a)
    } else if lower.contains("progress") || lower.contains("review") || lower.contains("testing") {
        egui::Color32::from_rgb(0xff, 0x98, 0x00)
    } else if lower.contains("to do") || lower.contains("new") || lower.contains("open") {
        egui::Color32::from_rgb(0x21, 0x96, 0xf3)
    } else if lower.contains("block") || lower.contains("impediment") {
        egui::Color32::from_rgb(0xf4, 0x43, 0x36)
    } else {
        egui::Color32::from_rgb(0x9e, 0x9e, 0x9e)
    }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Orders issue keys the way a human expects: by project prefix, then by the
/// numeric suffix, so ABC-9 sorts before ABC-10.
fn compare_issue_keys(a: &str, b: &str) -> Ordering {
    let split = |key: &str| -> (String, Option<u64>) {
        match key.rsplit_once('-') {
            Some((prefix, digits)) => match digits.parse::<u64>() {
                Ok(number) => (prefix.to_owned(), Some(number)),
                Err(_) => (key.to_owned(), None),
            },
            None => (key.to_owned(), None),
        }
    };
    let (prefix_a, number_a) = split(a);
    let (prefix_b, number_b) = split(b);
    prefix_a
        .cmp(&prefix_b)
        .then(number_a.cmp(&number_b))
        .then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use std::cmp::Ordering;

    use serde_json::json;

    use crate::graph::{NodeKind, RawGraphPayload, RelationCategory};

    use super::{
        StudioEvent, compare_issue_keys, edge_color, graph_loaded_event, kind_color, status_color,
    };

    fn payload(value: serde_json::Value) -> RawGraphPayload {
        serde_json::from_value(value).expect("payload should deserialize")
    }

    #[test]
    fn empty_payload_becomes_a_graph_failure() {
        let event = graph_loaded_event(payload(json!({ "nodes": [], "edges": [] })));
        match event {
            StudioEvent::GraphFailed { error } => {
                assert_eq!(error, "No JIRA issues found for visualization");
            }
            other => panic!("expected GraphFailed, got {other:?}"),
        }
    }

    #[test]
    fn single_node_payload_loads_with_stats() {
        let event = graph_loaded_event(payload(json!({
            "nodes": [
                {
                    "id": "A",
                    "type": "central",
                    "data": { "key": "A-1", "summary": "S", "issue_type": "Story", "status": "Open" }
                }
            ],
            "edges": []
        })));

        match event {
            StudioEvent::GraphLoaded { graph, stats, coverage } => {
                assert_eq!(graph.nodes.len(), 1);
                assert!(graph.edges.is_empty());
                assert_eq!(stats.total, 1);
                assert_eq!(stats.other, 0);
                assert_eq!(coverage.total_relationships, 0);
            }
            other => panic!("expected GraphLoaded, got {other:?}"),
        }
    }

    #[test]
    fn node_palette_matches_the_legend() {
        assert_eq!(
            kind_color(NodeKind::Central),
            eframe::egui::Color32::from_rgb(0xff, 0x98, 0x00)
        );
        assert_eq!(
            kind_color(NodeKind::Defect),
            eframe::egui::Color32::from_rgb(0xf4, 0x43, 0x36)
        );
        assert_eq!(
            edge_color(RelationCategory::Verification),
            eframe::egui::Color32::from_rgb(0x66, 0xbb, 0x6a)
        );
    }

    #[test]
    fn status_colors_bucket_by_keyword() {
        assert_eq!(status_color("Done"), status_color("Closed"));
        assert_eq!(status_color("In Progress"), status_color("In Review"));
        assert_eq!(status_color("To Do"), status_color("Open"));
        assert_eq!(status_color("Blocked"), status_color("Impediment"));
        assert_ne!(status_color("Done"), status_color("Blocked"));
    }

    #[test]
    fn issue_keys_sort_numerically_within_a_project() {
        assert_eq!(compare_issue_keys("ABC-9", "ABC-10"), Ordering::Less);
        assert_eq!(compare_issue_keys("ABC-10", "ABC-9"), Ordering::Greater);
        assert_eq!(compare_issue_keys("ABC-1", "XYZ-1"), Ordering::Less);
        assert_eq!(compare_issue_keys("ABC-1", "ABC-1"), Ordering::Equal);
    }
}
