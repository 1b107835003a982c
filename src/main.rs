#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use clap::Parser;
use eframe::{egui, App, NativeOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use readweave::config::{self, ReaderConfig};
use readweave::error::ConfigError;
use readweave::reading::{StyledText, Tap};
use readweave::types::{SegmentRef, TermData, TermDetails, TermForm, TermStatus, TextContent};
use readweave::{ReaderEvent, ReadingEngine, ScrollPosition};

#[derive(Parser, Debug)]
#[command(name = "readweave", about = "Desktop reader for a language-learning server")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Book to open at startup. Defaults to the last opened book.
    #[arg(long)]
    book: Option<u64>,

    /// Page to jump to after opening the book.
    #[arg(long)]
    page: Option<u32>,
}

const EDITABLE_STATUSES: [TermStatus; 8] = [
    TermStatus::Unknown,
    TermStatus::Learning1,
    TermStatus::Learning2,
    TermStatus::Learning3,
    TermStatus::Learning4,
    TermStatus::Known,
    TermStatus::Ignored,
    TermStatus::WellKnown,
];

struct EditorState {
    term: TermData,
    form: TermForm,
    parents_text: String,
    tags_text: String,
}

struct ReaderApp {
    engine: ReadingEngine,
    runtime: tokio::runtime::Handle,
    events: broadcast::Receiver<ReaderEvent>,
    config_error: Option<String>,

    content: Option<Arc<TextContent>>,
    styled: Vec<StyledText>,
    highlights_visible: bool,
    rest_known: bool,
    pending_scroll: Option<f32>,

    popup: Option<(TermData, Option<TermDetails>)>,
    editor: Option<EditorState>,
    book_input: String,
    status_line: String,
    last_error: Option<String>,
}

impl ReaderApp {
    fn new(
        _cc: &eframe::CreationContext<'_>,
        engine: ReadingEngine,
        runtime: tokio::runtime::Handle,
        config_error: Option<String>,
    ) -> Self {
        let events = engine.subscribe();
        let highlights_visible = engine.highlights_visible();

        let retry = engine.clone();
        runtime.spawn(async move {
            let failed = retry.retry_term_drafts().await;
            if !failed.is_empty() {
                warn!(?failed, "term drafts still unsent");
            }
        });
        ReaderApp {
            engine,
            runtime,
            events,
            config_error,
            content: None,
            styled: Vec::new(),
            highlights_visible,
            rest_known: false,
            pending_scroll: None,
            popup: None,
            editor: None,
            book_input: String::new(),
            status_line: "No book open".to_string(),
            last_error: None,
        }
    }

    fn open_book(&self, book_id: u64, page: Option<u32>) {
        let engine = self.engine.clone();
        self.runtime.spawn(async move {
            if engine.open_book(book_id).await.is_ok() {
                if let Some(page) = page {
                    let _ = engine.load_page(page).await;
                }
                engine.check_audio().await;
            }
        });
    }

    fn restyle(&mut self) {
        self.styled = self.engine.styled_paragraphs();
    }

    fn drain_events(&mut self) {
        loop {
            match self.events.try_recv() {
                Ok(event) => self.handle_event(event),
                Err(TryRecvError::Lagged(missed)) => {
                    warn!(missed, "UI fell behind the event stream; resyncing");
                    self.content = self.engine.current_content();
                    self.restyle();
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
    }

    fn handle_event(&mut self, event: ReaderEvent) {
        match event {
            ReaderEvent::PageLoaded { content, groups, .. } => {
                let meta = &content.metadata;
                self.status_line = format!(
                    "Book {} · page {}/{} · {} sentence groups",
                    meta.book_id,
                    meta.page_num,
                    meta.page_count,
                    groups.len()
                );
                self.book_input = meta.book_id.to_string();
                self.content = Some(content);
                self.popup = None;
                self.editor = None;
                self.pending_scroll = Some(0.0);
                self.restyle();
            }
            ReaderEvent::HighlightsRefreshed { content, scroll, .. } => {
                self.content = Some(content);
                self.pending_scroll = Some(scroll.offset);
                self.restyle();
            }
            ReaderEvent::HighlightsToggled { visible } => {
                self.highlights_visible = visible;
                self.restyle();
            }
            ReaderEvent::ShowPopup { term, details } => self.popup = Some((term, details)),
            ReaderEvent::OpenEditor { term, form } => {
                self.popup = None;
                self.editor = Some(EditorState {
                    parents_text: form.parents.join(", "),
                    tags_text: form.tags.join(", "),
                    term,
                    form,
                });
            }
            ReaderEvent::PageMarkedDone { page_num, .. } => {
                self.status_line = format!("Page {page_num} marked done");
            }
            ReaderEvent::BookFinished { book_id } => {
                self.status_line = format!("Finished book {book_id}");
            }
            ReaderEvent::NavigationBlocked { page_num } => {
                self.status_line = format!("No more pages past {page_num}");
            }
            ReaderEvent::AudioChecked { has_audio, .. } => {
                if has_audio {
                    self.status_line.push_str(" · audio available");
                }
            }
            ReaderEvent::TermSaved { term_id } => {
                self.editor = None;
                self.status_line = format!("Saved term {term_id}");
            }
            ReaderEvent::Failure { operation, message } => {
                self.last_error = Some(format!("{operation}: {message}"));
            }
        }
    }

    fn page_view(&mut self, ui: &mut egui::Ui) {
        let Some(content) = self.content.clone() else {
            ui.label("Enter a book id and press Open.");
            return;
        };
        let mut taps = Vec::new();
        let mut area = egui::ScrollArea::vertical().id_source("page_scroll").auto_shrink([false, false]);
        if let Some(offset) = self.pending_scroll.take() {
            area = area.vertical_scroll_offset(offset);
        }
        let layout = if content.metadata.is_right_to_left {
            egui::Layout::right_to_left(egui::Align::TOP).with_main_wrap(true)
        } else {
            egui::Layout::left_to_right(egui::Align::TOP).with_main_wrap(true)
        };

        let output = area.show(ui, |ui| {
            for (p_idx, paragraph) in content.paragraphs.iter().enumerate() {
                let styled = self.styled.get(p_idx);
                let offsets = paragraph.segment_offsets();
                ui.with_layout(layout, |ui| {
                    ui.spacing_mut().item_spacing.x = 0.0;
                    for (s_idx, segment) in paragraph.segments.iter().enumerate() {
                        let mut text = egui::RichText::new(&segment.text).size(18.0);
                        if let Some(styled) = styled {
                            if let Some(bg) = styled.background_at(offsets[s_idx]) {
                                text = text.background_color(bg);
                            }
                            if let Some(fg) = styled.foreground_at(offsets[s_idx]) {
                                text = text.color(fg);
                            }
                        }
                        let label = egui::Label::new(text);
                        if segment.is_tappable() {
                            let response = ui.add(label.sense(egui::Sense::click()));
                            if response.clicked() {
                                let at = response.rect.center();
                                taps.push(Tap {
                                    target: SegmentRef { paragraph: p_idx, segment: s_idx },
                                    x: at.x,
                                    y: at.y,
                                });
                            }
                        } else {
                            ui.add(label);
                        }
                    }
                });
                ui.add_space(10.0);
            }
        });
        self.engine.set_scroll_position(ScrollPosition { paragraph: 0, offset: output.state.offset.y });
        for tap in taps {
            self.engine.tap(tap);
        }
    }

    fn popup_window(&mut self, ctx: &egui::Context) {
        let Some((term, details)) = &self.popup else { return };
        let mut open = true;
        egui::Window::new(term.term.as_str())
            .open(&mut open)
            .collapsible(false)
            .default_pos([term.tap_x, term.tap_y + 16.0])
            .show(ctx, |ui| match details {
                Some(details) => {
                    if !details.romanization.is_empty() {
                        ui.label(egui::RichText::new(&details.romanization).italics());
                    }
                    ui.label(&details.translation);
                    for parent in &details.parents {
                        ui.label(format!("{} · {}", parent.term, parent.translation));
                    }
                    if !details.tags.is_empty() {
                        ui.small(details.tags.join(", "));
                    }
                }
                None => {
                    ui.label("New word. Double-click it to add a translation.");
                }
            });
        if !open {
            self.popup = None;
        }
    }

    fn editor_window(&mut self, ctx: &egui::Context) {
        let Some(editor) = &mut self.editor else { return };
        let mut open = true;
        let mut save = false;
        egui::Window::new(format!("Edit \u{201c}{}\u{201d}", editor.term.term))
            .open(&mut open)
            .collapsible(false)
            .show(ctx, |ui| {
                if let Some(sentence) = &editor.term.sentence_context {
                    ui.label(egui::RichText::new(sentence).italics());
                    ui.separator();
                }
                egui::Grid::new("term_form").num_columns(2).show(ui, |ui| {
                    ui.label("Translation");
                    ui.text_edit_multiline(&mut editor.form.translation);
                    ui.end_row();
                    ui.label("Romanization");
                    ui.text_edit_singleline(&mut editor.form.romanization);
                    ui.end_row();
                    ui.label("Parents");
                    ui.text_edit_singleline(&mut editor.parents_text);
                    ui.end_row();
                    ui.label("Tags");
                    ui.text_edit_singleline(&mut editor.tags_text);
                    ui.end_row();
                    ui.label("Status");
                    egui::ComboBox::from_id_source("term_status")
                        .selected_text(format!("{:?}", editor.form.status))
                        .show_ui(ui, |ui| {
                            for status in EDITABLE_STATUSES {
                                ui.selectable_value(&mut editor.form.status, status, format!("{status:?}"));
                            }
                        });
                    ui.end_row();
                });
                save = ui.add_enabled(editor.form.term_id > 0, egui::Button::new("Save")).clicked();
            });

        if save {
            let split = |s: &str| -> Vec<String> {
                s.split(',').map(|t| t.trim().to_string()).filter(|t| !t.is_empty()).collect()
            };
            editor.form.parents = split(&editor.parents_text);
            editor.form.tags = split(&editor.tags_text);
            let form = editor.form.clone();
            let engine = self.engine.clone();
            self.runtime.spawn(async move {
                let _ = engine.save_term(&form).await;
            });
        }
        if !open {
            self.editor = None;
        }
    }
}

impl App for ReaderApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_events();

        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label("Book:");
                ui.add(egui::TextEdit::singleline(&mut self.book_input).desired_width(60.0));
                if ui.button("Open").clicked() {
                    match self.book_input.trim().parse::<u64>() {
                        Ok(book_id) => self.open_book(book_id, None),
                        Err(_) => self.last_error = Some(format!("not a book id: {}", self.book_input)),
                    }
                }
                ui.separator();
                if ui.button("◀ Previous").clicked() {
                    let engine = self.engine.clone();
                    self.runtime.spawn(async move { engine.go_to_previous().await });
                }
                if ui.button("Next ▶").clicked() {
                    let engine = self.engine.clone();
                    self.runtime.spawn(async move { engine.go_to_next().await });
                }
                ui.checkbox(&mut self.rest_known, "Rest known");
                if ui.button("Mark page done").clicked() {
                    let engine = self.engine.clone();
                    let rest_known = self.rest_known;
                    self.runtime.spawn(async move { engine.mark_done_and_advance(rest_known).await });
                }
                ui.separator();
                let mut visible = self.highlights_visible;
                if ui.checkbox(&mut visible, "Highlights").changed() {
                    self.engine.set_highlights_visible(visible);
                }
                if ui.button("Refresh").clicked() {
                    self.engine.refresh_highlights();
                }
            });
        });

        egui::TopBottomPanel::bottom("status_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(&self.status_line);
                if let Some(err) = &self.config_error {
                    ui.colored_label(egui::Color32::YELLOW, format!("Config: {err}"));
                }
                if let Some(err) = &self.last_error {
                    ui.colored_label(egui::Color32::RED, err);
                }
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| self.page_view(ui));
        self.popup_window(ctx);
        self.editor_window(ctx);

        // Events arrive from background tasks; poll for them.
        ctx.request_repaint_after(Duration::from_millis(100));
    }
}

fn load_config(path: &Path) -> (ReaderConfig, Option<String>) {
    let path = path.to_string_lossy();
    match config::load_config_from_file(&path) {
        Ok(config) => (config, None),
        Err(ConfigError::Read { .. }) => {
            info!(path = %path, "no config file; using defaults");
            (ReaderConfig::default(), None)
        }
        Err(e) => {
            error!(error = %e, "config rejected; using defaults");
            (ReaderConfig::default(), Some(e.to_string()))
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("readweave=info")))
        .init();

    let args = Args::parse();
    let (config, config_error) = load_config(&args.config);

    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    // The UI thread spawns engine tasks (taps, refreshes) directly.
    let _enter = runtime.enter();
    let engine = ReadingEngine::from_config(&config);
    let handle = runtime.handle().clone();
    let start_book = args.book.or_else(|| engine.session().last_book_id());

    let options = NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1100.0, 800.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Readweave",
        options,
        Box::new(move |cc| {
            let app = ReaderApp::new(cc, engine, handle, config_error);
            if let Some(book_id) = start_book {
                app.open_book(book_id, args.page);
            }
            Box::new(app)
        }),
    )?;
    Ok(())
}
