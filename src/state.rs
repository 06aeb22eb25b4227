use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use ropey::Rope;
use serde_json::Value;
use tower_lsp::lsp_types::{Position, Url};
use tracing::debug;

use crate::config::Config;
use crate::decorations::RenderSurface;
use crate::events::{ActiveDocumentEvent, EventHub, SelectionEvent};
use crate::link_resolve::DocumentContext;
use crate::visibility::{LinkRanges, TriggerZone, VisibilityController};

/// Per-document state: rope content + the language the client reported.
pub struct DocumentState {
    pub rope: Rope,
    pub language_id: String,
}

impl DocumentState {
    pub fn new(rope: Rope, language_id: String) -> Self {
        Self { rope, language_id }
    }
}

/// Shared backend state for the LSP server.
///
/// Holds the workspace root, configuration, open document contents, the
/// cursor/active-document feeds and the live visibility controllers.
pub struct BackendState {
    /// Root of the first workspace folder, used for root-relative links.
    pub workspace_root: RwLock<Option<PathBuf>>,

    pub config: RwLock<Config>,

    /// Raw config layers below client settings.
    pub config_layers: RwLock<Value>,

    /// In-memory content of open documents, keyed by URI.
    pub documents: Arc<DashMap<Url, DocumentState>>,

    /// Last cursor position reported per document.
    pub cursors: DashMap<Url, Position>,

    /// One controller per document that has had links requested.
    pub controllers: DashMap<Url, VisibilityController>,

    pub selection_events: EventHub<SelectionEvent>,
    pub active_document_events: EventHub<ActiveDocumentEvent>,
}

impl BackendState {
    pub fn new() -> Self {
        Self {
            workspace_root: RwLock::new(None),
            config: RwLock::new(Config::default()),
            config_layers: RwLock::new(Value::Object(Default::default())),
            documents: Arc::new(DashMap::new()),
            cursors: DashMap::new(),
            controllers: DashMap::new(),
            selection_events: EventHub::new(),
            active_document_events: EventHub::new(),
        }
    }

    /// Cheap clone of the document rope, so callers never hold a map guard.
    pub fn rope(&self, uri: &Url) -> Option<Rope> {
        self.documents.get(uri).map(|r| r.rope.clone())
    }

    /// Whether links should be provided for this document at all.
    pub fn accepts(&self, uri: &Url) -> bool {
        let Some(language_id) = self.documents.get(uri).map(|d| d.language_id.clone()) else {
            return false;
        };
        self.config.read().accepts_language(&language_id)
    }

    pub fn document_context(&self, uri: &Url) -> DocumentContext {
        DocumentContext::new(
            uri,
            self.workspace_root.read().clone(),
            self.config.read().root_relative_paths,
        )
    }

    /// Create a fresh controller for `uri`, replacing (and so disposing) any
    /// previous one.
    pub fn install_controller(&self, uri: &Url, links: Vec<LinkRanges>, surface: Arc<dyn RenderSurface>) {
        let zone = TriggerZone::from_config(&self.config.read());
        let cursor = self.cursors.get(uri).map(|c| *c);
        let controller = VisibilityController::attach(
            uri.clone(),
            links,
            zone,
            cursor,
            surface,
            &self.selection_events,
            &self.active_document_events,
        );
        let expanded = controller.state().expanded.len();
        let previous = self.controllers.insert(uri.clone(), controller);
        debug!(
            uri = %uri,
            expanded,
            replaced = previous.is_some(),
            "state: controller installed"
        );
    }

    /// Re-feed a live controller after an edit. No-op when none is attached.
    pub fn refresh_controller(&self, uri: &Url, links: Vec<LinkRanges>) {
        if let Some(controller) = self.controllers.get(uri) {
            controller.refresh(links);
        }
    }

    /// Move every live controller onto the zone of the current config.
    pub fn retune_controllers(&self) {
        let zone = TriggerZone::from_config(&self.config.read());
        for controller in self.controllers.iter() {
            controller.set_zone(zone);
        }
        debug!(controllers = self.controllers.len(), ?zone, "state: trigger zone updated");
    }

    pub fn remove_controller(&self, uri: &Url) {
        if let Some((_, controller)) = self.controllers.remove(uri) {
            controller.dispose();
        }
    }

    /// Drop controllers that disposed themselves on an active-document change.
    pub fn prune_controllers(&self) {
        self.controllers.retain(|_, c| !c.is_disposed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decorations::testing::RecordingSurface;

    fn uri(name: &str) -> Url {
        Url::parse(&format!("file:///proj/{}", name)).unwrap()
    }

    fn open(state: &BackendState, uri: &Url, text: &str, language: &str) {
        state
            .documents
            .insert(uri.clone(), DocumentState::new(Rope::from_str(text), language.to_string()));
    }

    #[test]
    fn replacing_controller_disposes_previous() {
        let state = BackendState::new();
        let surface = Arc::new(RecordingSurface::default());
        let doc = uri("a.py");
        state.install_controller(&doc, Vec::new(), surface.clone());
        state.install_controller(&doc, Vec::new(), surface.clone());
        assert_eq!(state.controllers.len(), 1);
        assert_eq!(state.selection_events.len(), 1);
    }

    #[test]
    fn prune_removes_retired_controllers() {
        let state = BackendState::new();
        let surface = Arc::new(RecordingSurface::default());
        state.install_controller(&uri("a.py"), Vec::new(), surface.clone());
        state.install_controller(&uri("b.py"), Vec::new(), surface.clone());

        state.active_document_events.emit(&ActiveDocumentEvent {
            uri: Some(uri("b.py")),
        });
        state.prune_controllers();
        assert_eq!(state.controllers.len(), 1);
        assert!(state.controllers.contains_key(&uri("b.py")));
    }

    #[test]
    fn trigger_change_keeps_cursor_tracking() {
        let state = BackendState::new();
        let surface = Arc::new(RecordingSurface::default());
        let doc = uri("a.py");
        let text = "0123456789 [a](b) tail\n";
        let rope = Rope::from_str(text);
        let links = crate::visibility::range_table(&rope, &crate::scanner::scan(text));
        state.install_controller(&doc, links, surface.clone());
        surface.take();

        state.config.write().trigger = crate::config::TriggerPolicy::Proximity;
        state.config.write().proximity_columns = 1;
        state.retune_controllers();
        assert_eq!(state.controllers.len(), 1);
        surface.take();

        state.selection_events.emit(&crate::events::SelectionEvent {
            uri: doc.clone(),
            position: Position::new(0, 12),
        });
        let calls = surface.take();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].2.is_empty());

        state.selection_events.emit(&crate::events::SelectionEvent {
            uri: doc.clone(),
            position: Position::new(0, 0),
        });
        let calls = surface.take();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].2.len(), 1);
    }

    #[test]
    fn language_filter_applies() {
        let state = BackendState::new();
        open(&state, &uri("a.py"), "", "python");
        open(&state, &uri("a.rs"), "", "rust");
        state.config.write().languages = vec!["python".into()];
        assert!(state.accepts(&uri("a.py")));
        assert!(!state.accepts(&uri("a.rs")));
        assert!(!state.accepts(&uri("missing.py")));
    }

    #[test]
    fn document_context_uses_root_and_path() {
        let state = BackendState::new();
        *state.workspace_root.write() = Some(PathBuf::from("/proj"));
        let ctx = state.document_context(&uri("src/a.py"));
        assert_eq!(ctx.workspace_root, Some(PathBuf::from("/proj")));
        assert!(ctx.root_relative);
        #[cfg(unix)]
        assert_eq!(ctx.document_dir, Some(PathBuf::from("/proj/src")));
    }
}
