use std::sync::Arc;

use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};
use tracing::{debug, info};

use crate::config::{self, Config};
use crate::decorations::{self, ClientSurface, RenderSurface};
use crate::events::{ActiveDocumentEvent, SelectionEvent};
use crate::protocol::{
    ActiveDocumentChangedParams, RegisterStyles, RegisterStylesParams, SelectionChangedParams,
    OPEN_LINK_COMMAND,
};
use crate::state::{BackendState, DocumentState};
use crate::{document_links, text};

pub struct CommentLinkerServer {
    client: Client,
    state: BackendState,
    surface: Arc<dyn RenderSurface>,
}

impl CommentLinkerServer {
    pub fn new(client: Client) -> Self {
        let state = BackendState::new();
        let surface = Arc::new(ClientSurface::spawn(client.clone(), state.documents.clone()));
        Self {
            client,
            state,
            surface,
        }
    }

    /// `commentLinks/selectionChanged`: feed the cursor to the controllers.
    pub async fn selection_changed(&self, params: SelectionChangedParams) {
        let uri = params.text_document.uri;
        self.state.cursors.insert(uri.clone(), params.position);
        self.state.selection_events.emit(&SelectionEvent {
            uri,
            position: params.position,
        });
    }

    /// `commentLinks/activeDocumentChanged`: retire controllers of other documents.
    pub async fn active_document_changed(&self, params: ActiveDocumentChangedParams) {
        debug!(uri = ?params.uri, "server: active document changed");
        self.state
            .active_document_events
            .emit(&ActiveDocumentEvent { uri: params.uri });
        self.state.prune_controllers();
    }

    /// Rescan after an edit and hand the new table to a live controller.
    fn rescan(&self, uri: &Url) {
        if !self.state.controllers.contains_key(uri) {
            return;
        }
        if let Some((_, scanned)) = document_links::scan_document(&self.state, uri) {
            self.state.refresh_controller(uri, scanned.ranges);
        }
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for CommentLinkerServer {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        // Workspace root from the first workspace folder
        let root = params
            .workspace_folders
            .as_ref()
            .and_then(|folders| folders.first())
            .and_then(|folder| folder.uri.to_file_path().ok())
            .or_else(|| params.root_uri.as_ref().and_then(|u| u.to_file_path().ok()));
        *self.state.workspace_root.write() = root.clone();

        let layers = config::base_layers(root.as_deref(), params.initialization_options.as_ref());
        *self.state.config.write() = Config::from_layers(&layers);
        *self.state.config_layers.write() = layers;

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::INCREMENTAL,
                )),
                document_link_provider: Some(DocumentLinkOptions {
                    resolve_provider: Some(false),
                    work_done_progress_options: Default::default(),
                }),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                definition_provider: Some(OneOf::Left(true)),
                execute_command_provider: Some(ExecuteCommandOptions {
                    commands: vec![OPEN_LINK_COMMAND.into()],
                    ..Default::default()
                }),
                ..Default::default()
            },
            ..Default::default()
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        let styles = decorations::styles(&self.state.config.read()).all();
        self.client
            .send_notification::<RegisterStyles>(RegisterStylesParams { styles })
            .await;
        self.client
            .log_message(MessageType::INFO, "comment linker LSP initialized")
            .await;
        info!(root = ?self.state.workspace_root.read().as_ref(), "server: initialized");
    }

    async fn shutdown(&self) -> Result<()> {
        self.state.controllers.clear();
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let doc = params.text_document;
        self.state.documents.insert(
            doc.uri,
            DocumentState::new(ropey::Rope::from_str(&doc.text), doc.language_id),
        );
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        // The guard must be gone before rescanning renders through the surface.
        if let Some(mut doc) = self.state.documents.get_mut(&uri) {
            for change in params.content_changes {
                text::apply_change(&mut doc.rope, change);
            }
        }
        self.rescan(&uri);
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        self.state.remove_controller(&uri);
        self.state.documents.remove(&uri);
        self.state.cursors.remove(&uri);
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        let config = Config::with_settings(&self.state.config_layers.read(), &params.settings);
        *self.state.config.write() = config;
        self.state.retune_controllers();
    }

    async fn document_link(&self, params: DocumentLinkParams) -> Result<Option<Vec<DocumentLink>>> {
        let uri = &params.text_document.uri;
        Ok(document_links::provide(&self.state, self.surface.clone(), uri))
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        let uri = &params.text_document_position_params.text_document.uri;
        let pos = params.text_document_position_params.position;
        Ok(crate::hover::provide(&self.state, uri, pos))
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        let uri = &params.text_document_position_params.text_document.uri;
        let pos = params.text_document_position_params.position;
        Ok(crate::goto::definition(&self.client, &self.state, uri, pos).await)
    }

    async fn execute_command(&self, params: ExecuteCommandParams) -> Result<Option<serde_json::Value>> {
        crate::commands::execute(&self.client, &self.state, &params).await
    }
}
