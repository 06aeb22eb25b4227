use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::Client;
use tracing::{info, warn};

use crate::error::NavigationError;
use crate::link_resolve::{self, DocumentContext, ResolvedTarget};
use crate::protocol::{OpenLinkArgs, OPEN_LINK_COMMAND};
use crate::state::BackendState;

/// Execute a custom workspace command.
pub async fn execute(
    client: &Client,
    state: &BackendState,
    params: &ExecuteCommandParams,
) -> Result<Option<serde_json::Value>> {
    let args: &[serde_json::Value] = &params.arguments;
    match params.command.as_str() {
        OPEN_LINK_COMMAND => open_link(client, state, args).await,
        _ => {
            client
                .log_message(
                    MessageType::WARNING,
                    format!("Unknown command: {}", params.command),
                )
                .await;
            Ok(None)
        }
    }
}

/// Open a link target: `{ "path": ..., "line"?: N }`.
///
/// Relative and root-relative paths resolve against the workspace root.
async fn open_link(
    client: &Client,
    state: &BackendState,
    args: &[serde_json::Value],
) -> Result<Option<serde_json::Value>> {
    let Some(link) = parse_args(args) else {
        client
            .log_message(MessageType::ERROR, "openLink: expected { path, line? }")
            .await;
        return Ok(None);
    };

    let ctx = command_context(state);
    let target = link_resolve::resolve(&link.path, link.line, &ctx);
    let opened = match navigate(client, &target).await {
        Ok(()) => true,
        Err(e) => {
            report_failure(client, &e).await;
            false
        }
    };
    Ok(Some(serde_json::json!({ "opened": opened })))
}

fn parse_args(args: &[serde_json::Value]) -> Option<OpenLinkArgs> {
    serde_json::from_value(args.first()?.clone()).ok()
}

/// Commands carry no document, so relative paths fall back to the workspace root.
fn command_context(state: &BackendState) -> DocumentContext {
    let root = state.workspace_root.read().clone();
    DocumentContext {
        document_dir: root.clone(),
        workspace_root: root,
        root_relative: state.config.read().root_relative_paths,
    }
}

/// Check that a resolved target can be opened, returning its file URI.
pub(crate) fn check_target(target: &ResolvedTarget) -> std::result::Result<Url, NavigationError> {
    if !target.is_resolved() {
        return Err(NavigationError::Unresolved(
            target.path.to_string_lossy().to_string(),
        ));
    }
    if !target.path.exists() {
        return Err(NavigationError::TargetNotFound(target.path.clone()));
    }
    Url::from_file_path(&target.path).map_err(|_| NavigationError::TargetNotFound(target.path.clone()))
}

/// Open the target in the editor and put the cursor on its anchor line.
pub(crate) async fn navigate(
    client: &Client,
    target: &ResolvedTarget,
) -> std::result::Result<(), NavigationError> {
    let uri = check_target(target)?;
    let response = client
        .show_document(ShowDocumentParams {
            uri,
            external: Some(false),
            take_focus: Some(true),
            selection: Some(target.selection()),
        })
        .await;
    match response {
        Ok(true) => {
            info!(path = %target.path.display(), line = ?target.line, "commands: opened link target");
            Ok(())
        }
        Ok(false) => Err(NavigationError::Rejected(target.path.clone())),
        Err(e) => Err(NavigationError::Client(e.to_string())),
    }
}

pub(crate) async fn report_failure(client: &Client, error: &NavigationError) {
    warn!(error = %error, "commands: navigation failed");
    client
        .show_message(MessageType::ERROR, format!("Failed to open link: {}", error))
        .await;
}
