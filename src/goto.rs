use tower_lsp::lsp_types::*;
use tower_lsp::Client;

use crate::commands;
use crate::document_links;
use crate::state::BackendState;
use crate::text;

/// Provide go-to-definition for a position inside a comment link.
///
/// Jumps to the link target at its line anchor. A target that does not
/// exist is reported to the user instead.
pub async fn definition(
    client: &Client,
    state: &BackendState,
    uri: &Url,
    position: Position,
) -> Option<GotoDefinitionResponse> {
    if !state.accepts(uri) {
        return None;
    }
    let (rope, scanned) = document_links::scan_document(state, uri)?;
    let offset = text::offset_at(&rope, position);
    let (_, _, target) = scanned.at_offset(offset)?;

    match commands::check_target(target) {
        Ok(target_uri) => Some(GotoDefinitionResponse::Scalar(Location::new(
            target_uri,
            target.selection(),
        ))),
        Err(e) => {
            commands::report_failure(client, &e).await;
            None
        }
    }
}
