/// Custom LSP messages exchanged with the editor extension.
use serde::{Deserialize, Serialize};
use tower_lsp::lsp_types::notification::Notification;
use tower_lsp::lsp_types::{Position, Range, TextDocumentIdentifier, Url};

pub(crate) const SELECTION_CHANGED: &str = "commentLinks/selectionChanged";
pub(crate) const ACTIVE_DOCUMENT_CHANGED: &str = "commentLinks/activeDocumentChanged";
pub(crate) const OPEN_LINK_COMMAND: &str = "commentLinks.openLink";

/// Client → server: the primary cursor moved.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SelectionChangedParams {
    pub text_document: TextDocumentIdentifier,
    pub position: Position,
}

/// Client → server: the focused editor changed.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ActiveDocumentChangedParams {
    #[serde(default)]
    pub uri: Option<Url>,
}

/// A named decoration style the client should create once.
///
/// `Deserialize` is required by the `Notification::Params` bound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StyleDefinition {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_decoration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub letter_spacing: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct RegisterStylesParams {
    pub styles: Vec<StyleDefinition>,
}

/// Server → client: announce the decoration styles.
pub(crate) enum RegisterStyles {}

impl Notification for RegisterStyles {
    type Params = RegisterStylesParams;
    const METHOD: &'static str = "commentLinks/registerStyles";
}

/// Apply `style` to exactly `ranges` in `uri`, replacing its previous ranges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct DecorationsParams {
    pub uri: Url,
    pub style: String,
    pub ranges: Vec<Range>,
}

/// Server → client: decoration update.
pub(crate) enum Decorations {}

impl Notification for Decorations {
    type Params = DecorationsParams;
    const METHOD: &'static str = "commentLinks/decorations";
}

/// Argument of the `commentLinks.openLink` command.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub(crate) struct OpenLinkArgs {
    pub path: String,
    #[serde(default)]
    pub line: Option<u32>,
}
