/// DocumentLink provider. Scans a document for comment links, resolves
/// their targets and (re)attaches the document's visibility controller.
use std::sync::Arc;

use ropey::Rope;
use tower_lsp::lsp_types::*;
use tracing::debug;

use crate::decorations::RenderSurface;
use crate::link_resolve::{self, ResolvedTarget};
use crate::scanner::{self, Occurrence};
use crate::state::BackendState;
use crate::visibility::{self, LinkRanges};

/// One scan cycle over a document: occurrences with their ranges and targets.
pub(crate) struct ScannedLinks {
    pub occurrences: Vec<Occurrence>,
    pub ranges: Vec<LinkRanges>,
    pub targets: Vec<ResolvedTarget>,
}

impl ScannedLinks {
    pub fn iter(&self) -> impl Iterator<Item = (&Occurrence, &LinkRanges, &ResolvedTarget)> {
        self.occurrences
            .iter()
            .zip(self.ranges.iter())
            .zip(self.targets.iter())
            .map(|((o, r), t)| (o, r, t))
    }

    /// The link whose markup covers the char `offset`.
    pub fn at_offset(&self, offset: usize) -> Option<(&Occurrence, &LinkRanges, &ResolvedTarget)> {
        self.iter().find(|(o, _, _)| o.contains(offset))
    }
}

/// Scan and resolve every link in `uri`. `None` if the document is not open.
pub(crate) fn scan_document(state: &BackendState, uri: &Url) -> Option<(Rope, ScannedLinks)> {
    let rope = state.rope(uri)?;
    let text = rope.to_string();
    let ctx = state.document_context(uri);

    let occurrences = scanner::scan(&text);
    let ranges = visibility::range_table(&rope, &occurrences);
    let targets = occurrences
        .iter()
        .map(|o| link_resolve::resolve(&o.path_text, o.line_hint, &ctx))
        .collect();

    Some((
        rope,
        ScannedLinks {
            occurrences,
            ranges,
            targets,
        },
    ))
}

/// Build the `textDocument/documentLink` response for a document.
pub(crate) fn provide(
    state: &BackendState,
    surface: Arc<dyn RenderSurface>,
    uri: &Url,
) -> Option<Vec<DocumentLink>> {
    if !state.accepts(uri) {
        return Some(Vec::new());
    }
    let (_, scanned) = scan_document(state, uri)?;

    let mut result = Vec::new();
    for (occurrence, ranges, target) in scanned.iter() {
        let Some(target_url) = target.url() else {
            debug!(
                uri = %uri,
                path = %occurrence.path_text,
                "document_links: leaving link unresolved"
            );
            continue;
        };
        result.push(DocumentLink {
            range: ranges.description,
            target: Some(target_url),
            tooltip: Some(tooltip(target)),
            data: Some(serde_json::json!({
                "path": target.path.to_string_lossy(),
                "line": target.line,
            })),
        });
    }

    state.install_controller(uri, scanned.ranges, surface);
    Some(result)
}

fn tooltip(target: &ResolvedTarget) -> String {
    match target.line {
        Some(line) => format!("Open {} at line {}", target.path.display(), line),
        None => format!("Open {}", target.path.display()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decorations::testing::RecordingSurface;
    use crate::state::DocumentState;
    use std::path::PathBuf;

    fn open(state: &BackendState, uri: &Url, text: &str) {
        state
            .documents
            .insert(uri.clone(), DocumentState::new(Rope::from_str(text), "python".into()));
    }

    #[cfg(unix)]
    #[test]
    fn end_to_end_single_link() {
        let state = BackendState::new();
        let surface = Arc::new(RecordingSurface::default());
        let uri = Url::parse("file:///proj/src/a.py").unwrap();
        open(&state, &uri, "# see [utils](./helpers.py:42) for details");

        let links = provide(&state, surface.clone(), &uri).unwrap();
        assert_eq!(links.len(), 1);
        let link = &links[0];
        assert_eq!(link.range, Range::new(Position::new(0, 7), Position::new(0, 12)));
        let target = link.target.as_ref().unwrap();
        assert_eq!(target.path(), "/proj/src/helpers.py");
        assert_eq!(target.fragment(), Some("L42"));
        assert_eq!(link.data.as_ref().unwrap()["line"], 42);

        assert!(state.controllers.contains_key(&uri));
        assert_eq!(surface.take().len(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn links_without_a_base_are_omitted() {
        let state = BackendState::new();
        let surface = Arc::new(RecordingSurface::default());
        let uri = Url::parse("untitled:Untitled-1").unwrap();
        open(&state, &uri, "[a](b.py) [c](/proj/d.py)");

        let links = provide(&state, surface, &uri).unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].target.as_ref().unwrap().path(), "/proj/d.py");
    }

    #[test]
    fn filtered_language_yields_no_links() {
        let state = BackendState::new();
        let surface = Arc::new(RecordingSurface::default());
        let uri = Url::parse("file:///proj/a.py").unwrap();
        open(&state, &uri, "[a](b.py)");
        state.config.write().languages = vec!["rust".into()];

        assert!(provide(&state, surface, &uri).unwrap().is_empty());
        assert!(state.controllers.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn scan_document_pairs_targets_with_occurrences() {
        let state = BackendState::new();
        *state.workspace_root.write() = Some(PathBuf::from("/proj"));
        let uri = Url::parse("file:///proj/src/a.py").unwrap();
        open(&state, &uri, "[x](/lib/x.py:3)\n[y](y.py)");

        let (_, scanned) = scan_document(&state, &uri).unwrap();
        let targets: Vec<_> = scanned.iter().map(|(_, _, t)| t.path.clone()).collect();
        assert_eq!(
            targets,
            vec![PathBuf::from("/proj/lib/x.py"), PathBuf::from("/proj/src/y.py")]
        );
        assert!(scanned.at_offset(0).is_some());
        assert!(scanned.at_offset(16).is_none());
    }
}
