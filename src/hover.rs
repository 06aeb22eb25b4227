use tower_lsp::lsp_types::*;

use crate::document_links;
use crate::link_resolve::ResolvedTarget;
use crate::scanner::Occurrence;
use crate::state::BackendState;
use crate::text;

/// Provide hover information at the given position.
///
/// Hovering anywhere on a comment link's markup shows a clickable link to
/// the resolved target and the path and line as written.
pub fn provide(state: &BackendState, uri: &Url, position: Position) -> Option<Hover> {
    if !state.accepts(uri) {
        return None;
    }
    let (rope, scanned) = document_links::scan_document(state, uri)?;
    let offset = text::offset_at(&rope, position);
    let (occurrence, ranges, target) = scanned.at_offset(offset)?;

    Some(Hover {
        contents: HoverContents::Markup(MarkupContent {
            kind: MarkupKind::Markdown,
            value: hover_markdown(occurrence, target),
        }),
        range: Some(ranges.raw),
    })
}

pub(crate) fn hover_markdown(occurrence: &Occurrence, target: &ResolvedTarget) -> String {
    let written = match occurrence.line_hint {
        Some(line) => format!("`{}` at line {}", occurrence.path_text, line),
        None => format!("`{}`", occurrence.path_text),
    };
    match target.url() {
        Some(url) => format!("[{}]({})\n\n{}", occurrence.description, url, written),
        None => format!("**{}**\n\n{} (unresolved)", occurrence.description, written),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::DocumentState;
    use ropey::Rope;

    fn state_with(uri: &Url, text: &str) -> BackendState {
        let state = BackendState::new();
        state
            .documents
            .insert(uri.clone(), DocumentState::new(Rope::from_str(text), "python".into()));
        state
    }

    fn markdown(hover: Hover) -> String {
        match hover.contents {
            HoverContents::Markup(markup) => markup.value,
            other => panic!("unexpected hover contents: {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn hover_over_description_describes_target() {
        let uri = Url::parse("file:///proj/src/a.py").unwrap();
        let state = state_with(&uri, "# see [utils](./helpers.py:42) for details");

        let hover = provide(&state, &uri, Position::new(0, 9)).unwrap();
        assert_eq!(hover.range, Some(Range::new(Position::new(0, 6), Position::new(0, 30))));
        let value = markdown(hover);
        assert!(value.contains("[utils](file:///proj/src/helpers.py#L42)"));
        assert!(value.contains("`./helpers.py` at line 42"));
    }

    #[test]
    fn hover_off_link_is_none() {
        let uri = Url::parse("file:///proj/src/a.py").unwrap();
        let state = state_with(&uri, "# see [utils](./helpers.py:42) for details");
        assert!(provide(&state, &uri, Position::new(0, 2)).is_none());
        assert!(provide(&state, &uri, Position::new(0, 31)).is_none());
    }

    #[test]
    fn unresolved_target_is_described() {
        let uri = Url::parse("untitled:Untitled-1").unwrap();
        let state = state_with(&uri, "[docs](notes.md)");
        let value = markdown(provide(&state, &uri, Position::new(0, 1)).unwrap());
        assert_eq!(value, "**docs**\n\n`notes.md` (unresolved)");
    }
}
