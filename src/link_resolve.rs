/// Resolve comment link paths to absolute target paths.
///
/// Resolution is purely lexical: nothing here touches the filesystem, and a
/// target that does not exist is only noticed when someone navigates to it.
use std::path::{Component, Path, PathBuf};

use tower_lsp::lsp_types::{Position, Range, Url};
use tracing::debug;

/// Where a document lives, as far as link resolution is concerned.
#[derive(Debug, Clone, Default)]
pub(crate) struct DocumentContext {
    /// Directory holding the document, if it is a file.
    pub document_dir: Option<PathBuf>,
    /// Root of the enclosing workspace, if known.
    pub workspace_root: Option<PathBuf>,
    /// Treat leading-separator paths as workspace-root-relative.
    pub root_relative: bool,
}

impl DocumentContext {
    pub fn new(uri: &Url, workspace_root: Option<PathBuf>, root_relative: bool) -> Self {
        Self {
            document_dir: uri
                .to_file_path()
                .ok()
                .and_then(|p| p.parent().map(Path::to_path_buf)),
            workspace_root,
            root_relative,
        }
    }
}

/// How a target path was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Resolution {
    Absolute,
    WorkspaceRoot,
    DocumentRelative,
    /// No base was available; `path` is the raw text.
    Unresolved,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ResolvedTarget {
    pub path: PathBuf,
    /// 1-based line anchor from the `:N` suffix.
    pub line: Option<u32>,
    pub resolution: Resolution,
}

impl ResolvedTarget {
    pub fn is_resolved(&self) -> bool {
        self.resolution != Resolution::Unresolved
    }

    /// File URI for the target, with an `L<n>` fragment when anchored.
    pub fn url(&self) -> Option<Url> {
        if !self.is_resolved() {
            return None;
        }
        let mut url = Url::from_file_path(&self.path).ok()?;
        if let Some(line) = self.line {
            url.set_fragment(Some(&format!("L{}", line)));
        }
        Some(url)
    }

    /// Zero-width range at the start of the anchor line (first line when unanchored).
    pub fn selection(&self) -> Range {
        let line = self.line.unwrap_or(1).saturating_sub(1);
        Range::new(Position::new(line, 0), Position::new(line, 0))
    }
}

/// Resolve a raw link path against the document context.
///
/// - Leading-separator paths are joined to the workspace root (or left
///   unresolved when no root is known).
/// - Absolute paths are returned unchanged.
/// - Anything else is joined to the directory holding the document.
pub(crate) fn resolve(path_text: &str, line: Option<u32>, ctx: &DocumentContext) -> ResolvedTarget {
    let (path, resolution) = if is_root_relative(path_text, ctx) {
        match &ctx.workspace_root {
            Some(root) => (
                normalize_lexically(&root.join(path_text.trim_start_matches(['/', '\\']))),
                Resolution::WorkspaceRoot,
            ),
            None => (PathBuf::from(path_text), Resolution::Unresolved),
        }
    } else if Path::new(path_text).is_absolute() {
        (PathBuf::from(path_text), Resolution::Absolute)
    } else {
        match ctx.document_dir.as_deref() {
            Some(dir) => (normalize_lexically(&dir.join(path_text)), Resolution::DocumentRelative),
            None => (PathBuf::from(path_text), Resolution::Unresolved),
        }
    };

    debug!(
        raw = %path_text,
        resolved = %path.display(),
        ?resolution,
        "link_resolve: resolved comment link"
    );

    ResolvedTarget {
        path,
        line,
        resolution,
    }
}

/// Whether a leading-separator path should be read relative to the workspace root.
///
/// On Unix such a path is also absolute; it is only taken as root-relative
/// when a root is known and the path does not already point inside it.
fn is_root_relative(path_text: &str, ctx: &DocumentContext) -> bool {
    if !path_text.starts_with(['/', '\\']) {
        return false;
    }
    let raw = Path::new(path_text);
    if !raw.is_absolute() {
        return true;
    }
    ctx.root_relative
        && ctx
            .workspace_root
            .as_deref()
            .is_some_and(|root| !raw.starts_with(root))
}

/// Collapse `.` and `..` components without consulting the filesystem.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn ctx(doc: Option<&str>, root: Option<&str>) -> DocumentContext {
        DocumentContext {
            document_dir: doc.and_then(|d| Path::new(d).parent().map(Path::to_path_buf)),
            workspace_root: root.map(PathBuf::from),
            root_relative: true,
        }
    }

    #[test]
    fn absolute_path_is_unchanged() {
        let target = resolve("/proj/lib/x.py", None, &ctx(Some("/proj/a/doc.py"), Some("/proj")));
        assert_eq!(target.path, PathBuf::from("/proj/lib/x.py"));
        assert_eq!(target.resolution, Resolution::Absolute);
    }

    #[test]
    fn absolute_path_without_root_is_unchanged() {
        let target = resolve("/x/./y", None, &ctx(Some("/proj/a/doc.py"), None));
        assert_eq!(target.path, PathBuf::from("/x/./y"));
        assert_eq!(target.resolution, Resolution::Absolute);
    }

    #[test]
    fn root_relative_joins_workspace_root() {
        let target = resolve("/x/y", None, &ctx(Some("/proj/a/doc.py"), Some("/proj")));
        assert_eq!(target.path, PathBuf::from("/proj/x/y"));
        assert_eq!(target.resolution, Resolution::WorkspaceRoot);
    }

    #[test]
    fn root_relative_disabled_keeps_absolute() {
        let mut context = ctx(Some("/proj/a/doc.py"), Some("/proj"));
        context.root_relative = false;
        let target = resolve("/x/y", None, &context);
        assert_eq!(target.path, PathBuf::from("/x/y"));
        assert_eq!(target.resolution, Resolution::Absolute);
    }

    #[test]
    fn relative_joins_document_dir() {
        let target = resolve("z", None, &ctx(Some("/proj/a/doc.py"), Some("/proj")));
        assert_eq!(target.path, PathBuf::from("/proj/a/z"));
        assert_eq!(target.resolution, Resolution::DocumentRelative);
    }

    #[test]
    fn relative_dot_segments_are_collapsed() {
        let c = ctx(Some("/proj/src/a.py"), Some("/proj"));
        assert_eq!(resolve("./helpers.py", None, &c).path, PathBuf::from("/proj/src/helpers.py"));
        assert_eq!(resolve("../lib/b.py", None, &c).path, PathBuf::from("/proj/lib/b.py"));
    }

    #[test]
    fn relative_without_document_path_is_unresolved() {
        let target = resolve("z.py", Some(3), &ctx(None, Some("/proj")));
        assert_eq!(target.path, PathBuf::from("z.py"));
        assert!(!target.is_resolved());
        assert!(target.url().is_none());
    }

    #[test]
    fn line_anchor_is_metadata() {
        let target = resolve("./helpers.py", Some(42), &ctx(Some("/proj/src/a.py"), None));
        assert_eq!(target.path, PathBuf::from("/proj/src/helpers.py"));
        assert_eq!(target.line, Some(42));
        assert_eq!(target.selection().start, Position::new(41, 0));
        let url = target.url().expect("file url");
        assert_eq!(url.fragment(), Some("L42"));
        assert_eq!(url.path(), "/proj/src/helpers.py");
    }

    #[test]
    fn line_zero_selects_first_line() {
        let target = resolve("b.py", Some(0), &ctx(Some("/proj/a.py"), None));
        assert_eq!(target.selection().start, Position::new(0, 0));
    }
}
