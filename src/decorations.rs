/// Decoration styles and the surface they are rendered onto.
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use tokio::sync::mpsc;
use tower_lsp::lsp_types::{Range, Url};
use tower_lsp::Client;
use tracing::debug;

use crate::config::Config;
use crate::error::RenderError;
use crate::protocol::{Decorations, DecorationsParams, StyleDefinition};
use crate::state::DocumentState;

pub(crate) const LINK_STYLE: &str = "commentLinks.link";
pub(crate) const HIDDEN_STYLE: &str = "commentLinks.hidden";

/// The two decoration treatments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum DecorationKind {
    /// Description text styled as a clickable link.
    Link,
    /// Markup around the description, rendered with no visual footprint.
    Hidden,
}

impl DecorationKind {
    pub fn style_name(self) -> &'static str {
        match self {
            DecorationKind::Link => LINK_STYLE,
            DecorationKind::Hidden => HIDDEN_STYLE,
        }
    }
}

pub(crate) struct DecorationStyles {
    pub link: StyleDefinition,
    pub hidden: StyleDefinition,
}

impl DecorationStyles {
    fn from_config(config: &Config) -> Self {
        Self {
            link: StyleDefinition {
                name: LINK_STYLE.to_string(),
                color: Some(config.link_color.clone()),
                text_decoration: Some("underline".to_string()),
                cursor: Some("pointer".to_string()),
                letter_spacing: None,
                opacity: None,
            },
            hidden: StyleDefinition {
                name: HIDDEN_STYLE.to_string(),
                color: None,
                text_decoration: Some("none; display: none;".to_string()),
                cursor: None,
                letter_spacing: Some("-1em".to_string()),
                opacity: Some("0".to_string()),
            },
        }
    }

    pub fn all(&self) -> Vec<StyleDefinition> {
        vec![self.link.clone(), self.hidden.clone()]
    }
}

static STYLES: OnceLock<DecorationStyles> = OnceLock::new();

/// Process-wide styles, built from the first config seen and never changed.
pub(crate) fn styles(config: &Config) -> &'static DecorationStyles {
    STYLES.get_or_init(|| DecorationStyles::from_config(config))
}

/// Where decorations end up.
pub(crate) trait RenderSurface: Send + Sync {
    /// Replace every range previously decorated with `kind` in `uri`.
    fn apply(&self, uri: &Url, kind: DecorationKind, ranges: Vec<Range>) -> Result<(), RenderError>;
}

/// Renders by queueing `commentLinks/decorations` notifications to the client.
pub(crate) struct ClientSurface {
    tx: mpsc::UnboundedSender<DecorationsParams>,
    documents: Arc<DashMap<Url, DocumentState>>,
}

impl ClientSurface {
    /// Spawn the forwarding task. Must be called inside the tokio runtime.
    pub fn spawn(client: Client, documents: Arc<DashMap<Url, DocumentState>>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<DecorationsParams>();
        tokio::spawn(async move {
            while let Some(params) = rx.recv().await {
                client.send_notification::<Decorations>(params).await;
            }
            debug!("decorations: forwarder stopped");
        });
        Self { tx, documents }
    }
}

impl RenderSurface for ClientSurface {
    fn apply(&self, uri: &Url, kind: DecorationKind, ranges: Vec<Range>) -> Result<(), RenderError> {
        if !self.documents.contains_key(uri) {
            return Err(RenderError::DocumentClosed(uri.to_string()));
        }
        self.tx
            .send(DecorationsParams {
                uri: uri.clone(),
                style: kind.style_name().to_string(),
                ranges,
            })
            .map_err(|_| RenderError::TransportClosed)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use parking_lot::Mutex;

    /// Records every application; can be told to fail.
    #[derive(Default)]
    pub(crate) struct RecordingSurface {
        pub calls: Mutex<Vec<(Url, DecorationKind, Vec<Range>)>>,
        pub fail: std::sync::atomic::AtomicBool,
    }

    impl RecordingSurface {
        pub fn take(&self) -> Vec<(Url, DecorationKind, Vec<Range>)> {
            std::mem::take(&mut *self.calls.lock())
        }

        pub fn set_failing(&self, fail: bool) {
            self.fail.store(fail, std::sync::atomic::Ordering::SeqCst);
        }
    }

    impl RenderSurface for RecordingSurface {
        fn apply(&self, uri: &Url, kind: DecorationKind, ranges: Vec<Range>) -> Result<(), RenderError> {
            if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
                return Err(RenderError::DocumentClosed(uri.to_string()));
            }
            self.calls.lock().push((uri.clone(), kind, ranges));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn styles_are_created_once() {
        let first = styles(&Config::default());
        let mut other = Config::default();
        other.link_color = "#000000".into();
        let second = styles(&other);
        assert!(std::ptr::eq(first, second));
        assert_eq!(first.link.name, LINK_STYLE);
        assert_eq!(first.hidden.name, HIDDEN_STYLE);
        assert_eq!(first.all().len(), 2);
    }

    #[test]
    fn style_names() {
        assert_eq!(DecorationKind::Link.style_name(), "commentLinks.link");
        assert_eq!(DecorationKind::Hidden.style_name(), "commentLinks.hidden");
    }
}
