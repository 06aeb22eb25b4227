/// Per-document visibility controller.
///
/// Every occurrence is either collapsed (description styled as a link, the
/// surrounding markup hidden) or expanded (full markup shown, unstyled). The
/// split is re-derived from scratch on every cursor event and pushed to the
/// render surface as two decoration sets, each replacing its predecessor.
use std::sync::Arc;

use parking_lot::Mutex;
use ropey::Rope;
use tower_lsp::lsp_types::{Position, Range, Url};
use tracing::{debug, warn};

use crate::config::{Config, TriggerPolicy};
use crate::decorations::{DecorationKind, RenderSurface};
use crate::events::{ActiveDocumentEvent, EventHub, SelectionEvent, Subscription};
use crate::scanner::Occurrence;
use crate::text;

/// LSP ranges of one occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LinkRanges {
    pub raw: Range,
    pub description: Range,
    /// The opening `[`.
    pub leading: Range,
    /// Everything from `]` to the closing `)`.
    pub trailing: Range,
}

impl LinkRanges {
    pub fn new(rope: &Rope, occurrence: &Occurrence) -> Self {
        let raw = text::range_of(rope, &occurrence.raw_span);
        let description = text::range_of(rope, &occurrence.description_span);
        Self {
            raw,
            description,
            leading: Range::new(raw.start, description.start),
            trailing: Range::new(description.end, raw.end),
        }
    }
}

pub(crate) fn range_table(rope: &Rope, occurrences: &[Occurrence]) -> Vec<LinkRanges> {
    occurrences.iter().map(|o| LinkRanges::new(rope, o)).collect()
}

/// Which cursor positions expand a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TriggerZone {
    pub policy: TriggerPolicy,
    pub columns: u32,
}

impl TriggerZone {
    pub fn from_config(config: &Config) -> Self {
        Self {
            policy: config.trigger,
            columns: config.proximity_columns,
        }
    }

    pub fn contains(&self, link: &LinkRanges, cursor: Position) -> bool {
        let start = link.raw.start;
        let end = link.raw.end;
        match self.policy {
            TriggerPolicy::Line => cursor.line >= start.line && cursor.line <= end.line,
            TriggerPolicy::Proximity => {
                if cursor.line != start.line {
                    return false;
                }
                let last_col = if end.line == start.line {
                    end.character
                } else {
                    u32::MAX
                };
                cursor.character.saturating_add(self.columns) >= start.character
                    && cursor.character <= last_col.saturating_add(self.columns)
            }
        }
    }
}

/// Indices of the expanded occurrences, ascending. Everything else is collapsed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct VisibilityState {
    pub expanded: Vec<usize>,
}

impl VisibilityState {
    pub fn compute(links: &[LinkRanges], cursor: Option<Position>, zone: TriggerZone) -> Self {
        let Some(cursor) = cursor else {
            return Self::default();
        };
        let expanded = links
            .iter()
            .enumerate()
            .filter(|(_, link)| zone.contains(link, cursor))
            .map(|(idx, _)| idx)
            .collect();
        Self { expanded }
    }

    pub fn is_expanded(&self, idx: usize) -> bool {
        self.expanded.binary_search(&idx).is_ok()
    }
}

/// The two disjoint range sets a render applies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct DecorationSets {
    pub links: Vec<Range>,
    pub hidden: Vec<Range>,
}

pub(crate) fn decoration_sets(links: &[LinkRanges], state: &VisibilityState) -> DecorationSets {
    let mut sets = DecorationSets::default();
    for (idx, link) in links.iter().enumerate() {
        if state.is_expanded(idx) {
            continue;
        }
        sets.links.push(link.description);
        sets.hidden.push(link.leading);
        sets.hidden.push(link.trailing);
    }
    sets
}

struct Core {
    uri: Url,
    links: Vec<LinkRanges>,
    zone: TriggerZone,
    cursor: Option<Position>,
    state: VisibilityState,
    surface: Arc<dyn RenderSurface>,
    subscriptions: Vec<Subscription>,
    disposed: bool,
}

impl Core {
    fn render(&mut self) {
        self.state = VisibilityState::compute(&self.links, self.cursor, self.zone);
        let sets = decoration_sets(&self.links, &self.state);
        for (kind, ranges) in [
            (DecorationKind::Link, sets.links),
            (DecorationKind::Hidden, sets.hidden),
        ] {
            if let Err(e) = self.surface.apply(&self.uri, kind, ranges) {
                warn!(uri = %self.uri, error = %e, "visibility: render failed, skipping cycle");
                return;
            }
        }
    }

    fn on_selection(&mut self, event: &SelectionEvent) {
        if self.disposed || event.uri != self.uri {
            return;
        }
        self.cursor = Some(event.position);
        self.render();
    }

    /// Mark disposed and hand back the subscriptions so they can be released
    /// outside the lock.
    fn retire(&mut self) -> Option<Vec<Subscription>> {
        if self.disposed {
            return None;
        }
        self.disposed = true;
        Some(std::mem::take(&mut self.subscriptions))
    }
}

fn release(subscriptions: Vec<Subscription>) {
    for mut sub in subscriptions {
        sub.dispose();
    }
}

/// Owns the visibility state of one document while it is active.
pub(crate) struct VisibilityController {
    core: Arc<Mutex<Core>>,
}

impl VisibilityController {
    /// Build the controller, render once, and subscribe to both feeds.
    ///
    /// `cursor` seeds the first render; with no cursor every link starts collapsed.
    pub fn attach(
        uri: Url,
        links: Vec<LinkRanges>,
        zone: TriggerZone,
        cursor: Option<Position>,
        surface: Arc<dyn RenderSurface>,
        selection_events: &EventHub<SelectionEvent>,
        active_document_events: &EventHub<ActiveDocumentEvent>,
    ) -> Self {
        let core = Arc::new(Mutex::new(Core {
            uri: uri.clone(),
            links,
            zone,
            cursor,
            state: VisibilityState::default(),
            surface,
            subscriptions: Vec::new(),
            disposed: false,
        }));

        let weak = Arc::downgrade(&core);
        let selection = selection_events.subscribe(move |event: &SelectionEvent| {
            if let Some(core) = weak.upgrade() {
                core.lock().on_selection(event);
            }
        });

        let weak = Arc::downgrade(&core);
        let active = active_document_events.subscribe(move |event: &ActiveDocumentEvent| {
            let Some(core) = weak.upgrade() else {
                return;
            };
            let retired = {
                let mut guard = core.lock();
                if event.uri.as_ref() == Some(&guard.uri) {
                    return;
                }
                guard.retire()
            };
            if let Some(subscriptions) = retired {
                debug!(uri = ?event.uri, "visibility: active document changed, disposing");
                release(subscriptions);
            }
        });

        {
            let mut guard = core.lock();
            guard.subscriptions = vec![selection, active];
            guard.render();
            debug!(
                uri = %uri,
                links = guard.links.len(),
                selection_handlers = selection_events.len(),
                "visibility: controller attached"
            );
        }

        Self { core }
    }

    /// Replace the link table wholesale (after an edit) and re-render.
    pub fn refresh(&self, links: Vec<LinkRanges>) {
        let mut core = self.core.lock();
        if core.disposed {
            return;
        }
        core.links = links;
        core.render();
    }

    /// Switch the trigger zone (after a settings change) and re-render.
    pub fn set_zone(&self, zone: TriggerZone) {
        let mut core = self.core.lock();
        if core.disposed || core.zone == zone {
            return;
        }
        core.zone = zone;
        core.render();
    }

    /// Release all subscriptions. Returns `false` if already disposed.
    pub fn dispose(&self) -> bool {
        let retired = self.core.lock().retire();
        match retired {
            Some(subscriptions) => {
                release(subscriptions);
                true
            }
            None => false,
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.core.lock().disposed
    }

    pub fn state(&self) -> VisibilityState {
        self.core.lock().state.clone()
    }
}

impl Drop for VisibilityController {
    fn drop(&mut self) {
        self.dispose();
    }
}
