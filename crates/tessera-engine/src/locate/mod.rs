//! # Block Locator
//!
//! Maps a pointer position over the rendered document to the block it points
//! at.
//!
//! - **`layout`**: the `VisualTree` trait the locator reads and `LayoutTree`
//! - **`stacked`**: `StackedLayout`, a one-line-per-block layout of a document

pub mod layout;
pub mod stacked;

use std::cmp::Ordering;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use layout::{ElementId, ElementRole, LayoutTree, Point, Rect, VisualElement, VisualTree};
pub use stacked::StackedLayout;

use crate::blocks::BlockTypeRegistry;
use crate::editing::Document;
use crate::models::Node;
use crate::page::PageContainerModel;

/// Tunables of [`BlockLocator`], in pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    /// The hovered block is reused while its center is this close to the pointer.
    pub hover_threshold: f32,
    /// Candidates whose distances differ by at most this are ranked by depth.
    pub tie_band: f32,
    /// Vertical offsets sampled around the pointer, in order.
    pub sample_offsets: Vec<f32>,
    /// Horizontal offset tried when nothing is found under the pointer itself.
    pub lateral_offset: f32,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            hover_threshold: 180.0,
            tie_band: 8.0,
            sample_offsets: vec![0.0, -2.0, 2.0, -4.0, 4.0],
            lateral_offset: 24.0,
        }
    }
}

/// The block a pointer position resolved to.
#[derive(Debug, Clone, PartialEq)]
pub struct Located<'a> {
    pub address: usize,
    pub node: &'a Node,
    pub depth: usize,
}

#[derive(Debug, Clone)]
struct Candidate<'a> {
    located: Located<'a>,
    distance: f32,
    is_container: bool,
}

pub struct BlockLocator {
    registry: Arc<BlockTypeRegistry>,
    config: LocatorConfig,
    hovered: Option<ElementId>,
}

impl BlockLocator {
    pub fn new(registry: Arc<BlockTypeRegistry>) -> Self {
        Self::with_config(registry, LocatorConfig::default())
    }

    pub fn with_config(registry: Arc<BlockTypeRegistry>, config: LocatorConfig) -> Self {
        Self {
            registry,
            config,
            hovered: None,
        }
    }

    pub fn config(&self) -> &LocatorConfig {
        &self.config
    }

    /// Records the element most recently under the pointer.
    pub fn track_hover(&mut self, element: Option<ElementId>) {
        self.hovered = element;
    }

    /// The block at `point`, or `None` when nothing resolves.
    ///
    /// Deterministic for a fixed document, layout and point.
    pub fn locate<'d>(
        &self,
        doc: &'d Document,
        tree: &dyn VisualTree,
        point: Point,
    ) -> Option<Located<'d>> {
        if let Some(hit) = self.hovered_block(doc, tree, point) {
            return Some(hit);
        }

        for &dy in &self.config.sample_offsets {
            for dx in [0.0, self.config.lateral_offset] {
                let sample = point.offset(dx, dy);
                let candidates = tree
                    .elements_at(sample)
                    .into_iter()
                    .filter_map(|id| self.candidate(doc, tree, id, point));
                if let Some(best) = self.best(candidates) {
                    return Some(best.located);
                }
            }
        }

        let fallback = tree
            .leaves()
            .into_iter()
            .filter_map(|id| self.candidate(doc, tree, id, point));
        let best = self.best(fallback).map(|candidate| candidate.located);
        if best.is_none() {
            log::debug!("no block at ({}, {})", point.x, point.y);
        }
        best
    }

    fn hovered_block<'d>(
        &self,
        doc: &'d Document,
        tree: &dyn VisualTree,
        point: Point,
    ) -> Option<Located<'d>> {
        let hovered = self.hovered?;
        let candidate = self.candidate(doc, tree, hovered, point)?;
        let rect = tree.block_rect(candidate.located.address)?;
        (rect.center().distance(point) <= self.config.hover_threshold).then_some(candidate.located)
    }

    /// Resolves an element to the block its nearest content-bearing ancestor
    /// maps to. Chrome, and anything inside chrome, resolves to nothing.
    fn candidate<'d>(
        &self,
        doc: &'d Document,
        tree: &dyn VisualTree,
        id: ElementId,
        point: Point,
    ) -> Option<Candidate<'d>> {
        let mut pos = None;
        let mut current = Some(id);
        while let Some(element) = current.and_then(|id| tree.element(id)) {
            match element.role {
                ElementRole::Chrome => return None,
                ElementRole::Node { pos: found } if pos.is_none() => pos = Some(found),
                _ => {}
            }
            current = element.parent;
        }

        let model = PageContainerModel::new(&self.registry);
        let block = model.resolve_block(doc.root(), pos?).ok()?;
        let rect = tree.block_rect(block.address)?;
        let is_container = self
            .registry
            .by_kind(&block.node.kind)
            .is_some_and(|block_type| block_type.is_container_like());

        Some(Candidate {
            located: Located {
                address: block.address,
                node: block.node,
                depth: block.depth,
            },
            distance: (point.y - rect.center().y).abs(),
            is_container,
        })
    }

    fn best<'d>(&self, candidates: impl Iterator<Item = Candidate<'d>>) -> Option<Candidate<'d>> {
        candidates.reduce(|best, next| {
            if self.compare(&next, &best) == Ordering::Less {
                next
            } else {
                best
            }
        })
    }

    /// Orders candidates best first.
    fn compare(&self, a: &Candidate<'_>, b: &Candidate<'_>) -> Ordering {
        if (a.distance - b.distance).abs() > self.config.tie_band {
            return a.distance.total_cmp(&b.distance);
        }
        b.located
            .depth
            .cmp(&a.located.depth)
            .then(a.is_container.cmp(&b.is_container))
            .then(a.distance.total_cmp(&b.distance))
            .then(a.located.address.cmp(&b.located.address))
    }
}
