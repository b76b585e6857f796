//! Visual alignment of plain-text tables.
//!
//! The engine never edits text. It measures glyphs, plans an overlay of
//! [`Annotation`]s for every table it finds, and keeps them in an
//! [`AnnotationLayer`] that a renderer composes with the source lines.

use std::ops::Range;

use tracing::{debug, warn};

pub mod annotation;
pub mod cell;
pub mod charset;
pub mod columns;
pub mod config;
pub mod document;
pub mod error;
pub mod metrics;
pub mod planner;
pub mod render;
pub mod scanner;

pub use annotation::{Annotation, AnnotationKind, AnnotationLayer, Fill, Plan, Tag};
pub use charset::{Charset, CharsetRegistry};
pub use config::{AlignConfig, PipeDialect};
pub use document::{Document, TextDocument};
pub use error::{AlignError, Result};
pub use metrics::{CellMetrics, GlyphMetrics, Px};
pub use scanner::{TableKind, TableRange};

use planner::plan_table;
use scanner::{is_table_line, locate_table, locate_table_at_line};

/// Outcome of one [`Aligner::align_region`] pass.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RegionReport {
    /// The requested region grown to whole tables, or `None` when the pass
    /// was skipped for lack of a render surface.
    pub processed: Option<Range<usize>>,
    pub aligned: usize,
    /// Tables too large to lay out; their annotations were cleared.
    pub skipped: usize,
    /// One error per table that could not be laid out and was cleared.
    pub failures: Vec<AlignError>,
}

/// Entry points the host drives.
#[derive(Clone, Debug, Default)]
pub struct Aligner {
    config: AlignConfig,
}

impl Aligner {
    pub fn new(config: AlignConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AlignConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut AlignConfig {
        &mut self.config
    }

    pub fn locate_table(&self, doc: &dyn Document, position: usize) -> Option<TableRange> {
        locate_table(doc, position, &self.config)
    }

    /// Plans `table` without touching any layer.
    pub fn plan(
        &self,
        doc: &dyn Document,
        metrics: &dyn GlyphMetrics,
        table: &TableRange,
    ) -> Result<Plan> {
        plan_table(doc, metrics, &self.config, table)
    }

    /// Lays out every table overlapping `range`. Failures are cleared and
    /// reported per table; the rest of the region is still processed. Lines
    /// of the region outside any table lose whatever annotations they had.
    pub fn align_region(
        &self,
        doc: &dyn Document,
        metrics: &dyn GlyphMetrics,
        layer: &mut AnnotationLayer,
        range: Range<usize>,
    ) -> RegionReport {
        let mut report = RegionReport::default();
        if !metrics.has_render_surface() {
            debug!(?range, "no render surface, region skipped");
            return report;
        }

        let (first, last) = region_lines(doc, &range);
        let mut processed = range.clone();
        let mut idx = first;
        while idx <= last {
            if !is_table_line(doc, idx, &self.config) {
                layer.clear(doc.line_offset(idx)..doc.line_end(idx));
                idx += 1;
                continue;
            }
            let Some(table) = locate_table_at_line(doc, idx, &self.config) else {
                idx += 1;
                continue;
            };
            processed.start = processed.start.min(table.start);
            processed.end = processed.end.max(table.end);
            match self.align_table(doc, metrics, layer, &table) {
                Ok(true) => report.aligned += 1,
                Ok(false) => report.skipped += 1,
                Err(err) => report.failures.push(err),
            }
            idx = table.last_line + 1;
        }

        debug!(
            ?processed,
            aligned = report.aligned,
            skipped = report.skipped,
            failed = report.failures.len(),
            "region aligned"
        );
        report.processed = Some(processed);
        report
    }

    /// Lays out the table holding `position`. Unless `force` is set, a
    /// missing table or render surface is a quiet `Ok(None)`.
    pub fn align_at(
        &self,
        doc: &dyn Document,
        metrics: &dyn GlyphMetrics,
        layer: &mut AnnotationLayer,
        position: usize,
        force: bool,
    ) -> Result<Option<Range<usize>>> {
        if !metrics.has_render_surface() {
            return if force {
                Err(AlignError::NoRenderSurface)
            } else {
                Ok(None)
            };
        }
        let Some(table) = self.locate_table(doc, position) else {
            return if force {
                Err(AlignError::NotATable { position })
            } else {
                Ok(None)
            };
        };
        self.align_table(doc, metrics, layer, &table)?;
        Ok(Some(table.bytes()))
    }

    /// Clears the overlay of every table overlapping `range`, whole tables
    /// included. Returns how many annotations went away.
    pub fn reset_region(
        &self,
        doc: &dyn Document,
        layer: &mut AnnotationLayer,
        range: Range<usize>,
    ) -> usize {
        let (first, last) = region_lines(doc, &range);
        let mut extended = range;
        for idx in [first, last] {
            if let Some(table) = locate_table_at_line(doc, idx, &self.config) {
                extended.start = extended.start.min(table.start);
                extended.end = extended.end.max(table.end);
            }
        }
        let removed = layer.clear(extended.clone());
        debug!(range = ?extended, removed, "region reset");
        removed
    }

    /// `Ok(false)` when the table was too large and only cleared.
    fn align_table(
        &self,
        doc: &dyn Document,
        metrics: &dyn GlyphMetrics,
        layer: &mut AnnotationLayer,
        table: &TableRange,
    ) -> Result<bool> {
        if table.size() > self.config.max_table_size {
            debug!(
                lines = ?table.lines(),
                size = table.size(),
                "table over size limit, cleared"
            );
            layer.clear(table.bytes());
            return Ok(false);
        }
        match plan_table(doc, metrics, &self.config, table) {
            Ok(plan) => {
                debug!(lines = ?table.lines(), kind = ?table.kind, "table aligned");
                layer.apply(plan);
                Ok(true)
            }
            Err(err) => {
                warn!(lines = ?table.lines(), %err, "table left unaligned");
                layer.clear(table.bytes());
                Err(err)
            }
        }
    }
}

fn region_lines(doc: &dyn Document, range: &Range<usize>) -> (usize, usize) {
    let first = doc.line_at(range.start);
    let last = doc.line_at(range.end.saturating_sub(1).max(range.start));
    (first, last)
}
