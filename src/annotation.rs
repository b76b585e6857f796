use std::ops::Range;

use tracing::trace;

use crate::metrics::Px;

/// How a space annotation is painted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fill {
    Blank,
    /// A horizontal rule, used for separator rows.
    Rule,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AnnotationKind {
    /// Draw the range as a space `width` wide that ends at pixel `align_to`
    /// of the row. An empty range inserts the space.
    Space { align_to: Px, width: Px, fill: Fill },
    /// Draw the range as these glyphs instead.
    Glyphs(String),
    /// Draw the delimiter in range as a full-height rule.
    Bar,
}

/// Which part of the engine owns an annotation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tag {
    Layout,
    Cosmetic,
}

/// A non-destructive visual directive over a byte range of the document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Annotation {
    pub range: Range<usize>,
    pub kind: AnnotationKind,
    pub tag: Tag,
}

impl Annotation {
    pub fn space(range: Range<usize>, align_to: Px, width: Px) -> Self {
        Self {
            range,
            kind: AnnotationKind::Space {
                align_to,
                width,
                fill: Fill::Blank,
            },
            tag: Tag::Layout,
        }
    }

    pub fn rule(range: Range<usize>, align_to: Px, width: Px) -> Self {
        Self {
            range,
            kind: AnnotationKind::Space {
                align_to,
                width,
                fill: Fill::Rule,
            },
            tag: Tag::Layout,
        }
    }

    pub fn glyphs(range: Range<usize>, glyphs: impl Into<String>) -> Self {
        Self {
            range,
            kind: AnnotationKind::Glyphs(glyphs.into()),
            tag: Tag::Layout,
        }
    }

    pub fn bar(range: Range<usize>) -> Self {
        Self {
            range,
            kind: AnnotationKind::Bar,
            tag: Tag::Cosmetic,
        }
    }

    pub fn is_insertion(&self) -> bool {
        self.range.is_empty()
    }

    /// Closed-interval overlap, so insertions at either edge count.
    fn touches(&self, range: &Range<usize>) -> bool {
        self.range.start <= range.end && self.range.end >= range.start
    }
}

/// Everything one table pass wants drawn, built before anything is applied.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Plan {
    /// The whole table, cleared before the plan lands.
    pub range: Range<usize>,
    pub annotations: Vec<Annotation>,
}

/// The engine's annotations over one document, kept ordered by position.
#[derive(Clone, Debug, Default)]
pub struct AnnotationLayer {
    annotations: Vec<Annotation>,
}

impl AnnotationLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces whatever covered the plan's range with the plan.
    pub fn apply(&mut self, plan: Plan) {
        self.clear(plan.range.clone());
        trace!(range = ?plan.range, count = plan.annotations.len(), "apply plan");
        self.annotations.extend(plan.annotations);
        self.annotations
            .sort_by_key(|annotation| (annotation.range.start, annotation.range.end));
    }

    /// Removes every annotation touching `range`, cosmetic markers included.
    pub fn clear(&mut self, range: Range<usize>) -> usize {
        let before = self.annotations.len();
        self.annotations
            .retain(|annotation| !annotation.touches(&range));
        before - self.annotations.len()
    }

    pub fn clear_all(&mut self) {
        self.annotations.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Annotation> {
        self.annotations.iter()
    }

    pub fn in_range(&self, range: Range<usize>) -> impl Iterator<Item = &Annotation> {
        self.annotations
            .iter()
            .filter(move |annotation| annotation.touches(&range))
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(range: Range<usize>, annotations: Vec<Annotation>) -> Plan {
        Plan { range, annotations }
    }

    #[test]
    fn apply_replaces_stale_annotations() {
        let mut layer = AnnotationLayer::new();
        layer.apply(plan(
            0..20,
            vec![Annotation::space(3..5, 10, 4), Annotation::bar(6..7)],
        ));
        layer.apply(plan(0..20, vec![Annotation::space(8..8, 12, 2)]));
        let kept: Vec<_> = layer.iter().cloned().collect();
        assert_eq!(kept, vec![Annotation::space(8..8, 12, 2)]);
    }

    #[test]
    fn apply_twice_is_idempotent() {
        let annotations = vec![
            Annotation::glyphs(0..1, "┌"),
            Annotation::space(2..4, 10, 4),
            Annotation::space(9..9, 20, 3),
        ];
        let mut layer = AnnotationLayer::new();
        layer.apply(plan(0..10, annotations.clone()));
        let once: Vec<_> = layer.iter().cloned().collect();
        layer.apply(plan(0..10, annotations));
        let twice: Vec<_> = layer.iter().cloned().collect();
        assert_eq!(once, twice);
    }

    #[test]
    fn clear_leaves_neighbouring_tables_alone() {
        let mut layer = AnnotationLayer::new();
        layer.apply(plan(0..10, vec![Annotation::space(10..10, 8, 2)]));
        layer.apply(plan(11..20, vec![Annotation::space(11..13, 8, 2)]));
        assert_eq!(layer.clear(0..10), 1);
        assert_eq!(layer.len(), 1);
        assert_eq!(layer.in_range(11..20).count(), 1);
        assert_eq!(layer.clear(0..10), 0);
    }

    #[test]
    fn clear_after_apply_leaves_nothing() {
        let mut layer = AnnotationLayer::new();
        layer.apply(plan(
            5..30,
            vec![
                Annotation::rule(6..9, 12, 6),
                Annotation::bar(9..10),
                Annotation::space(30..30, 40, 3),
            ],
        ));
        layer.clear(5..30);
        assert!(layer.is_empty());
    }
}
