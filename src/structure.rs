//! Structural tree builder.
//!
//! A unit (book, journal volume, newspaper issue) becomes a logical tree at
//! most one level deep: a root division, optionally with one child per
//! structural subdivision (chapter, issue). Every division owns a half-open
//! window of page offsets:
//!
//! ```text
//! subdivisions:   01_Intro (5 pages)   02_Body (0 pages)   03_End (3 pages)
//! windows:        [0,5)                [5,5)               [5,8)
//! root:           [0,8)
//! ```
//!
//! Windows are assigned by a running offset, so siblings are contiguous and
//! never overlap, and together they cover exactly the root window. An empty
//! subdivision keeps its place in the tree but links no pages.
//!
//! Structural links are emitted child by child, followed by the root's
//! aggregate link to every page.

use crate::ids::{ROOT_LOGICAL_NUMBER, dmd_id, log_id, phys_id};
use std::ops::Range;
use std::path::PathBuf;

/// Half-open range of 0-based page offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub start: usize,
    pub end: usize,
}

impl PageWindow {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// 1-based page sequence numbers inside the window.
    pub fn sequences(&self) -> Range<usize> {
        self.start + 1..self.end + 1
    }
}

/// A node in the logical structure.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuralUnit {
    pub label: String,
    /// Logical division number; `LOG_{n}` / `DMDLOG_{n}`.
    pub number: usize,
    /// 1-based position among siblings, `None` for the root.
    pub order: Option<usize>,
    pub window: PageWindow,
    pub children: Vec<StructuralUnit>,
}

impl StructuralUnit {
    /// A root division without subdivisions spanning `page_count` pages.
    pub fn leaf(label: impl Into<String>, page_count: usize) -> Self {
        Self {
            label: label.into(),
            number: ROOT_LOGICAL_NUMBER,
            order: None,
            window: PageWindow::new(0, page_count),
            children: Vec::new(),
        }
    }

    pub fn log_id(&self) -> String {
        log_id(self.number)
    }

    pub fn dmd_id(&self) -> String {
        dmd_id(self.number)
    }

    /// Whether children tile this unit's window exactly, in order.
    pub fn is_contiguous(&self) -> bool {
        if self.children.is_empty() {
            return true;
        }
        let mut offset = self.window.start;
        for child in &self.children {
            if child.window.start != offset || !child.is_contiguous() {
                return false;
            }
            offset = child.window.end;
        }
        offset == self.window.end
    }
}

/// A structural subdivision folder below a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subdivision {
    pub path: PathBuf,
    pub label: String,
}

/// Builds a root division from subdivisions pushed in document order.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    offset: usize,
    children: Vec<StructuralUnit>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a subdivision spanning the next `page_count` pages.
    pub fn push(&mut self, label: impl Into<String>, page_count: usize) -> &StructuralUnit {
        let order = self.children.len() + 1;
        let window = PageWindow::new(self.offset, self.offset + page_count);
        self.offset = window.end;
        self.children.push(StructuralUnit {
            label: label.into(),
            number: ROOT_LOGICAL_NUMBER + order,
            order: Some(order),
            window,
            children: Vec::new(),
        });
        &self.children[order - 1]
    }

    /// Pages assigned so far.
    pub fn page_count(&self) -> usize {
        self.offset
    }

    pub fn finish(self, label: impl Into<String>) -> StructuralUnit {
        StructuralUnit {
            label: label.into(),
            number: ROOT_LOGICAL_NUMBER,
            order: None,
            window: PageWindow::new(0, self.offset),
            children: self.children,
        }
    }
}

/// Build a root division by deriving each subdivision in order.
///
/// `derive` returns the pages produced for one subdivision; their count
/// advances the running offset. The collected pages come back in document
/// order alongside the tree.
pub fn build_tree<T, E, F>(
    label: &str,
    subdivisions: &[Subdivision],
    mut derive: F,
) -> Result<(StructuralUnit, Vec<T>), E>
where
    F: FnMut(&Subdivision) -> Result<Vec<T>, E>,
{
    let mut builder = TreeBuilder::new();
    let mut pages = Vec::new();
    for subdivision in subdivisions {
        let derived = derive(subdivision)?;
        builder.push(subdivision.label.clone(), derived.len());
        pages.extend(derived);
    }
    Ok((builder.finish(label), pages))
}

/// One `mets:smLink`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructLink {
    pub from: String,
    pub to: String,
}

/// Links from logical divisions to physical pages: children first, then the
/// root's aggregate over its whole window.
pub fn struct_links(root: &StructuralUnit) -> Vec<StructLink> {
    let mut links = Vec::new();
    for child in &root.children {
        push_window_links(&mut links, child);
    }
    push_window_links(&mut links, root);
    links
}

fn push_window_links(links: &mut Vec<StructLink>, unit: &StructuralUnit) {
    let from = unit.log_id();
    links.extend(unit.window.sequences().map(|seq| StructLink {
        from: from.clone(),
        to: phys_id(seq),
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(from: &str, to: &str) -> StructLink {
        StructLink {
            from: from.into(),
            to: to.into(),
        }
    }

    fn targets(links: &[StructLink], from: &str) -> Vec<String> {
        links
            .iter()
            .filter(|l| l.from == from)
            .map(|l| l.to.clone())
            .collect()
    }

    #[test]
    fn windows_follow_running_offset() {
        let mut b = TreeBuilder::new();
        assert_eq!(b.push("a", 5).window, PageWindow::new(0, 5));
        assert_eq!(b.push("b", 3).window, PageWindow::new(5, 8));
        assert_eq!(b.page_count(), 8);
        let root = b.finish("root");
        assert_eq!(root.window, PageWindow::new(0, 8));
        assert!(root.is_contiguous());
    }

    #[test]
    fn empty_subdivision_is_degenerate_window() {
        let mut b = TreeBuilder::new();
        b.push("a", 2);
        let empty = b.push("b", 0).clone();
        b.push("c", 1);
        let root = b.finish("root");

        assert!(empty.window.is_empty());
        assert_eq!(empty.window, PageWindow::new(2, 2));
        assert!(root.is_contiguous());
        let links = struct_links(&root);
        assert!(targets(&links, "LOG_3").is_empty());
        assert_eq!(targets(&links, "LOG_4"), vec!["phys_3"]);
    }

    #[test]
    fn children_are_numbered_after_root_with_order() {
        let mut b = TreeBuilder::new();
        b.push("Intro", 1);
        b.push("End", 1);
        let root = b.finish("Book");
        assert_eq!(root.log_id(), "LOG_1");
        assert_eq!(root.dmd_id(), "DMDLOG_1");
        assert_eq!(root.order, None);
        let ids: Vec<String> = root.children.iter().map(|c| c.log_id()).collect();
        assert_eq!(ids, vec!["LOG_2", "LOG_3"]);
        let orders: Vec<Option<usize>> = root.children.iter().map(|c| c.order).collect();
        assert_eq!(orders, vec![Some(1), Some(2)]);
    }

    #[test]
    fn leaf_links_every_page() {
        let root = StructuralUnit::leaf("MyBook", 3);
        let links = struct_links(&root);
        assert_eq!(
            links,
            vec![
                link("LOG_1", "phys_1"),
                link("LOG_1", "phys_2"),
                link("LOG_1", "phys_3"),
            ]
        );
    }

    #[test]
    fn two_issues_then_aggregate() {
        let mut b = TreeBuilder::new();
        b.push("Issue 1", 2);
        b.push("Issue 2", 4);
        let root = b.finish("Times");
        let links = struct_links(&root);

        assert_eq!(targets(&links, "LOG_2"), vec!["phys_1", "phys_2"]);
        assert_eq!(
            targets(&links, "LOG_3"),
            vec!["phys_3", "phys_4", "phys_5", "phys_6"]
        );
        assert_eq!(targets(&links, "LOG_1").len(), 6);
        // Children come before the aggregate
        assert_eq!(links[0].from, "LOG_2");
        assert_eq!(links.last().unwrap().from, "LOG_1");
        assert_eq!(links.len(), 12);
    }

    #[test]
    fn gap_is_not_contiguous() {
        let mut root = StructuralUnit::leaf("x", 4);
        root.children.push(StructuralUnit {
            label: "a".into(),
            number: 2,
            order: Some(1),
            window: PageWindow::new(0, 1),
            children: vec![],
        });
        root.children.push(StructuralUnit {
            label: "b".into(),
            number: 3,
            order: Some(2),
            window: PageWindow::new(2, 4),
            children: vec![],
        });
        assert!(!root.is_contiguous());
    }

    #[test]
    fn build_tree_collects_pages_in_order() {
        let subs = vec![
            Subdivision { path: "a".into(), label: "A".into() },
            Subdivision { path: "b".into(), label: "B".into() },
        ];
        let (root, pages) = build_tree::<_, (), _>("Root", &subs, |s| {
            Ok(match s.label.as_str() {
                "A" => vec!["a1", "a2"],
                _ => vec!["b1"],
            })
        })
        .unwrap();
        assert_eq!(pages, vec!["a1", "a2", "b1"]);
        assert_eq!(root.children[1].window, PageWindow::new(2, 3));
        assert_eq!(root.label, "Root");
    }

    #[test]
    fn build_tree_propagates_error() {
        let subs = vec![Subdivision { path: "a".into(), label: "A".into() }];
        let result = build_tree::<(), _, _>("Root", &subs, |_| Err("boom"));
        assert_eq!(result.unwrap_err(), "boom");
    }

    #[test]
    fn window_sequences_are_one_based() {
        let w = PageWindow::new(2, 5);
        assert_eq!(w.sequences().collect::<Vec<_>>(), vec![3, 4, 5]);
        assert_eq!(w.len(), 3);
    }
}
