//! Drag Reorder
//!
//! Turns a drag gesture over an ordered id list into a new order. Shared by
//! the host (keyboard/menu moves) and the preview surface (pointer drags).

use serde::{Deserialize, Serialize};

/// Which side of the hovered item the dragged item lands on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropSide {
    /// Insert before the hovered item
    Before,
    /// Insert after the hovered item
    After,
}

/// Resolved drop location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DropTarget {
    /// Relative to another item
    Item {
        /// Hovered item id
        id: String,
        /// Side of the hovered item
        side: DropSide,
    },
    /// After the last item
    End,
}

impl DropTarget {
    /// Drop before `id`
    #[must_use]
    pub fn before(id: impl Into<String>) -> Self {
        Self::Item {
            id: id.into(),
            side: DropSide::Before,
        }
    }

    /// Drop after `id`
    #[must_use]
    pub fn after(id: impl Into<String>) -> Self {
        Self::Item {
            id: id.into(),
            side: DropSide::After,
        }
    }
}

/// Keyboard move direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Towards the start of the list
    Up,
    /// Towards the end of the list
    Down,
}

/// Bounding extent of an item along the drag axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    /// Leading edge
    pub start: f64,
    /// Length along the axis
    pub size: f64,
}

impl Extent {
    /// Create an extent
    #[must_use]
    pub fn new(start: f64, size: f64) -> Self {
        Self { start, size }
    }

    /// Midpoint along the axis
    #[must_use]
    pub fn midpoint(&self) -> f64 {
        self.start + self.size / 2.0
    }
}

/// Pointer above the midpoint inserts before; at or below inserts after.
#[must_use]
pub fn resolve_side(pointer: f64, extent: Extent) -> DropSide {
    if pointer < extent.midpoint() {
        DropSide::Before
    } else {
        DropSide::After
    }
}

/// Final index of `dragged` after dropping on `target`.
///
/// `None` if either id is unknown or the target is the dragged item itself.
#[must_use]
pub fn insertion_index(ids: &[String], dragged: &str, target: &DropTarget) -> Option<usize> {
    let from = ids.iter().position(|id| id == dragged)?;
    let remaining = ids.len() - 1;
    match target {
        DropTarget::End => Some(remaining),
        DropTarget::Item { id, side } => {
            if id == dragged {
                return None;
            }
            let mut over = ids.iter().position(|candidate| candidate == id)?;
            // Index of the hovered item once the dragged one is lifted out
            if over > from {
                over -= 1;
            }
            Some(match side {
                DropSide::Before => over,
                DropSide::After => over + 1,
            })
        }
    }
}

/// New order after dropping `dragged` on `target`.
///
/// Returns `None` when nothing would change, including unknown ids. Callers
/// must not propagate a reorder in that case.
#[must_use]
pub fn apply_drop(ids: &[String], dragged: &str, target: &DropTarget) -> Option<Vec<String>> {
    let from = ids.iter().position(|id| id == dragged)?;
    let to = insertion_index(ids, dragged, target)?;
    if from == to {
        return None;
    }
    let mut next = ids.to_vec();
    let moved = next.remove(from);
    next.insert(to, moved);
    Some(next)
}

/// Target that moves `dragged` one slot in `direction`, if there is room
#[must_use]
pub fn nudge_target(ids: &[String], dragged: &str, direction: Direction) -> Option<DropTarget> {
    let from = ids.iter().position(|id| id == dragged)?;
    match direction {
        Direction::Up if from > 0 => Some(DropTarget::before(ids[from - 1].clone())),
        Direction::Down if from + 1 < ids.len() => Some(DropTarget::after(ids[from + 1].clone())),
        _ => None,
    }
}

/// One drag from start to finish or cancel
#[derive(Debug, Clone, PartialEq)]
pub struct DragGesture {
    dragged: String,
    committed: Vec<String>,
    target: Option<DropTarget>,
}

impl DragGesture {
    /// Start dragging `dragged` over the committed order
    #[must_use]
    pub fn start(dragged: impl Into<String>, committed: Vec<String>) -> Option<Self> {
        let dragged = dragged.into();
        if !committed.contains(&dragged) {
            return None;
        }
        Some(Self {
            dragged,
            committed,
            target: None,
        })
    }

    /// Dragged id
    #[must_use]
    pub fn dragged(&self) -> &str {
        &self.dragged
    }

    /// Current hover target
    #[must_use]
    pub fn target(&self) -> Option<&DropTarget> {
        self.target.as_ref()
    }

    /// Update the hover target. Targets that resolve to nothing clear it.
    pub fn hover(&mut self, target: DropTarget) {
        self.target = insertion_index(&self.committed, &self.dragged, &target).map(|_| target);
    }

    /// Leave every drop zone
    pub fn leave(&mut self) {
        self.target = None;
    }

    /// Replace the committed order under the gesture. Returns false if the
    /// dragged id is gone, in which case the gesture should be dropped.
    pub fn rebase(&mut self, committed: Vec<String>) -> bool {
        if !committed.contains(&self.dragged) {
            return false;
        }
        self.committed = committed;
        if let Some(target) = self.target.take() {
            self.hover(target);
        }
        true
    }

    /// Index where the drop indicator belongs, if the drop would move anything
    #[must_use]
    pub fn indicator(&self) -> Option<usize> {
        let target = self.target.as_ref()?;
        let from = self.committed.iter().position(|id| *id == self.dragged)?;
        insertion_index(&self.committed, &self.dragged, target).filter(|to| *to != from)
    }

    /// Release the pointer. `Some` only when the order actually changes.
    #[must_use]
    pub fn finish(self) -> Option<Vec<String>> {
        let target = self.target?;
        apply_drop(&self.committed, &self.dragged, &target)
    }

    /// Abort the gesture; the committed order stands
    #[must_use]
    pub fn cancel(self) -> Vec<String> {
        self.committed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_resolve_side_midpoint() {
        let extent = Extent::new(100.0, 40.0);
        assert_eq!(resolve_side(119.9, extent), DropSide::Before);
        assert_eq!(resolve_side(120.0, extent), DropSide::After);
        assert_eq!(resolve_side(139.0, extent), DropSide::After);
    }

    #[test]
    fn test_move_down_after_item() {
        let order = ids(&["a", "b", "c", "d"]);
        let next = apply_drop(&order, "a", &DropTarget::after("c")).unwrap();
        assert_eq!(next, ids(&["b", "c", "a", "d"]));
    }

    #[test]
    fn test_move_up_before_item() {
        let order = ids(&["a", "b", "c", "d"]);
        let next = apply_drop(&order, "d", &DropTarget::before("b")).unwrap();
        assert_eq!(next, ids(&["a", "d", "b", "c"]));
    }

    #[test]
    fn test_drop_at_end() {
        let order = ids(&["a", "b", "c"]);
        assert_eq!(
            apply_drop(&order, "a", &DropTarget::End).unwrap(),
            ids(&["b", "c", "a"])
        );
        assert!(apply_drop(&order, "c", &DropTarget::End).is_none());
    }

    #[test]
    fn test_same_position_is_noop() {
        let order = ids(&["a", "b", "c"]);
        // Before the next item or after the previous one both resolve to the source slot
        assert!(apply_drop(&order, "b", &DropTarget::before("c")).is_none());
        assert!(apply_drop(&order, "b", &DropTarget::after("a")).is_none());
        assert!(apply_drop(&order, "b", &DropTarget::before("b")).is_none());
    }

    #[test]
    fn test_single_item_is_noop() {
        let order = ids(&["only"]);
        assert!(apply_drop(&order, "only", &DropTarget::End).is_none());
        assert!(apply_drop(&order, "only", &DropTarget::after("only")).is_none());
    }

    #[test]
    fn test_unknown_ids() {
        let order = ids(&["a", "b"]);
        assert!(apply_drop(&order, "x", &DropTarget::End).is_none());
        assert!(apply_drop(&order, "a", &DropTarget::after("x")).is_none());
    }

    #[test]
    fn test_nudge_target() {
        let order = ids(&["a", "b", "c"]);
        assert_eq!(nudge_target(&order, "a", Direction::Up), None);
        let down = nudge_target(&order, "a", Direction::Down).unwrap();
        assert_eq!(apply_drop(&order, "a", &down).unwrap(), ids(&["b", "a", "c"]));
        let up = nudge_target(&order, "c", Direction::Up).unwrap();
        assert_eq!(apply_drop(&order, "c", &up).unwrap(), ids(&["a", "c", "b"]));
        assert_eq!(nudge_target(&order, "c", Direction::Down), None);
    }

    #[test]
    fn test_gesture_finish_and_indicator() {
        let mut gesture = DragGesture::start("a", ids(&["a", "b", "c"])).unwrap();
        assert_eq!(gesture.indicator(), None);
        gesture.hover(DropTarget::before("b"));
        assert_eq!(gesture.indicator(), None);
        gesture.hover(DropTarget::after("b"));
        assert_eq!(gesture.indicator(), Some(1));
        assert_eq!(gesture.finish().unwrap(), ids(&["b", "a", "c"]));
    }

    #[test]
    fn test_gesture_cancel_restores_committed() {
        let mut gesture = DragGesture::start("a", ids(&["a", "b"])).unwrap();
        gesture.hover(DropTarget::End);
        assert_eq!(gesture.cancel(), ids(&["a", "b"]));
    }

    #[test]
    fn test_gesture_without_target_finishes_empty() {
        let mut gesture = DragGesture::start("a", ids(&["a", "b"])).unwrap();
        gesture.hover(DropTarget::after("missing"));
        assert!(gesture.target().is_none());
        assert!(gesture.finish().is_none());
    }

    #[test]
    fn test_gesture_rebase() {
        let mut gesture = DragGesture::start("b", ids(&["a", "b", "c"])).unwrap();
        gesture.hover(DropTarget::after("c"));
        assert!(gesture.rebase(ids(&["b", "c"])));
        assert_eq!(gesture.finish().unwrap(), ids(&["c", "b"]));

        let mut gesture = DragGesture::start("b", ids(&["a", "b"])).unwrap();
        assert!(!gesture.rebase(ids(&["a"])));
    }

    #[test]
    fn test_start_requires_known_id() {
        assert!(DragGesture::start("x", ids(&["a"])).is_none());
    }
}
