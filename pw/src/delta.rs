//! Symbolic difference between two states

use std::cmp::Ordering;

use tracing::debug;

use crate::term::{State, Term};

/// Facts added and removed when moving from one state to another
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateDelta {
    /// Present in the target, absent from the source
    pub add_list: State,
    /// Present in the source, absent from the target
    pub del_list: State,
}

impl StateDelta {
    pub fn is_empty(&self) -> bool {
        self.add_list.is_empty() && self.del_list.is_empty()
    }

    /// The delta of the reverse transition
    pub fn swap(self) -> Self {
        Self {
            add_list: self.del_list,
            del_list: self.add_list,
        }
    }

    /// Apply to a state: `state - del_list + add_list`
    pub fn apply(&self, state: &State) -> State {
        debug!(
            adds = self.add_list.len(),
            dels = self.del_list.len(),
            "StateDelta::apply: called"
        );
        state
            .difference(&self.del_list)
            .chain(self.add_list.iter())
            .cloned()
            .collect()
    }
}

/// Compute the delta leading from `left` to `right`
///
/// Walks both sets once in their shared order, so the cost is linear in
/// `|left| + |right|`.
pub fn difference(left: &State, right: &State) -> StateDelta {
    debug!(left = left.len(), right = right.len(), "difference: called");
    let mut delta = StateDelta::default();
    let mut l = left.iter().peekable();
    let mut r = right.iter().peekable();

    loop {
        let order = match (l.peek(), r.peek()) {
            (Some(a), Some(b)) => a.cmp(b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => break,
        };
        match order {
            Ordering::Less => insert_next(&mut l, &mut delta.del_list),
            Ordering::Greater => insert_next(&mut r, &mut delta.add_list),
            Ordering::Equal => {
                l.next();
                r.next();
            }
        }
    }

    debug!(
        adds = delta.add_list.len(),
        dels = delta.del_list.len(),
        "difference: done"
    );
    delta
}

fn insert_next<'a>(it: &mut impl Iterator<Item = &'a Term>, into: &mut State) {
    if let Some(term) = it.next() {
        into.insert(term.clone());
    }
}
