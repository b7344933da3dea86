//! Multiverse
//!
//! This is a multi temporal store, where the timeline is accessible by
//! HeaderId and multiple timelines are possible. Every state descends from a
//! single root (the genesis, or an imported checkpoint).
//!
//! States are also indexed by slot so blocks can be served in slot order.

use crate::{header::Header, key::HeaderId, ledger::LedgerState};
use chain_time::Slot;
use std::collections::{BTreeMap, HashMap};

//
// The multiverse is characterized by a single origin and multiple state of a given time
//
//          [tip A]
//        ,o            ,-o-o--o [tip B]
//       /             /
// o----o----o--o--o--o-o-o-o-oooo [tip E]
//                  \
//                   `-o--o [tip C]
//                      \
//                      `----o-o-oo [tip F]
//
// +------------------------------+-----> time
// t=0                            t=latest known
//
#[derive(Debug, Clone)]
pub struct Multiverse {
    root: LedgerState,
    /// a few states before the root, oldest first, standing in for the
    /// blocks a checkpointed root forgot about
    history: Vec<LedgerState>,
    known_states: HashMap<HeaderId, LedgerState>,
    by_slot: BTreeMap<Slot, Vec<HeaderId>>,
}

impl Multiverse {
    pub fn new(root: LedgerState) -> Self {
        Self::with_history(root, Vec::new())
    }

    /// Multiverse rooted at `root`, answering [`Multiverse::last_before`]
    /// queries older than the root from `history`.
    pub fn with_history(root: LedgerState, mut history: Vec<LedgerState>) -> Self {
        history.retain(|state| state.slot() < root.slot());
        history.sort_by_key(LedgerState::slot);
        let mut multiverse = Multiverse {
            root: root.clone(),
            history,
            known_states: HashMap::new(),
            by_slot: BTreeMap::new(),
        };
        multiverse.insert(root);
        multiverse
    }

    pub fn root(&self) -> &LedgerState {
        &self.root
    }

    pub fn root_id(&self) -> HeaderId {
        self.root.id()
    }

    pub fn get(&self, id: &HeaderId) -> Option<&LedgerState> {
        self.known_states.get(id)
    }

    pub fn contains(&self, id: &HeaderId) -> bool {
        self.known_states.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.known_states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known_states.is_empty()
    }

    /// Add a state, replacing any state already known for the same block.
    ///
    /// The state is expected to descend from the root.
    pub fn insert(&mut self, state: LedgerState) {
        let id = state.id();
        let slot = state.slot();
        if id == self.root.id() {
            self.root = state.clone();
        }
        if self.known_states.insert(id, state).is_none() {
            self.by_slot.entry(slot).or_default().push(id);
        }
    }

    pub fn remove(&mut self, id: &HeaderId) -> Option<LedgerState> {
        if *id == self.root.id() {
            return None;
        }
        let state = self.known_states.remove(id)?;
        if let Some(ids) = self.by_slot.get_mut(&state.slot()) {
            ids.retain(|known| known != id);
            if ids.is_empty() {
                self.by_slot.remove(&state.slot());
            }
        }
        Some(state)
    }

    /// iterate the states from `tip` back to the root
    pub fn iter_chain(&self, tip: HeaderId) -> IterChain<'_> {
        IterChain {
            multiverse: self,
            next: Some(tip),
        }
    }

    /// true if `ancestor` is `descendant` or one of its ancestors
    pub fn is_ancestor(&self, ancestor: &HeaderId, descendant: &HeaderId) -> bool {
        self.iter_chain(*descendant)
            .any(|state| &state.id() == ancestor)
    }

    /// The state `depth` blocks behind `tip`, or the oldest known ancestor
    /// of `tip` when the chain is shorter.
    pub fn ancestor_at_depth(&self, tip: HeaderId, depth: u64) -> Option<&LedgerState> {
        self.iter_chain(tip).take(depth as usize + 1).last()
    }

    /// Last state of the chain ending at `tip` whose slot is strictly
    /// before `slot`. Past the root, the latest matching state of the
    /// history, then the root itself.
    pub fn last_before(&self, tip: HeaderId, slot: Slot) -> &LedgerState {
        self.iter_chain(tip)
            .find(|state| state.slot() < slot)
            .or_else(|| self.history.iter().rev().find(|state| state.slot() < slot))
            .unwrap_or_else(|| self.root())
    }

    /// Every known block from `from` onward, in ascending slot order.
    ///
    /// Blocks sharing a slot come in the order they were added.
    pub fn blocks_by_slot(&self, from: Slot) -> impl Iterator<Item = &Header> + '_ {
        self.by_slot
            .range(from..)
            .flat_map(|(_, ids)| ids.iter())
            .filter_map(move |id| self.known_states.get(id))
            .map(LedgerState::block)
    }
}

pub struct IterChain<'a> {
    multiverse: &'a Multiverse,
    next: Option<HeaderId>,
}

impl<'a> Iterator for IterChain<'a> {
    type Item = &'a LedgerState;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next.take()?;
        let state = self.multiverse.get(&id)?;
        if id != self.multiverse.root_id() {
            self.next = Some(state.block().parent());
        }
        Some(state)
    }
}
