use super::{EdgeType, LandmarkGraph, LandmarkId, LandmarkNode, LandmarkStatus};
use crate::common::{State, StateId};
use crate::error::HeuristicError;

use std::collections::HashMap;
use tracing::{info, trace};

/// Result of refreshing the landmark statuses of one state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub statuses: Vec<LandmarkStatus>,
    pub dead_end: bool,
}

/// Tracks, per search state, which landmarks have been reached on the path(s)
/// leading to it. The vectors are only ever updated incrementally through
/// initial-state and transition notifications.
#[derive(Debug, Clone)]
pub struct LandmarkStatusManager {
    num_landmarks: usize,
    reached: HashMap<StateId, Vec<bool>>,
}

impl LandmarkStatusManager {
    pub fn new(graph: &LandmarkGraph) -> Self {
        LandmarkStatusManager {
            num_landmarks: graph.number_of_landmarks(),
            reached: HashMap::new(),
        }
    }

    pub fn set_landmarks_for_initial_state(&mut self, graph: &LandmarkGraph, initial_state: &State) {
        let reached: Vec<bool> = graph
            .nodes()
            .iter()
            .map(|node| node.parents.is_empty() && node.is_true_in_state(initial_state))
            .collect();

        let num_reached = reached.iter().filter(|&&is_reached| is_reached).count();
        info!(
            "{} initial landmarks, {} goal landmarks",
            num_reached,
            graph.number_of_goal_landmarks()
        );
        self.reached.insert(initial_state.id(), reached);
    }

    /// Propagates the reached landmarks of `parent` to `child`. A child reached
    /// through several parents ends up with the intersection of what its
    /// parents reached, plus whatever became reachable in the child itself.
    /// Returns whether the child's vector changed.
    pub fn update_reached_landmarks(
        &mut self,
        graph: &LandmarkGraph,
        parent: &State,
        child: &State,
    ) -> Result<bool, HeuristicError> {
        if parent.id() == child.id() {
            return Ok(false);
        }

        let parent_reached = self
            .reached
            .get(&parent.id())
            .ok_or(HeuristicError::UntrackedState(parent.id()))?
            .clone();
        let num_landmarks = self.num_landmarks;
        let reached = self
            .reached
            .entry(child.id())
            .or_insert_with(|| vec![true; num_landmarks]);
        let before = reached.clone();

        for (child_flag, parent_flag) in reached.iter_mut().zip(&parent_reached) {
            if !parent_flag {
                *child_flag = false;
            }
        }

        for node in graph.nodes() {
            let id = node.id().0;
            if !reached[id] && node.is_true_in_state(child) && is_leaf(node, reached) {
                trace!("{} reached in {}", node.id(), child.id());
                reached[id] = true;
            }
        }

        Ok(*reached != before)
    }

    pub fn reached_landmarks(&self, state: StateId) -> Result<&[bool], HeuristicError> {
        self.reached
            .get(&state)
            .map(Vec::as_slice)
            .ok_or(HeuristicError::UntrackedState(state))
    }

    pub fn is_tracked(&self, state: StateId) -> bool {
        self.reached.contains_key(&state)
    }

    /// Derives the status of every landmark in `state` and checks whether some
    /// landmark still required can no longer be achieved.
    pub fn update_status(
        &self,
        graph: &LandmarkGraph,
        state: &State,
    ) -> Result<StatusUpdate, HeuristicError> {
        let reached = self.reached_landmarks(state.id())?;

        let mut statuses: Vec<LandmarkStatus> = reached
            .iter()
            .map(|&is_reached| {
                if is_reached {
                    LandmarkStatus::Reached
                } else {
                    LandmarkStatus::NotReached
                }
            })
            .collect();

        for node in graph.nodes() {
            let id = node.id().0;
            if statuses[id] == LandmarkStatus::Reached
                && !node.is_true_in_state(state)
                && (node.is_goal || lost_landmark_needed_again(node, &statuses))
            {
                statuses[id] = LandmarkStatus::NeededAgain;
            }
        }

        let dead_end = graph.nodes().iter().any(|node| {
            !node.is_derived
                && match statuses[node.id().0] {
                    LandmarkStatus::NotReached => node.first_achievers.is_empty(),
                    LandmarkStatus::NeededAgain => node.possible_achievers.is_empty(),
                    LandmarkStatus::Reached => false,
                }
        });

        Ok(StatusUpdate { statuses, dead_end })
    }
}

fn is_leaf(node: &LandmarkNode, reached: &[bool]) -> bool {
    node.parents.keys().all(|LandmarkId(parent)| reached[*parent])
}

// A reached landmark that no longer holds must be re-achieved if some child
// that has not been reached yet needs it immediately before. Necessary
// orderings are stronger than greedy-necessary ones and count as well.
fn lost_landmark_needed_again(node: &LandmarkNode, statuses: &[LandmarkStatus]) -> bool {
    node.children.iter().any(|(child, edge)| {
        matches!(edge, EdgeType::Necessary | EdgeType::GreedyNecessary)
            && statuses[child.0] == LandmarkStatus::NotReached
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmark::graph::tests::{chain_graph, chain_task};
    use crate::common::Fact;
    use crate::landmark::{LandmarkDefinition, LandmarkGraphBuilder};

    fn state(id: usize, values: Vec<usize>) -> State {
        State::new(StateId(id), values)
    }

    #[test]
    fn test_initial_state_marks_true_roots_only() {
        let task = chain_task();
        let graph = chain_graph(&task);
        let mut manager = LandmarkStatusManager::new(&graph);

        // `b` holds too, but its parent `a` has not been reached.
        let initial = state(0, vec![1, 1, 0]);
        manager.set_landmarks_for_initial_state(&graph, &initial);
        assert_eq!(manager.reached_landmarks(StateId(0)).unwrap(), &[true, false, false]);
    }

    #[test]
    fn test_transition_reaches_leaves_in_order() {
        let task = chain_task();
        let graph = chain_graph(&task);
        let mut manager = LandmarkStatusManager::new(&graph);

        let s0 = state(0, vec![0, 0, 0]);
        let s1 = state(1, vec![1, 0, 0]);
        let s2 = state(2, vec![1, 1, 0]);
        manager.set_landmarks_for_initial_state(&graph, &s0);

        assert!(manager.update_reached_landmarks(&graph, &s0, &s1).unwrap());
        assert_eq!(manager.reached_landmarks(StateId(1)).unwrap(), &[true, false, false]);

        assert!(manager.update_reached_landmarks(&graph, &s1, &s2).unwrap());
        assert_eq!(manager.reached_landmarks(StateId(2)).unwrap(), &[true, true, false]);

        // Same transition again changes nothing.
        assert!(!manager.update_reached_landmarks(&graph, &s1, &s2).unwrap());
        // Self loops are ignored.
        assert!(!manager.update_reached_landmarks(&graph, &s2, &s2).unwrap());
    }

    #[test]
    fn test_multiple_parents_intersect() {
        let task = chain_task();
        let mut builder = LandmarkGraphBuilder::new();
        builder.add_landmark(LandmarkDefinition::simple(Fact::new(0, 1)));
        builder.add_landmark(LandmarkDefinition::simple(Fact::new(1, 1)));
        let graph = builder.build(&task).unwrap();
        let mut manager = LandmarkStatusManager::new(&graph);

        let s0 = state(0, vec![0, 0, 0]);
        let via_a = state(1, vec![1, 0, 0]);
        let via_b = state(2, vec![0, 1, 0]);
        let joined = state(3, vec![0, 0, 1]);
        manager.set_landmarks_for_initial_state(&graph, &s0);
        manager.update_reached_landmarks(&graph, &s0, &via_a).unwrap();
        manager.update_reached_landmarks(&graph, &s0, &via_b).unwrap();

        manager.update_reached_landmarks(&graph, &via_a, &joined).unwrap();
        assert_eq!(manager.reached_landmarks(StateId(3)).unwrap(), &[true, false]);
        manager.update_reached_landmarks(&graph, &via_b, &joined).unwrap();
        assert_eq!(manager.reached_landmarks(StateId(3)).unwrap(), &[false, false]);
    }

    #[test]
    fn test_untracked_parent_is_an_error() {
        let task = chain_task();
        let graph = chain_graph(&task);
        let mut manager = LandmarkStatusManager::new(&graph);

        let result = manager.update_reached_landmarks(
            &graph,
            &state(4, vec![0, 0, 0]),
            &state(5, vec![1, 0, 0]),
        );
        assert!(matches!(result, Err(HeuristicError::UntrackedState(StateId(4)))));
        assert!(!manager.is_tracked(StateId(5)));
    }

    #[test]
    fn test_lost_landmarks_needed_again() {
        let task = chain_task();
        let graph = chain_graph(&task);
        let mut manager = LandmarkStatusManager::new(&graph);

        let s0 = state(0, vec![1, 0, 0]);
        manager.set_landmarks_for_initial_state(&graph, &s0);

        // `a` was lost while its greedy-necessary child `b` is still unreached.
        let s1 = state(1, vec![0, 0, 0]);
        manager.update_reached_landmarks(&graph, &s0, &s1).unwrap();
        let update = manager.update_status(&graph, &s1).unwrap();
        assert_eq!(
            update.statuses,
            vec![
                LandmarkStatus::NeededAgain,
                LandmarkStatus::NotReached,
                LandmarkStatus::NotReached
            ]
        );
        assert!(!update.dead_end);
    }

    #[test]
    fn test_lost_parent_of_necessary_child_needed_again() {
        let task = chain_task();
        for (edge, expected) in [
            (EdgeType::Necessary, LandmarkStatus::NeededAgain),
            (EdgeType::GreedyNecessary, LandmarkStatus::NeededAgain),
            (EdgeType::Natural, LandmarkStatus::Reached),
        ] {
            let mut builder = LandmarkGraphBuilder::new();
            let a = builder.add_landmark(LandmarkDefinition::simple(Fact::new(0, 1)));
            let b = builder.add_landmark(LandmarkDefinition::simple(Fact::new(1, 1)));
            builder.add_ordering(a, b, edge);
            let graph = builder.build(&task).unwrap();
            let mut manager = LandmarkStatusManager::new(&graph);

            let s0 = state(0, vec![1, 0, 0]);
            let s1 = state(1, vec![0, 0, 0]);
            manager.set_landmarks_for_initial_state(&graph, &s0);
            manager.update_reached_landmarks(&graph, &s0, &s1).unwrap();

            let update = manager.update_status(&graph, &s1).unwrap();
            assert_eq!(
                update.statuses,
                vec![expected, LandmarkStatus::NotReached],
                "{edge:?}"
            );
        }
    }

    #[test]
    fn test_lost_goal_needed_again() {
        let task = chain_task();
        let graph = chain_graph(&task);
        let mut manager = LandmarkStatusManager::new(&graph);

        let path = [
            state(0, vec![0, 0, 0]),
            state(1, vec![1, 0, 0]),
            state(2, vec![1, 1, 0]),
            state(3, vec![1, 1, 1]),
            state(4, vec![1, 1, 0]),
        ];
        manager.set_landmarks_for_initial_state(&graph, &path[0]);
        for step in path.windows(2) {
            manager.update_reached_landmarks(&graph, &step[0], &step[1]).unwrap();
        }

        let update = manager.update_status(&graph, &path[4]).unwrap();
        assert_eq!(
            update.statuses,
            vec![
                LandmarkStatus::Reached,
                LandmarkStatus::Reached,
                LandmarkStatus::NeededAgain
            ]
        );
    }

    #[test]
    fn test_dead_end_without_achievers() {
        let task = chain_task();
        let mut builder = LandmarkGraphBuilder::new();
        let a = builder.add_landmark(LandmarkDefinition::simple(Fact::new(0, 1)));
        let stuck = builder.add_landmark(
            LandmarkDefinition::simple(Fact::new(2, 0)).with_first_achievers(vec![]),
        );
        builder.add_ordering(a, stuck, EdgeType::Natural);
        let graph = builder.build(&task).unwrap();
        let mut manager = LandmarkStatusManager::new(&graph);

        let s0 = state(0, vec![0, 0, 1]);
        manager.set_landmarks_for_initial_state(&graph, &s0);
        assert!(manager.update_status(&graph, &s0).unwrap().dead_end);

        let mut builder = LandmarkGraphBuilder::new();
        builder.add_landmark(
            LandmarkDefinition::simple(Fact::new(2, 0))
                .with_first_achievers(vec![])
                .derived(),
        );
        let graph = builder.build(&task).unwrap();
        let mut manager = LandmarkStatusManager::new(&graph);
        manager.set_landmarks_for_initial_state(&graph, &s0);
        assert!(!manager.update_status(&graph, &s0).unwrap().dead_end);
    }
}
