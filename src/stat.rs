use tracing::info;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluationStats {
    pub evaluations: usize,
    pub cache_hits: usize,
    pub dead_ends: usize,
    pub helpful_action_hits: usize,
    pub exploration_calls: usize,
    pub exploration_failures: usize,
}

impl EvaluationStats {
    pub fn print(&self) {
        info!(
            "Evaluations {:?} Cache hits {:?} Dead ends {:?} Direct helpful actions {:?} Explorations {:?} (failed {:?})",
            self.evaluations,
            self.cache_hits,
            self.dead_ends,
            self.helpful_action_hits,
            self.exploration_calls,
            self.exploration_failures
        );
    }
}
