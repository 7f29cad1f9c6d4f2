/// Diagnostic counters collected during one `search` call.
///
/// Purely informational: none of these participate in the correctness
/// contract. `prunes` counts skipped reference nodes (single-tree) and
/// skipped node pairs (dual-tree).
#[derive(Debug, Default, Clone)]
pub struct SearchTelemetry {
    pub prunes: usize,
    pub base_cases: usize,
    pub distance_evals: usize,
}

impl SearchTelemetry {
    pub fn add_from(&mut self, other: &SearchTelemetry) {
        self.prunes += other.prunes;
        self.base_cases += other.base_cases;
        self.distance_evals += other.distance_evals;
    }
}
