use pool_types::{estimate_vram_gb, JobType, WorkerNode};

/// One slice of a batch-split job, naming the worker it's assigned to,
/// the derived subtask id, and its share of the batch.
pub struct BatchShare<'a> {
    pub node: &'a WorkerNode,
    pub subtask_id: String,
    pub batch_size: u32,
}

/// Split `total_batch` across `available` (assumed already sorted by
/// `compute_power` descending), proportional to each node's
/// `compute_power`. Every node but the last gets
/// `max(1, floor(total_batch * power_i / sum_power))`; the last node
/// absorbs the remainder. Nodes that would receive zero are skipped.
pub fn split_batch<'a>(parent_id: &str, available: &'a [WorkerNode], total_batch: u32) -> Vec<BatchShare<'a>> {
    if available.is_empty() || total_batch == 0 {
        return Vec::new();
    }

    let total_power: f64 = available.iter().map(|w| w.compute_power).sum();
    let mut remaining = total_batch;
    let mut shares = Vec::with_capacity(available.len());

    for (i, node) in available.iter().enumerate() {
        let is_last = i == available.len() - 1;
        let share = if is_last {
            remaining
        } else {
            let proportional = (total_batch as f64 * node.compute_power / total_power).floor() as u32;
            let share = proportional.max(1).min(remaining);
            remaining = remaining.saturating_sub(share);
            share
        };

        if share > 0 {
            shares.push(BatchShare {
                node,
                subtask_id: format!("{parent_id}_part{i}"),
                batch_size: share,
            });
        }
    }

    shares
}

/// Select the single best worker for a job: filter by estimated VRAM
/// requirement, falling back to the full available set if the filter
/// leaves nothing; then sort by `(compute_power desc, free_vram desc)`
/// with a lexicographic id tie-break.
pub fn select_best_worker<'a>(
    available: &'a [WorkerNode],
    model_id: &str,
    job_type: JobType,
) -> Option<&'a WorkerNode> {
    let required = estimate_vram_gb(model_id, job_type);
    let filtered: Vec<&WorkerNode> = available.iter().filter(|w| w.free_vram_gb >= required).collect();
    let candidates: Vec<&WorkerNode> = if filtered.is_empty() {
        available.iter().collect()
    } else {
        filtered
    };

    candidates.into_iter().min_by(|a, b| {
        b.compute_power
            .partial_cmp(&a.compute_power)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.free_vram_gb.partial_cmp(&a.free_vram_gb).unwrap_or(std::cmp::Ordering::Equal))
            .then_with(|| a.id.cmp(&b.id))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn node(id: &str, power: f64, free_vram: f64) -> WorkerNode {
        let mut n = WorkerNode::new(id, id, "host", 9000);
        n.compute_power = power;
        n.free_vram_gb = free_vram;
        n.status = pool_types::WorkerStatus::Online;
        n.last_heartbeat = Utc::now();
        n
    }

    #[test]
    fn split_respects_compute_power_proportions() {
        let nodes = vec![node("a", 2.0, 10.0), node("b", 1.0, 10.0), node("c", 1.0, 10.0)];
        let shares = split_batch("j1", &nodes, 6);
        let sizes: Vec<u32> = shares.iter().map(|s| s.batch_size).collect();
        assert_eq!(sizes, vec![3, 1, 2]);
        assert_eq!(shares[2].subtask_id, "j1_part2");
        let total: u32 = sizes.iter().sum();
        assert_eq!(total, 6);
    }

    #[test]
    fn split_with_single_node_takes_whole_batch() {
        let nodes = vec![node("a", 1.0, 10.0)];
        let shares = split_batch("j1", &nodes, 5);
        assert_eq!(shares.len(), 1);
        assert_eq!(shares[0].batch_size, 5);
    }

    #[test]
    fn split_of_one_is_single_share() {
        let nodes = vec![node("a", 1.0, 10.0), node("b", 1.0, 10.0)];
        let shares = split_batch("j1", &nodes, 1);
        assert_eq!(shares.len(), 1);
        assert_eq!(shares[0].batch_size, 1);
    }

    #[test]
    fn selection_falls_back_when_vram_filter_empties() {
        let nodes = vec![node("a", 1.0, 1.0), node("b", 2.0, 1.0)];
        let best = select_best_worker(&nodes, "black-forest-labs/FLUX.1-dev", JobType::Image).unwrap();
        assert_eq!(best.id, "b");
    }

    #[test]
    fn selection_prefers_higher_compute_power_then_free_vram() {
        let nodes = vec![node("a", 1.0, 20.0), node("b", 2.0, 5.0)];
        let best = select_best_worker(&nodes, "sd1.5", JobType::Image).unwrap();
        assert_eq!(best.id, "b");
    }
}
