//! Historical markings shared by every genome of a run.
//!
//! Each structural mutation is recorded together with a snapshot of the gene ids the
//! mutating genome held at that moment. A later request is given the recorded id only
//! when it asks for the same change from an identical gene set, so two lineages that
//! grow the same structure from the same starting point stay aligned for crossover
//! while merely coincidental node pairs do not.

use std::collections::{HashMap, HashSet};

use crate::connection::Innovation;
use crate::genome::Genome;
use crate::node::NodeId;
use crate::settings::GenomeSettings;

/// Immutable set of gene ids a genome held when a mutation was first recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneSnapshot(HashSet<usize>);

impl GeneSnapshot {
    pub fn of_connections(genome: &Genome) -> Self {
        Self(genome.connections().keys().copied().collect())
    }

    pub fn of_nodes(genome: &Genome) -> Self {
        Self(genome.nodes().keys().copied().collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, id: usize) -> bool {
        self.0.contains(&id)
    }
}

#[derive(Debug, Clone)]
pub struct ConnectionInnovation {
    pub from: NodeId,
    pub to: NodeId,
    pub innovation: Innovation,
    pub snapshot: GeneSnapshot,
}

#[derive(Debug, Clone)]
pub struct NodeInnovation {
    /// The connection whose split created the node.
    pub split: Innovation,
    pub node: NodeId,
    pub snapshot: GeneSnapshot,
}

#[derive(Debug, Clone)]
pub struct InnovationManager {
    connection_counter: Innovation,
    node_counter: NodeId,
    connection_history: Vec<ConnectionInnovation>,
    node_history: Vec<NodeInnovation>,
    connections_by_pair: HashMap<(NodeId, NodeId), Vec<usize>>,
    nodes_by_split: HashMap<Innovation, Vec<usize>>,
}

impl InnovationManager {
    pub fn new(settings: &GenomeSettings) -> Self {
        Self {
            connection_counter: 0,
            node_counter: settings.sensors() + settings.outputs,
            connection_history: vec![],
            node_history: vec![],
            connections_by_pair: HashMap::new(),
            nodes_by_split: HashMap::new(),
        }
    }

    pub fn connection_innovation(&mut self, from: NodeId, to: NodeId, genome: &Genome) -> Innovation {
        let snapshot = GeneSnapshot::of_connections(genome);
        let candidates = self.connections_by_pair.entry((from, to)).or_default();
        if let Some(existing) = candidates
            .iter()
            .map(|idx| &self.connection_history[*idx])
            .find(|record| record.snapshot == snapshot)
        {
            return existing.innovation;
        }
        let innovation = self.connection_counter;
        self.connection_counter += 1;
        candidates.push(self.connection_history.len());
        self.connection_history.push(ConnectionInnovation {
            from,
            to,
            innovation,
            snapshot,
        });
        innovation
    }

    pub fn node_id(&mut self, split: Innovation, genome: &Genome) -> NodeId {
        let snapshot = GeneSnapshot::of_nodes(genome);
        let candidates = self.nodes_by_split.entry(split).or_default();
        if let Some(existing) = candidates
            .iter()
            .map(|idx| &self.node_history[*idx])
            .find(|record| record.snapshot == snapshot)
        {
            return existing.node;
        }
        let node = self.node_counter;
        self.node_counter += 1;
        candidates.push(self.node_history.len());
        self.node_history.push(NodeInnovation {
            split,
            node,
            snapshot,
        });
        node
    }

    pub fn connection_history(&self) -> &[ConnectionInnovation] {
        &self.connection_history
    }

    pub fn node_history(&self) -> &[NodeInnovation] {
        &self.node_history
    }

    /// The next innovation number that would be handed out.
    pub fn next_innovation(&self) -> Innovation {
        self.connection_counter
    }

    pub fn next_node_id(&self) -> NodeId {
        self.node_counter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn settings() -> Arc<GenomeSettings> {
        Arc::new(GenomeSettings::new(2, 1, 0))
    }

    #[test]
    fn counters_start_after_fixed_nodes() {
        let manager = InnovationManager::new(&GenomeSettings::new(4, 3, 1));
        assert_eq!(manager.next_node_id(), 8);
        assert_eq!(manager.next_innovation(), 0);
    }

    #[test]
    fn equivalent_genomes_share_initial_innovations() {
        let settings = settings();
        let mut manager = InnovationManager::new(&settings);
        let a = Genome::new(settings.clone(), &mut manager);
        let b = Genome::new(settings, &mut manager);
        let a_ids: Vec<_> = a.connections().keys().copied().collect();
        let b_ids: Vec<_> = b.connections().keys().copied().collect();
        assert_eq!(a_ids, vec![0, 1]);
        assert_eq!(a_ids, b_ids);
        assert_eq!(manager.connection_history().len(), 2);
    }

    #[test]
    fn same_pair_from_different_gene_sets_gets_new_id() {
        let settings = settings();
        let mut manager = InnovationManager::new(&settings);
        let a = Genome::new(settings.clone(), &mut manager);
        let first = manager.connection_innovation(0, 2, &a);
        let again = manager.connection_innovation(0, 2, &a);
        assert_eq!(first, again);

        let mut b = a.clone();
        b.connections_mut().remove(&1);
        let other = manager.connection_innovation(0, 2, &b);
        assert_ne!(first, other);
    }

    #[test]
    fn node_ids_follow_split_and_node_set() {
        let settings = settings();
        let mut manager = InnovationManager::new(&settings);
        let a = Genome::new(settings.clone(), &mut manager);
        let b = a.clone();
        let from_a = manager.node_id(0, &a);
        let from_b = manager.node_id(0, &b);
        assert_eq!(from_a, 3);
        assert_eq!(from_a, from_b);
        assert_eq!(manager.node_id(1, &a), 4);
        assert_eq!(manager.node_history().len(), 2);
        assert_eq!(manager.node_history()[0].split, 0);
        assert!(manager.node_history()[0].snapshot.contains(2));
    }
}
