use std::collections::{BTreeMap, VecDeque};
use std::fmt::{Display, Formatter};
use std::ops::Range;
use std::sync::Arc;

use log::debug;
use rand::Rng;

use crate::connection::{random_weight, Connection, Innovation};
use crate::error::NeatError;
use crate::innovation::InnovationManager;
use crate::node::{sigmoid, Node, NodeId};
use crate::settings::GenomeSettings;

/// A layered feed-forward network: nodes keyed by id, connections keyed by innovation.
///
/// Every connection goes from a lower layer to a strictly higher one. Input and bias
/// nodes sit on layer 0 and outputs on `layers - 1`, so a single pass in (layer, id)
/// order evaluates the whole network.
#[derive(Clone, Debug)]
pub struct Genome {
    settings: Arc<GenomeSettings>,
    nodes: BTreeMap<NodeId, Node>,
    connections: BTreeMap<Innovation, Connection>,
    layers: usize,
}

impl Genome {
    pub const BIAS_VALUE: f32 = 1.0;

    /// Every input and bias node fully connected to every output, weights 1.0.
    pub fn new(settings: Arc<GenomeSettings>, innovation_manager: &mut InnovationManager) -> Self {
        let mut genome = Self::empty(settings);
        for id in genome.input_ids() {
            genome.nodes.insert(id, Node::new(id, 0));
        }
        for id in genome.output_ids() {
            genome.nodes.insert(id, Node::new(id, 1));
        }
        for from in genome.input_ids() {
            for to in genome.output_ids() {
                genome.create_connection(from, to, 1.0, innovation_manager);
            }
        }
        genome
    }

    fn empty(settings: Arc<GenomeSettings>) -> Self {
        Self {
            settings,
            nodes: BTreeMap::new(),
            connections: BTreeMap::new(),
            layers: 2,
        }
    }

    pub fn settings(&self) -> &Arc<GenomeSettings> {
        &self.settings
    }

    pub fn nodes(&self) -> &BTreeMap<NodeId, Node> {
        &self.nodes
    }

    pub fn connections(&self) -> &BTreeMap<Innovation, Connection> {
        &self.connections
    }

    #[cfg(test)]
    pub(crate) fn connections_mut(&mut self) -> &mut BTreeMap<Innovation, Connection> {
        &mut self.connections
    }

    pub fn layers(&self) -> usize {
        self.layers
    }

    /// Input then bias node ids.
    pub fn input_ids(&self) -> Range<NodeId> {
        0..self.settings.sensors()
    }

    pub fn output_ids(&self) -> Range<NodeId> {
        let sensors = self.settings.sensors();
        sensors..sensors + self.settings.outputs
    }

    pub fn is_connected(&self, from: NodeId, to: NodeId) -> bool {
        self.nodes.get(&from).map_or(false, |node| {
            node.outputs
                .iter()
                .filter_map(|i| self.connections.get(i))
                .any(|c| c.to == to)
        })
    }

    fn create_connection(
        &mut self,
        from: NodeId,
        to: NodeId,
        weight: f32,
        innovation_manager: &mut InnovationManager,
    ) -> Innovation {
        let innovation = innovation_manager.connection_innovation(from, to, self);
        self.insert_connection(Connection::new(from, to, weight, innovation));
        innovation
    }

    fn insert_connection(&mut self, connection: Connection) {
        if let Some(node) = self.nodes.get_mut(&connection.from) {
            node.add_connection(connection.innovation);
        }
        self.connections.insert(connection.innovation, connection);
    }

    /// Ordered pairs (lower layer, higher layer) that are not yet connected.
    fn eligible_pairs(&self) -> Vec<(NodeId, NodeId)> {
        let mut pairs = vec![];
        for from in self.nodes.values() {
            for to in self.nodes.values() {
                if from.layer < to.layer && !self.is_connected(from.id, to.id) {
                    pairs.push((from.id, to.id));
                }
            }
        }
        pairs
    }

    /// Connects a random unconnected pair of nodes on different layers. Returns `None`
    /// when the genome is already fully connected.
    pub fn add_connection<R: Rng + ?Sized>(
        &mut self,
        innovation_manager: &mut InnovationManager,
        rng: &mut R,
    ) -> Option<Innovation> {
        let pairs = self.eligible_pairs();
        if pairs.is_empty() {
            return None;
        }
        let (from, to) = pairs[rng.gen_range(0..pairs.len())];
        let weight = random_weight(&self.settings.mutation, rng);
        let innovation = self.create_connection(from, to, weight, innovation_manager);
        debug!("new connection {} -> {} (I.N. {})", from, to, innovation);
        Some(innovation)
    }

    /// Splits a random enabled connection with a new node. The old connection is
    /// disabled and replaced by `from -> new` (weight 1.0) and `new -> to` (old weight).
    pub fn add_node<R: Rng + ?Sized>(
        &mut self,
        innovation_manager: &mut InnovationManager,
        rng: &mut R,
    ) -> Option<NodeId> {
        if self.connections.is_empty() {
            self.add_connection(innovation_manager, rng);
        }
        let enabled = self
            .connections
            .values()
            .filter(|c| c.enabled)
            .map(|c| c.innovation)
            .collect::<Vec<_>>();
        if enabled.is_empty() {
            return None;
        }
        let split = enabled[rng.gen_range(0..enabled.len())];
        let old = self.connections.get_mut(&split)?;
        old.enabled = false;
        let old = *old;

        let id = innovation_manager.node_id(split, self);
        let layer = self.nodes.get(&old.from)?.layer + 1;
        let shifted = self.nodes.get(&old.to)?.layer == layer;
        if shifted {
            for node in self.nodes.values_mut() {
                if node.layer >= layer {
                    node.layer += 1;
                }
            }
            self.layers += 1;
        }
        self.nodes.insert(id, Node::new(id, layer));
        self.create_connection(old.from, id, 1.0, innovation_manager);
        self.create_connection(id, old.to, old.weight, innovation_manager);
        debug!(
            "split connection {} with node {} on layer {} (shifted: {})",
            split, id, layer, shifted
        );
        debug_assert!(self.is_topology_valid());
        Some(id)
    }

    pub fn mutate<R: Rng + ?Sized>(&mut self, innovation_manager: &mut InnovationManager, rng: &mut R) {
        if self.connections.is_empty() {
            self.add_connection(innovation_manager, rng);
        }
        let settings = self.settings.clone();
        if rng.gen_range(0.0..1.0) < settings.mutation.weight_mutation_rate {
            for connection in self.connections.values_mut() {
                connection.mutate_weight(&settings.mutation, rng);
            }
        }
        if rng.gen_range(0.0..1.0) < settings.mutation.add_connection_rate {
            self.add_connection(innovation_manager, rng);
        }
        if rng.gen_range(0.0..1.0) < settings.mutation.add_node_rate {
            self.add_node(innovation_manager, rng);
        }
    }

    /// Recombines two parents gene by gene. `first` must not be less fit than `second`
    /// unless `same_fitness` is set.
    pub fn crossover<R: Rng + ?Sized>(
        first: &Genome,
        second: &Genome,
        same_fitness: bool,
        rng: &mut R,
    ) -> Genome {
        let reenable_rate = first.settings.mutation.reenable_rate;
        // (gene, parent it came from)
        let mut genes: Vec<(Connection, &Genome)> = vec![];
        for (innovation, a) in first.connections.iter() {
            let Some(b) = second.connections.get(innovation) else {
                continue;
            };
            let (mut gene, parent) = if rng.gen_range(0.0..1.0) < 0.5 {
                (*a, first)
            } else {
                (*b, second)
            };
            if !a.enabled && !b.enabled {
                gene.enabled = rng.gen_range(0.0..1.0) < reenable_rate;
            }
            genes.push((gene, parent));
        }
        let disjoint_source =
            if same_fitness && first.connections.len() > second.connections.len() {
                second
            } else {
                first
            };
        let other = if std::ptr::eq(disjoint_source, first) {
            second
        } else {
            first
        };
        for connection in disjoint_source.connections.values() {
            if !other.connections.contains_key(&connection.innovation) {
                genes.push((*connection, disjoint_source));
            }
        }
        genes.sort_by_key(|(gene, parent)| {
            let layer = parent.nodes.get(&gene.from).map_or(0, |n| n.layer);
            (layer, gene.from, gene.innovation)
        });

        let mut child = Self::empty(first.settings.clone());
        for id in first.input_ids().chain(first.output_ids()) {
            if let Some(node) = first.nodes.get(&id) {
                child.nodes.insert(id, node.blank());
            }
        }
        for (gene, parent) in genes {
            for id in [gene.from, gene.to] {
                if !child.nodes.contains_key(&id) {
                    let node = parent.nodes.get(&id).map_or(Node::new(id, 0), Node::blank);
                    child.nodes.insert(id, node);
                }
            }
            child.insert_connection(gene);
        }
        child.assign_layers();
        debug_assert!(child.is_topology_valid());
        child
    }

    /// Recomputes every layer from the child's own edges: each node ends one layer above
    /// its deepest predecessor and outputs are pinned to the deepest layer.
    fn assign_layers(&mut self) {
        for node in self.nodes.values_mut() {
            node.layer = 0;
        }
        let mut queue: VecDeque<NodeId> = self.nodes.keys().copied().collect();
        while let Some(id) = queue.pop_front() {
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            let layer = node.layer;
            let targets = node
                .outputs
                .iter()
                .filter_map(|i| self.connections.get(i))
                .map(|c| c.to)
                .collect::<Vec<_>>();
            for to in targets {
                if let Some(target) = self.nodes.get_mut(&to) {
                    if target.layer <= layer {
                        target.layer = layer + 1;
                        queue.push_back(to);
                    }
                }
            }
        }
        let max_layer = self.nodes.values().map(|n| n.layer).max().unwrap_or(0).max(1);
        for id in self.output_ids() {
            if let Some(node) = self.nodes.get_mut(&id) {
                node.layer = max_layer;
            }
        }
        self.layers = max_layer + 1;
    }

    /// Node ids in evaluation order: by layer, then by id.
    pub fn network(&self) -> Vec<NodeId> {
        let mut order = self.nodes.values().map(|n| (n.layer, n.id)).collect::<Vec<_>>();
        order.sort_unstable();
        order.into_iter().map(|(_, id)| id).collect()
    }

    /// Single forward pass. Bias nodes are fed `BIAS_VALUE`; every other non-sensor node
    /// applies the logistic sigmoid to its summed input before propagating.
    pub fn generate_output_values(&mut self, input_values: &[f32]) -> Result<Vec<f32>, NeatError> {
        if input_values.len() != self.settings.inputs {
            return Err(NeatError::InputMismatch {
                expected: self.settings.inputs,
                actual: input_values.len(),
            });
        }
        let order = self.network();
        let sensors = self.input_ids();
        for node in self.nodes.values_mut() {
            node.value = 0.0;
        }
        let values = input_values
            .iter()
            .copied()
            .chain(std::iter::repeat(Self::BIAS_VALUE).take(self.settings.bias));
        for (id, value) in sensors.clone().zip(values) {
            if let Some(node) = self.nodes.get_mut(&id) {
                node.value = value;
            }
        }
        for id in order {
            let Some(node) = self.nodes.get_mut(&id) else {
                continue;
            };
            if !sensors.contains(&id) {
                node.value = sigmoid(node.value);
            }
            let value = node.value;
            let signals = node
                .outputs
                .iter()
                .filter_map(|i| self.connections.get(i))
                .filter(|c| c.enabled)
                .map(|c| (c.to, value * c.weight))
                .collect::<Vec<_>>();
            for (to, signal) in signals {
                if let Some(target) = self.nodes.get_mut(&to) {
                    target.value += signal;
                }
            }
        }
        Ok(self
            .output_ids()
            .map(|id| self.nodes.get(&id).map_or(0.0, |n| n.value))
            .collect())
    }

    /// Compatibility distance: normalized count of non-shared genes plus the mean weight
    /// difference of shared ones (0 when nothing is shared).
    pub fn distance(&self, other: &Genome) -> f32 {
        let n1 = self.connections.len();
        let n2 = other.connections.len();
        let n = n1.max(n2);
        let n = if n < 20 { 1.0 } else { n as f32 };
        let mut common = 0usize;
        let mut weight_difference = 0.0;
        for (innovation, connection) in self.connections.iter() {
            if let Some(matching) = other.connections.get(innovation) {
                common += 1;
                weight_difference += (connection.weight - matching.weight).abs();
            }
        }
        let distance = &self.settings.distance;
        let disjoint = (n1 + n2 - 2 * common) as f32;
        let weights = if common > 0 {
            weight_difference / common as f32
        } else {
            0.0
        };
        distance.coeff_disjoint * disjoint / n + distance.coeff_weights * weights
    }

    pub fn is_topology_valid(&self) -> bool {
        self.validate().is_ok()
    }

    pub fn validate(&self) -> Result<(), NeatError> {
        for c in self.connections.values() {
            let (Some(from), Some(to)) = (self.nodes.get(&c.from), self.nodes.get(&c.to)) else {
                return Err(NeatError::InvalidTopology {
                    reason: format!("connection {} references a missing node", c.innovation),
                });
            };
            if from.layer >= to.layer {
                return Err(NeatError::layer_order(from.id, from.layer, to.id, to.layer));
            }
        }
        if self.connections.is_empty() {
            return Ok(());
        }
        for id in self.input_ids() {
            match self.nodes.get(&id) {
                Some(node) if node.layer == 0 => {}
                _ => {
                    return Err(NeatError::InvalidTopology {
                        reason: format!("input node {} is not on layer 0", id),
                    })
                }
            }
        }
        for id in self.output_ids() {
            match self.nodes.get(&id) {
                Some(node) if node.layer == self.layers - 1 => {}
                _ => {
                    return Err(NeatError::InvalidTopology {
                        reason: format!("output node {} is not on layer {}", id, self.layers - 1),
                    })
                }
            }
        }
        Ok(())
    }

    pub fn hidden_count(&self) -> usize {
        self.nodes
            .len()
            .saturating_sub(self.settings.sensors() + self.settings.outputs)
    }
}

impl Display for Genome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Genome")?;
        writeln!(f, "Inputs:  {}", self.settings.inputs)?;
        writeln!(f, "Bias:    {}", self.settings.bias > 0)?;
        writeln!(f, "Hidden:  {}", self.hidden_count())?;
        writeln!(f, "Outputs: {}", self.settings.outputs)?;
        writeln!(f, "Layers:  {}", self.layers)?;
        writeln!(f, "Nodes:")?;
        for node in self.nodes.values() {
            writeln!(f, "{}", node)?;
        }
        writeln!(f, "Connections:")?;
        for connection in self.connections.values() {
            writeln!(f, "{}", connection)?;
        }
        Ok(())
    }
}
