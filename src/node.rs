use std::fmt::{Display, Formatter};

use crate::connection::Innovation;

pub type NodeId = usize;

pub fn sigmoid(z: f32) -> f32 {
    1.0 / (1.0 + (-z).exp())
}

/// A vertex of a genome's graph.
///
/// `outputs` lists the innovation numbers of the connections leaving this node. The
/// connections themselves live in the genome's connection map.
#[derive(Clone, Debug)]
pub struct Node {
    pub id: NodeId,
    pub layer: usize,
    /// Scratch value of the last forward pass.
    pub value: f32,
    pub outputs: Vec<Innovation>,
}

impl Display for Node {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!(
            "Node ({}) [{}] outgoing: {:?}",
            self.id, self.layer, self.outputs
        ))
    }
}

impl Node {
    pub fn new(id: NodeId, layer: usize) -> Self {
        Self {
            id,
            layer,
            value: 0.0,
            outputs: vec![],
        }
    }

    /// Same id, nothing else: layer 0, no value and no outgoing connections.
    pub fn blank(&self) -> Self {
        Self::new(self.id, 0)
    }

    pub fn add_connection(&mut self, innovation: Innovation) {
        self.outputs.push(innovation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sigmoid_is_centered() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(10.0) > 0.99);
        assert!(sigmoid(-10.0) < 0.01);
    }

    #[test]
    fn blank_keeps_only_the_id() {
        let mut node = Node::new(7, 3);
        node.value = 0.4;
        node.add_connection(12);
        let blank = node.blank();
        assert_eq!(blank.id, 7);
        assert_eq!(blank.layer, 0);
        assert_eq!(blank.value, 0.0);
        assert!(blank.outputs.is_empty());
    }
}
