//! Typed node/link model of a PBR shading network

use crate::loader::ImageHandle;
use crate::shader::BaseShader;
use kiln_core::{KilnError, MaterialHandle, NodeId};
use std::fmt;
use thiserror::Error;

/// Named input or output of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Socket {
    Color,
    Image,
    Normal,
    R,
    G,
    B,
    BaseColor,
    Roughness,
    Metallic,
    Occlusion,
}

impl fmt::Display for Socket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Socket::Color => "Color",
            Socket::Image => "Image",
            Socket::Normal => "Normal",
            Socket::R => "R",
            Socket::G => "G",
            Socket::B => "B",
            Socket::BaseColor => "Base Color",
            Socket::Roughness => "Roughness",
            Socket::Metallic => "Metallic",
            Socket::Occlusion => "Occlusion",
        };
        f.write_str(name)
    }
}

/// How sampled texels are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    /// Display color, decoded from sRGB
    Color,
    /// Raw data such as normal vectors, read without any transform
    NonColor,
}

/// A node in a material graph
#[derive(Debug, Clone, PartialEq)]
pub enum MaterialNode {
    ImageSample {
        image: ImageHandle,
        colorspace: ColorSpace,
    },
    NormalMap {
        strength: f32,
    },
    ChannelSplit,
    BaseShader(BaseShader),
}

impl MaterialNode {
    pub fn inputs(&self) -> &'static [Socket] {
        match self {
            MaterialNode::ImageSample { .. } => &[],
            MaterialNode::NormalMap { .. } => &[Socket::Color],
            MaterialNode::ChannelSplit => &[Socket::Image],
            MaterialNode::BaseShader(shader) => shader.inputs(),
        }
    }

    pub fn outputs(&self) -> &'static [Socket] {
        match self {
            MaterialNode::ImageSample { .. } => &[Socket::Color],
            MaterialNode::NormalMap { .. } => &[Socket::Normal],
            MaterialNode::ChannelSplit => &[Socket::R, Socket::G, Socket::B],
            MaterialNode::BaseShader(_) => &[],
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            MaterialNode::ImageSample { .. } => "ImageSample",
            MaterialNode::NormalMap { .. } => "NormalMap",
            MaterialNode::ChannelSplit => "ChannelSplit",
            MaterialNode::BaseShader(_) => "BaseShader",
        }
    }

    /// The sampled image, if this is an image node
    pub fn image(&self) -> Option<&ImageHandle> {
        match self {
            MaterialNode::ImageSample { image, .. } => Some(image),
            _ => None,
        }
    }
}

/// Directed edge from an output socket to an input socket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaterialLink {
    pub from: NodeId,
    pub from_socket: Socket,
    pub to: NodeId,
    pub to_socket: Socket,
}

/// Structural errors raised while editing a graph
#[derive(Debug, Error, PartialEq)]
pub enum GraphError {
    #[error("node {0} does not exist")]
    UnknownNode(NodeId),

    #[error("{kind} node {node} has no output '{socket}'")]
    NoSuchOutput {
        node: NodeId,
        kind: &'static str,
        socket: Socket,
    },

    #[error("{kind} node {node} has no input '{socket}'")]
    NoSuchInput {
        node: NodeId,
        kind: &'static str,
        socket: Socket,
    },

    #[error("a material graph holds exactly one base shader")]
    SecondBaseShader,
}

impl From<GraphError> for KilnError {
    fn from(err: GraphError) -> Self {
        KilnError::GraphSynthesis(err.to_string())
    }
}

/// Nodes and links of one material.
///
/// The base shader is created with the graph and is always node `#0`.
/// Each input socket has at most one incoming link; linking into an
/// occupied socket replaces the existing link.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialGraph {
    name: String,
    nodes: Vec<MaterialNode>,
    links: Vec<MaterialLink>,
}

impl MaterialGraph {
    pub fn new(name: impl Into<String>, shader: BaseShader) -> Self {
        Self {
            name: name.into(),
            nodes: vec![MaterialNode::BaseShader(shader)],
            links: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Handle used to place this material in object slots
    pub fn handle(&self) -> MaterialHandle {
        MaterialHandle::new(self.name.clone())
    }

    pub fn shader_id(&self) -> NodeId {
        NodeId::from_raw(0)
    }

    pub fn base_shader(&self) -> &BaseShader {
        match &self.nodes[0] {
            MaterialNode::BaseShader(shader) => shader,
            _ => unreachable!("node #0 is always the base shader"),
        }
    }

    pub fn add_node(&mut self, node: MaterialNode) -> Result<NodeId, GraphError> {
        if matches!(node, MaterialNode::BaseShader(_)) {
            return Err(GraphError::SecondBaseShader);
        }
        let id = NodeId::from_raw(self.nodes.len() as u32);
        self.nodes.push(node);
        Ok(id)
    }

    pub fn link(
        &mut self,
        from: NodeId,
        from_socket: Socket,
        to: NodeId,
        to_socket: Socket,
    ) -> Result<(), GraphError> {
        let source = self.node(from).ok_or(GraphError::UnknownNode(from))?;
        if !source.outputs().contains(&from_socket) {
            return Err(GraphError::NoSuchOutput {
                node: from,
                kind: source.kind_name(),
                socket: from_socket,
            });
        }
        let dest = self.node(to).ok_or(GraphError::UnknownNode(to))?;
        if !dest.inputs().contains(&to_socket) {
            return Err(GraphError::NoSuchInput {
                node: to,
                kind: dest.kind_name(),
                socket: to_socket,
            });
        }

        self.links
            .retain(|l| !(l.to == to && l.to_socket == to_socket));
        self.links.push(MaterialLink {
            from,
            from_socket,
            to,
            to_socket,
        });
        Ok(())
    }

    pub fn node(&self, id: NodeId) -> Option<&MaterialNode> {
        self.nodes.get(id.index())
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &MaterialNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (NodeId::from_raw(i as u32), n))
    }

    pub fn links(&self) -> &[MaterialLink] {
        &self.links
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// The link feeding an input socket
    pub fn source_of(&self, to: NodeId, to_socket: Socket) -> Option<&MaterialLink> {
        self.links
            .iter()
            .find(|l| l.to == to && l.to_socket == to_socket)
    }

    /// Links leaving an output socket
    pub fn links_from(&self, from: NodeId, from_socket: Socket) -> impl Iterator<Item = &MaterialLink> {
        self.links
            .iter()
            .filter(move |l| l.from == from && l.from_socket == from_socket)
    }

    /// Follow the link into a base shader input back to its source node
    pub fn shader_input(&self, socket: Socket) -> Option<(&MaterialLink, &MaterialNode)> {
        let link = self.source_of(self.shader_id(), socket)?;
        let node = self.node(link.from)?;
        Some((link, node))
    }
}
