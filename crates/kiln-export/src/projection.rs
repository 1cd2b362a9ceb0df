//! Per-target views of a material graph
//!
//! A projection walks back from the base shader inputs to the images that
//! drive them and keeps what the target format can represent.

use kiln_material::{ImageHandle, MaterialGraph, MaterialLink, MaterialNode, Socket};
use std::path::PathBuf;

/// Single-material view used by formats without node graphs
#[derive(Debug, Clone, PartialEq)]
pub struct FlatMaterial {
    pub name: String,
    pub base_color: [f32; 4],
    pub metallic: f32,
    pub roughness: f32,
    /// Albedo image, when base color is driven by one
    pub diffuse_map: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalTexture {
    pub path: PathBuf,
    pub strength: f32,
}

/// Metallic-roughness material with per-channel texture routing
#[derive(Debug, Clone, PartialEq)]
pub struct PbrMaterial {
    pub name: String,
    pub base_color_factor: [f32; 4],
    pub metallic_factor: f32,
    pub roughness_factor: f32,
    pub base_color_texture: Option<PathBuf>,
    pub normal_texture: Option<NormalTexture>,
    /// Roughness in G, metallic in B
    pub metallic_roughness_texture: Option<PathBuf>,
    /// Occlusion in R
    pub occlusion_texture: Option<PathBuf>,
}

impl PbrMaterial {
    /// Distinct texture files, in base color, normal, metallic-roughness,
    /// occlusion order
    pub fn textures(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = Vec::new();
        let all = [
            self.base_color_texture.as_ref(),
            self.normal_texture.as_ref().map(|n| &n.path),
            self.metallic_roughness_texture.as_ref(),
            self.occlusion_texture.as_ref(),
        ];
        for path in all.into_iter().flatten() {
            if !paths.contains(path) {
                paths.push(path.clone());
            }
        }
        paths
    }
}

/// Project onto a single flat material. Normal and ORM wiring are dropped.
pub fn project_flat(graph: &MaterialGraph) -> FlatMaterial {
    let shader = graph.base_shader();

    for (socket, what) in [
        (Socket::Normal, "normal map"),
        (Socket::Roughness, "roughness channel"),
        (Socket::Metallic, "metallic channel"),
        (Socket::Occlusion, "occlusion channel"),
    ] {
        if graph.shader_input(socket).is_some() {
            log::info!(
                "Material '{}': {} has no flat equivalent and is not exported",
                graph.name(),
                what
            );
        }
    }

    FlatMaterial {
        name: graph.name().to_string(),
        base_color: shader.base_color,
        metallic: shader.metallic,
        roughness: shader.roughness,
        diffuse_map: driving_image(graph, Socket::BaseColor).map(|(image, _)| image.path().to_path_buf()),
    }
}

/// Project onto a metallic-roughness PBR material
pub fn project_pbr(graph: &MaterialGraph) -> PbrMaterial {
    let shader = graph.base_shader();

    let base_color_texture =
        driving_image(graph, Socket::BaseColor).map(|(image, _)| image.path().to_path_buf());

    let normal_texture = graph
        .shader_input(Socket::Normal)
        .and_then(|(link, node)| {
            let strength = match node {
                MaterialNode::NormalMap { strength } => *strength,
                _ => 1.0,
            };
            trace_image(graph, link).map(|(image, _)| NormalTexture {
                path: image.path().to_path_buf(),
                strength,
            })
        });

    let roughness = driving_image(graph, Socket::Roughness);
    let metallic = driving_image(graph, Socket::Metallic);
    let metallic_roughness_texture = match (roughness, metallic) {
        (Some((r, Some(Socket::G))), Some((m, Some(Socket::B)))) if r.path() == m.path() => {
            Some(r.path().to_path_buf())
        }
        (None, None) => None,
        (r, m) => {
            // Fall back to whichever image is present; its channels are used as-is
            let image = r.or(m).map(|(image, _)| image.path().to_path_buf());
            log::warn!(
                "Material '{}': roughness and metallic are not packed as G/B of one image; \
                 using {:?} as the metallic-roughness texture",
                graph.name(),
                image
            );
            image
        }
    };

    let occlusion_texture =
        driving_image(graph, Socket::Occlusion).map(|(image, _)| image.path().to_path_buf());

    PbrMaterial {
        name: graph.name().to_string(),
        base_color_factor: if base_color_texture.is_some() {
            [1.0; 4]
        } else {
            shader.base_color
        },
        metallic_factor: if metallic_roughness_texture.is_some() {
            1.0
        } else {
            shader.metallic
        },
        roughness_factor: if metallic_roughness_texture.is_some() {
            1.0
        } else {
            shader.roughness
        },
        base_color_texture,
        normal_texture,
        metallic_roughness_texture,
        occlusion_texture,
    }
}

/// The image behind a base shader input and the channel it is read from
fn driving_image(graph: &MaterialGraph, socket: Socket) -> Option<(&ImageHandle, Option<Socket>)> {
    let (link, _) = graph.shader_input(socket)?;
    trace_image(graph, link)
}

/// Follow a link upstream until an image node is reached
fn trace_image<'g>(
    graph: &'g MaterialGraph,
    link: &'g MaterialLink,
) -> Option<(&'g ImageHandle, Option<Socket>)> {
    let mut channel = None;
    let mut current = link;
    // At most one hop per node, even if links form a cycle
    for _ in 0..graph.node_count() {
        match graph.node(current.from)? {
            MaterialNode::ImageSample { image, .. } => return Some((image, channel)),
            MaterialNode::ChannelSplit => {
                channel = Some(current.from_socket);
                current = graph.source_of(current.from, Socket::Image)?;
            }
            MaterialNode::NormalMap { .. } => {
                current = graph.source_of(current.from, Socket::Color)?;
            }
            MaterialNode::BaseShader(_) => return None,
        }
    }
    None
}
