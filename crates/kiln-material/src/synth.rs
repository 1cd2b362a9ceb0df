//! Build a material graph from discovered textures

use crate::graph::{ColorSpace, MaterialGraph, MaterialNode, Socket};
use crate::loader::ImageLoader;
use crate::shader::ShaderModel;
use kiln_asset::{TextureCandidate, TextureSet};
use kiln_core::{KilnError, NodeId, Result};

/// Wires discovered texture maps into a base shader.
///
/// Images are loaded only for the roles present in the texture set. The
/// graph is assembled locally and returned only when every step succeeds.
pub struct MaterialSynthesizer<'a> {
    loader: &'a dyn ImageLoader,
}

impl<'a> MaterialSynthesizer<'a> {
    pub fn new(loader: &'a dyn ImageLoader) -> Self {
        Self { loader }
    }

    pub fn synthesize(
        &self,
        name: &str,
        textures: &TextureSet,
        model: &dyn ShaderModel,
    ) -> Result<MaterialGraph> {
        let shader = model.base_shader().ok_or_else(|| {
            KilnError::GraphSynthesis(format!(
                "shader model '{}' does not provide a base shader",
                model.name()
            ))
        })?;
        let mut graph = MaterialGraph::new(name, shader);
        let shader_id = graph.shader_id();

        if let Some(albedo) = textures.albedo() {
            let tex = self.sample(&mut graph, albedo, ColorSpace::Color)?;
            graph.link(tex, Socket::Color, shader_id, Socket::BaseColor)?;
        }

        if let Some(normal) = textures.normal() {
            // Normal maps are vector data; a color transform would corrupt them
            let tex = self.sample(&mut graph, normal, ColorSpace::NonColor)?;
            let normal_map = graph.add_node(MaterialNode::NormalMap { strength: 1.0 })?;
            graph.link(tex, Socket::Color, normal_map, Socket::Color)?;
            graph.link(normal_map, Socket::Normal, shader_id, Socket::Normal)?;
        }

        if let Some(orm) = textures.orm() {
            let tex = self.sample(&mut graph, orm, ColorSpace::Color)?;
            let split = graph.add_node(MaterialNode::ChannelSplit)?;
            graph.link(tex, Socket::Color, split, Socket::Image)?;
            graph.link(split, Socket::G, shader_id, Socket::Roughness)?;
            graph.link(split, Socket::B, shader_id, Socket::Metallic)?;

            if graph.base_shader().has_input(Socket::Occlusion) {
                graph.link(split, Socket::R, shader_id, Socket::Occlusion)?;
            } else {
                log::debug!(
                    "Occlusion channel of {} left unconnected; {} has no occlusion input",
                    orm.file_name(),
                    model.name()
                );
            }
        }

        log::info!(
            "Synthesized material '{}': {} node(s), {} link(s)",
            graph.name(),
            graph.node_count(),
            graph.link_count()
        );
        Ok(graph)
    }

    fn sample(
        &self,
        graph: &mut MaterialGraph,
        texture: &TextureCandidate,
        colorspace: ColorSpace,
    ) -> Result<NodeId> {
        let image = self.loader.load_image(texture.path())?;
        Ok(graph.add_node(MaterialNode::ImageSample { image, colorspace })?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::ImageHandle;
    use crate::shader::{BaseShader, MetallicRoughness};
    use kiln_asset::TextureRole;
    use std::cell::RefCell;
    use std::path::{Path, PathBuf};

    /// Records every path it is asked to load
    #[derive(Default)]
    struct RecordingLoader {
        loaded: RefCell<Vec<PathBuf>>,
    }

    impl ImageLoader for RecordingLoader {
        fn load_image(&self, path: &Path) -> Result<ImageHandle> {
            self.loaded.borrow_mut().push(path.to_path_buf());
            Ok(ImageHandle::new(path.to_path_buf(), 16, 16))
        }
    }

    struct FailingLoader;

    impl ImageLoader for FailingLoader {
        fn load_image(&self, path: &Path) -> Result<ImageHandle> {
            Err(KilnError::GraphSynthesis(format!("cannot read {}", path.display())))
        }
    }

    struct NoShader;

    impl ShaderModel for NoShader {
        fn name(&self) -> &str {
            "unlit"
        }

        fn base_shader(&self) -> Option<BaseShader> {
            None
        }
    }

    fn textures(roles: &[(&str, TextureRole)]) -> TextureSet {
        let mut set = TextureSet::new();
        for (path, role) in roles {
            set.insert(TextureCandidate::new(*path, *role));
        }
        set
    }

    fn colorspace_of(graph: &MaterialGraph, socket_owner: NodeId) -> ColorSpace {
        match graph.node(socket_owner).unwrap() {
            MaterialNode::ImageSample { colorspace, .. } => *colorspace,
            other => panic!("expected image node, got {}", other.kind_name()),
        }
    }

    #[test]
    fn test_no_textures_gives_bare_shader() {
        let loader = RecordingLoader::default();
        let graph = MaterialSynthesizer::new(&loader)
            .synthesize("mat", &TextureSet::new(), &MetallicRoughness::new())
            .unwrap();

        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.link_count(), 0);
        assert!(loader.loaded.borrow().is_empty());
    }

    #[test]
    fn test_albedo_only() {
        let loader = RecordingLoader::default();
        let set = textures(&[("/t/gold_albedo.png", TextureRole::Albedo)]);
        let graph = MaterialSynthesizer::new(&loader)
            .synthesize("mat", &set, &MetallicRoughness::new())
            .unwrap();

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.link_count(), 1);
        let (link, node) = graph.shader_input(Socket::BaseColor).unwrap();
        assert_eq!(link.from_socket, Socket::Color);
        assert_eq!(colorspace_of(&graph, link.from), ColorSpace::Color);
        assert_eq!(node.image().unwrap().path(), Path::new("/t/gold_albedo.png"));
    }

    #[test]
    fn test_normal_only_uses_non_color() {
        let loader = RecordingLoader::default();
        let set = textures(&[("/t/gold_normal.png", TextureRole::Normal)]);
        let graph = MaterialSynthesizer::new(&loader)
            .synthesize("mat", &set, &MetallicRoughness::new())
            .unwrap();

        assert_eq!(graph.node_count(), 1 + 2);
        assert_eq!(graph.link_count(), 2);

        let (shader_link, normal_map) = graph.shader_input(Socket::Normal).unwrap();
        assert_eq!(normal_map.kind_name(), "NormalMap");
        let tex_link = graph.source_of(shader_link.from, Socket::Color).unwrap();
        assert_eq!(colorspace_of(&graph, tex_link.from), ColorSpace::NonColor);
    }

    #[test]
    fn test_orm_only_leaves_red_unlinked() {
        let loader = RecordingLoader::default();
        let set = textures(&[("/t/gold_orm.png", TextureRole::Orm)]);
        let graph = MaterialSynthesizer::new(&loader)
            .synthesize("mat", &set, &MetallicRoughness::new())
            .unwrap();

        assert_eq!(graph.node_count(), 1 + 2);
        assert_eq!(graph.link_count(), 3);

        let (rough, split) = graph.shader_input(Socket::Roughness).unwrap();
        assert_eq!(split.kind_name(), "ChannelSplit");
        assert_eq!(rough.from_socket, Socket::G);
        let (metal, _) = graph.shader_input(Socket::Metallic).unwrap();
        assert_eq!(metal.from_socket, Socket::B);
        assert_eq!(metal.from, rough.from);

        assert_eq!(graph.links_from(rough.from, Socket::R).count(), 0);
        assert!(graph.source_of(rough.from, Socket::Image).is_some());
    }

    #[test]
    fn test_orm_wires_occlusion_when_shader_has_input() {
        let loader = RecordingLoader::default();
        let set = textures(&[("/t/gold_orm.png", TextureRole::Orm)]);
        let graph = MaterialSynthesizer::new(&loader)
            .synthesize("mat", &set, &MetallicRoughness::new().with_occlusion(true))
            .unwrap();

        assert_eq!(graph.link_count(), 4);
        let (occlusion, _) = graph.shader_input(Socket::Occlusion).unwrap();
        assert_eq!(occlusion.from_socket, Socket::R);
    }

    #[test]
    fn test_full_set_loads_each_image_once() {
        let loader = RecordingLoader::default();
        let set = textures(&[
            ("/t/a_albedo.png", TextureRole::Albedo),
            ("/t/a_normal.png", TextureRole::Normal),
            ("/t/a_orm.png", TextureRole::Orm),
        ]);
        let graph = MaterialSynthesizer::new(&loader)
            .synthesize("mat", &set, &MetallicRoughness::new())
            .unwrap();

        assert_eq!(graph.node_count(), 6);
        assert_eq!(graph.link_count(), 6);
        assert_eq!(loader.loaded.borrow().len(), 3);
    }

    #[test]
    fn test_missing_base_shader_fails() {
        let loader = RecordingLoader::default();
        let set = textures(&[("/t/a_albedo.png", TextureRole::Albedo)]);
        let result = MaterialSynthesizer::new(&loader).synthesize("mat", &set, &NoShader);

        assert!(matches!(result, Err(KilnError::GraphSynthesis(_))));
        assert!(loader.loaded.borrow().is_empty());
    }

    #[test]
    fn test_image_failure_returns_no_graph() {
        let set = textures(&[("/t/a_albedo.png", TextureRole::Albedo)]);
        let result =
            MaterialSynthesizer::new(&FailingLoader).synthesize("mat", &set, &MetallicRoughness::new());
        assert!(matches!(result, Err(KilnError::GraphSynthesis(_))));
    }
}
