//! Base shader and the shader models that provide it

use crate::graph::Socket;

const INPUTS: &[Socket] = &[
    Socket::BaseColor,
    Socket::Normal,
    Socket::Roughness,
    Socket::Metallic,
];

const INPUTS_WITH_OCCLUSION: &[Socket] = &[
    Socket::BaseColor,
    Socket::Normal,
    Socket::Roughness,
    Socket::Metallic,
    Socket::Occlusion,
];

/// Metallic-roughness surface shader with its unlinked parameter values
#[derive(Debug, Clone, PartialEq)]
pub struct BaseShader {
    pub base_color: [f32; 4],
    pub metallic: f32,
    pub roughness: f32,
    occlusion_input: bool,
}

impl Default for BaseShader {
    fn default() -> Self {
        Self {
            base_color: [0.8, 0.8, 0.8, 1.0],
            metallic: 0.0,
            roughness: 0.5,
            occlusion_input: false,
        }
    }
}

impl BaseShader {
    pub fn inputs(&self) -> &'static [Socket] {
        if self.occlusion_input {
            INPUTS_WITH_OCCLUSION
        } else {
            INPUTS
        }
    }

    pub fn has_input(&self, socket: Socket) -> bool {
        self.inputs().contains(&socket)
    }
}

/// Source of the base shader a synthesized material is built around.
///
/// Synthesis asks the model for its shader instead of looking one up by
/// display name; a model that cannot provide one makes synthesis fail.
pub trait ShaderModel {
    fn name(&self) -> &str;

    fn base_shader(&self) -> Option<BaseShader>;
}

/// The glTF-style metallic-roughness model
#[derive(Debug, Clone, Copy, Default)]
pub struct MetallicRoughness {
    occlusion: bool,
}

impl MetallicRoughness {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expose an `Occlusion` input so the ORM red channel can be wired
    pub fn with_occlusion(mut self, occlusion: bool) -> Self {
        self.occlusion = occlusion;
        self
    }
}

impl ShaderModel for MetallicRoughness {
    fn name(&self) -> &str {
        "metallic-roughness"
    }

    fn base_shader(&self) -> Option<BaseShader> {
        Some(BaseShader {
            occlusion_input: self.occlusion,
            ..BaseShader::default()
        })
    }
}
