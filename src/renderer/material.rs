//! Uniform block for the shared sphere material

use bytemuck::{Pod, Zeroable};

use crate::config::{MaterialParams, ScatteringParams};

/// Material + scattering scalars as laid out in `sphere_shader.wgsl`
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct MaterialUniform {
    pub metalness: f32,           // offset 0
    pub roughness: f32,           // offset 4
    pub clearcoat: f32,           // offset 8
    pub clearcoat_roughness: f32, // offset 12
    pub thickness_distortion: f32, // offset 16
    pub thickness_ambient: f32,   // offset 20
    pub thickness_attenuation: f32, // offset 24
    pub thickness_power: f32,     // offset 28
    pub thickness_scale: f32,     // offset 32
    _pad: [f32; 3],               // pad to 48 bytes
}

impl MaterialUniform {
    pub fn new(material: &MaterialParams, scattering: &ScatteringParams) -> Self {
        Self {
            // Keep the GGX lobe away from a zero-width highlight
            metalness: material.metalness.clamp(0.0, 1.0),
            roughness: material.roughness.clamp(0.04, 1.0),
            clearcoat: material.clearcoat.clamp(0.0, 1.0),
            clearcoat_roughness: material.clearcoat_roughness.clamp(0.04, 1.0),
            thickness_distortion: scattering.distortion,
            thickness_ambient: scattering.ambient,
            thickness_attenuation: scattering.attenuation,
            thickness_power: scattering.power,
            thickness_scale: scattering.scale,
            _pad: [0.0; 3],
        }
    }
}

impl Default for MaterialUniform {
    fn default() -> Self {
        Self::new(&MaterialParams::default(), &ScatteringParams::default())
    }
}
