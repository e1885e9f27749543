//! Ties a loaded LEFX file's pieces together and implements
//! `apply_extension`: diff-reconstruct each differential layer against
//! its base counterpart, then blend.
//!
//! Activation rules are not given a disk offset in the on-disk layout
//! (only per-layer `always`/`conditional` activation is, in
//! `LefxLayerHeader`) — the rule set itself is supplied out-of-band by
//! the caller to an [`crate::activation::ActivationManager`] and its
//! verdict passed in here as `extension_active`, rather than persisted
//! inside the file.

use libetude_lef::{LefHeader, ModelMeta};
use libetude_tensor::Tensor;

use crate::blend;
use crate::dependency::{self, ActiveExtensionInfo, LefxDependency};
use crate::diff;
use crate::error::{LefxError, LefxResult};
use crate::layer::LayerActivation;
use crate::loader::LoadedExtension;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionState {
    Inactive,
    Active,
}

/// A loaded extension plus the runtime state `apply_extension` mutates:
/// whether it is currently active and at what blend weight.
pub struct LefxExtension {
    loaded: LoadedExtension,
    pub state: ExtensionState,
    pub current_weight: f32,
}

impl LefxExtension {
    pub fn new(loaded: LoadedExtension) -> Self {
        Self { loaded, state: ExtensionState::Inactive, current_weight: 0.0 }
    }

    pub fn loaded(&self) -> &LoadedExtension {
        &self.loaded
    }

    pub fn id(&self) -> u32 {
        self.loaded.header().extension_id
    }

    pub fn is_active(&self) -> bool {
        self.state == ExtensionState::Active
    }

    /// Checks `base_header`/`base_meta` against this extension's
    /// declared compatibility range.
    pub fn check_compatible_with_base(&self, base_header: &LefHeader, base_meta: &ModelMeta) -> LefxResult<()> {
        self.loaded.header().check_compatible_with_base(base_header, base_meta)
    }

    pub fn resolve_dependencies(&self, others: &[ActiveExtensionInfo], own_load_order: i32) -> LefxResult<()> {
        let deps: Vec<LefxDependency> = self.loaded.dependencies().to_vec();
        let report = dependency::resolve(&deps, others, own_load_order);
        dependency::require_satisfied(&report)
    }
}

/// Effective (post-diff, post-blend) tensor for one base layer.
pub struct BlendedLayer {
    pub base_layer_id: u16,
    pub tensor: Tensor,
}

/// Sets `ext`'s state to active at `blend_weight`, then blends every
/// differential layer against its base counterpart fetched via
/// `fetch_base`. A layer whose header marks it `Conditional` is skipped
/// when `extension_active` is false; `Always` layers blend regardless
/// (`extension_active` only gates the extension's own active/inactive
/// state, not `Always` layers that should always apply once loaded).
pub fn apply_extension(ext: &mut LefxExtension, blend_weight: f32, extension_active: bool, fetch_base: impl Fn(u16) -> LefxResult<Tensor>) -> LefxResult<Vec<BlendedLayer>> {
    ext.state = if extension_active { ExtensionState::Active } else { ExtensionState::Inactive };
    ext.current_weight = blend_weight;

    let mut out = Vec::new();
    for layer_id in ext.loaded.layer_ids() {
        let (header, diff_bytes) = ext.loaded.get_layer(layer_id)?;
        if header.activation == LayerActivation::Conditional && !extension_active {
            continue;
        }

        let base = fetch_base(header.base_layer_id).map_err(|_| LefxError::BaseLayerNotFound(header.base_layer_id))?;
        let reconstructed = diff::reconstruct(&base, header.diff_encoding, &diff_bytes)?;
        let blended = blend::blend(&base, &reconstructed, header.blend_mode, header.blend_weight, header.blend_weight_secondary)?;
        out.push(BlendedLayer { base_layer_id: header.base_layer_id, tensor: blended });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::LefxExtensionType;
    use crate::layer::{BlendMode, DiffEncoding, QuantizationType};
    use crate::meta::LefxMeta;
    use crate::writer::{LefxLayerDescriptor, LefxWriter};
    use libetude_pool::Pool;
    use libetude_tensor::{DType, Shape};
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn test_pool() -> Arc<Mutex<Pool>> {
        Arc::new(Mutex::new(Pool::create(1 << 20, 32).unwrap()))
    }

    fn sample_extension() -> LefxExtension {
        let mut writer = LefxWriter::new(LefxMeta::new("pack", "1.0.0", "base"), LefxExtensionType::Speaker, 1, 0xdead_beef);
        writer
            .add_layer(LefxLayerDescriptor {
                extension_layer_id: 1,
                base_layer_id: 5,
                blend_mode: BlendMode::Add,
                diff_encoding: DiffEncoding::WeightDelta,
                activation: LayerActivation::Always,
                quantization_type: QuantizationType::None,
                similarity_threshold: 0.0,
                blend_weight: 1.0,
                blend_weight_secondary: 0.0,
                meta: vec![],
                diff_bytes: [1.0f32, 1.0].iter().flat_map(|f| f.to_le_bytes()).collect(),
            })
            .unwrap();
        let mut buf = Vec::new();
        writer.finish(&mut buf).unwrap();
        LefxExtension::new(LoadedExtension::from_bytes(buf).unwrap())
    }

    #[test]
    fn applies_always_layer_regardless_of_activation() {
        let pool = test_pool();
        let mut ext = sample_extension();
        let fetch = |layer_id: u16| -> LefxResult<Tensor> {
            assert_eq!(layer_id, 5);
            let t = Tensor::zeros(Arc::clone(&pool), Shape::new(vec![2]), DType::Float32)?;
            t.set_f32(&[0], 1.0);
            t.set_f32(&[1], 2.0);
            Ok(t)
        };
        let blended = apply_extension(&mut ext, 1.0, false, fetch).unwrap();
        assert_eq!(blended.len(), 1);
        assert_eq!(blended[0].base_layer_id, 5);
        assert_eq!(blended[0].tensor.get_f32(&[0]), 2.0);
        assert_eq!(blended[0].tensor.get_f32(&[1]), 3.0);
        assert!(ext.is_active());
    }

    #[test]
    fn missing_base_layer_is_reported() {
        let mut ext = sample_extension();
        let fetch = |_: u16| -> LefxResult<Tensor> { Err(LefxError::BaseLayerNotFound(0)) };
        assert!(matches!(apply_extension(&mut ext, 1.0, true, fetch), Err(LefxError::BaseLayerNotFound(5))));
    }
}
