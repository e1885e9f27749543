//! The `Engine` facade: a single handle that owns a pool manager, the
//! loaded base model's layer tensors, zero or more active extensions,
//! and (once built) a graph to execute. Design Notes call for exactly
//! this: "a thin Engine handle groups them" in place of the platform
//! factory singletons the teacher's C reimplementation uses.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;

use libetude_graph::{CancellationToken, Graph, OperatorRegistry};
use libetude_lef::{FullModel, LefHeader, LefModel, ModelMeta};
use libetude_lefx::{ActiveExtensionInfo, DependencyType, LefxExtension, LoadedExtension, apply_extension as lefx_apply_extension};
use libetude_pool::{Pool, PoolKind, PoolManager, PoolManagerConfig};
use libetude_tensor::{DType, Shape, Tensor};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};

struct LoadedExtensionSlot {
    extension: LefxExtension,
    load_order: i32,
}

/// Owns exactly what spec.md's flow diagram names: a base model's
/// layers (backed by the engine's own tensor pool, separate from
/// [`PoolManager`]'s analysis/synthesis/cache pools), any LEFX
/// extensions layered on top, and an optional graph built against them.
pub struct Engine {
    config: EngineConfig,
    pools: PoolManager,
    tensor_pool: Arc<Mutex<Pool>>,
    registry: Arc<OperatorRegistry>,
    model: Option<FullModel>,
    base_header: Option<LefHeader>,
    base_meta: Option<ModelMeta>,
    layers: HashMap<u16, Tensor>,
    extensions: Vec<LoadedExtensionSlot>,
    graph: Option<Graph>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        let pools = PoolManager::new(PoolManagerConfig {
            analysis_size: config.max_pool_sizes.analysis,
            synthesis_size: config.max_pool_sizes.synthesis,
            cache_size: config.max_pool_sizes.cache,
            alignment: config.simd_alignment as usize,
            ..PoolManagerConfig::default()
        })?;
        let tensor_pool = Arc::new(Mutex::new(Pool::create(config.max_pool_sizes.synthesis, config.simd_alignment as usize)?));
        Ok(Self {
            config,
            pools,
            tensor_pool,
            registry: Arc::new(OperatorRegistry::with_builtins()),
            model: None,
            base_header: None,
            base_meta: None,
            layers: HashMap::new(),
            extensions: Vec::new(),
            graph: None,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn pools(&self) -> &PoolManager {
        &self.pools
    }

    pub fn pools_mut(&mut self) -> &mut PoolManager {
        &mut self.pools
    }

    /// Periodic housekeeping: advances the pool manager's clock (driving
    /// idle-cache reset) and, if `compaction_enabled`, coalesces every
    /// pool's free blocks in place. A caller drives this from whatever
    /// cadence its platform layer already uses to call
    /// `advance_clock_ms` — there is no internal timer (spec.md §6: the
    /// engine core has no wall-clock of its own).
    pub fn run_maintenance(&mut self, delta_ms: u64) {
        self.pools.advance_clock_ms(delta_ms);
        if self.config.compaction_enabled {
            self.pools.compact(PoolKind::Analysis);
            self.pools.compact(PoolKind::Synthesis);
            self.pools.compact(PoolKind::Cache);
        }
    }

    /// Opens a LEF file, verifies it, and loads every layer into a flat
    /// `Float32` tensor backed by this engine's tensor pool. Per-layer
    /// quantization metadata is not exposed by [`LefModel::get_layer_data`],
    /// so dequantization to `Float32` at load time is the only option
    /// this facade offers; a quantization-aware loader would need the
    /// base crate to surface `LayerHeader` per layer, not just bytes.
    pub fn load_model(&mut self, path: impl AsRef<Path>) -> EngineResult<()> {
        let mut model = FullModel::open(path)?;
        model.verify_file_integrity()?;

        let mut layers = HashMap::new();
        for layer_id in model.layer_ids() {
            let bytes = model.get_layer_data(layer_id)?;
            let numel = bytes.len() / DType::Float32.bytes_for(1);
            let tensor = Tensor::create(Arc::clone(&self.tensor_pool), Shape::new(vec![numel]), DType::Float32)?;
            tensor.with_bytes_mut(|dst| dst.copy_from_slice(&bytes));
            layers.insert(layer_id, tensor);
        }

        self.base_header = Some(*model.header());
        self.base_meta = Some(model.meta().clone());
        self.model = Some(model);
        self.layers = layers;
        Ok(())
    }

    pub fn layer(&self, layer_id: u16) -> Option<&Tensor> {
        self.layers.get(&layer_id)
    }

    pub fn layer_ids(&self) -> Vec<u16> {
        let mut ids: Vec<u16> = self.layers.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Loads a LEFX file, checks its compatibility against the already
    /// loaded base model, resolves its dependencies against every other
    /// currently loaded extension, then blends its differential layers
    /// into the base model's layer tensors in place.
    ///
    /// `extension_active` is the caller's (or an
    /// [`libetude_lefx::ActivationManager`]'s) verdict on whether the
    /// extension should be considered active for this call — activation
    /// rules are not part of the LEFX on-disk format, so this facade
    /// does not evaluate them itself.
    pub fn apply_extension(&mut self, path: impl AsRef<Path>, blend_weight: f32, extension_active: bool) -> EngineResult<()> {
        let base_header = self.base_header.ok_or_else(|| EngineError::Runtime("apply_extension called before load_model".to_string()))?;
        let base_meta = self.base_meta.clone().ok_or_else(|| EngineError::Runtime("apply_extension called before load_model".to_string()))?;

        let loaded = LoadedExtension::open(path)?;
        let mut ext = LefxExtension::new(loaded);
        ext.check_compatible_with_base(&base_header, &base_meta)?;

        let own_load_order = self.extensions.len() as i32;
        let others: Vec<ActiveExtensionInfo> = self
            .extensions
            .iter()
            .map(|slot| ActiveExtensionInfo {
                id: slot.extension.id(),
                version: (slot.extension.loaded().header().version_major, slot.extension.loaded().header().version_minor),
                active: slot.extension.is_active(),
                load_order: slot.load_order,
            })
            .collect();
        ext.resolve_dependencies(&others, own_load_order)?;

        let layers = &self.layers;
        let blended = lefx_apply_extension(&mut ext, blend_weight, extension_active, |base_layer_id| {
            layers.get(&base_layer_id).cloned().ok_or(libetude_lefx::LefxError::BaseLayerNotFound(base_layer_id))
        })?;

        for layer in blended {
            self.layers.insert(layer.base_layer_id, layer.tensor);
        }

        if let Some(existing) = self.extensions.iter_mut().find(|slot| slot.extension.id() == ext.id()) {
            existing.extension = ext;
        } else {
            self.extensions.push(LoadedExtensionSlot { extension: ext, load_order: own_load_order });
        }
        Ok(())
    }

    pub fn active_extension_ids(&self) -> Vec<u32> {
        self.extensions.iter().filter(|slot| slot.extension.is_active()).map(|slot| slot.extension.id()).collect()
    }

    /// Creates a graph of `pool_size` bytes for this engine's registry,
    /// with its parallel threshold tuned by `worker_count`.
    pub fn build_graph(&mut self, name: impl Into<String>, pool_size: usize) -> EngineResult<()> {
        let mut graph = Graph::create(name, Arc::clone(&self.registry), pool_size, self.config.simd_alignment)?;
        if self.config.worker_count > 1 {
            graph.set_parallel_threshold(self.config.worker_count);
        }
        self.graph = Some(graph);
        Ok(())
    }

    pub fn graph(&self) -> Option<&Graph> {
        self.graph.as_ref()
    }

    pub fn graph_mut(&mut self) -> Option<&mut Graph> {
        self.graph.as_mut()
    }

    /// Runs the built graph against `inputs`. Parallel execution is
    /// chosen automatically by `Graph::execute` once the node count
    /// crosses the threshold set in `build_graph`.
    pub fn infer(&mut self, inputs: &[Tensor]) -> EngineResult<Vec<Tensor>> {
        let graph = self.graph.as_mut().ok_or_else(|| EngineError::Runtime("infer called before build_graph".to_string()))?;
        Ok(graph.execute(inputs)?)
    }

    pub fn infer_with_cancellation(&mut self, inputs: &[Tensor], cancel: &CancellationToken) -> EngineResult<Vec<Tensor>> {
        let graph = self.graph.as_mut().ok_or_else(|| EngineError::Runtime("infer called before build_graph".to_string()))?;
        Ok(graph.execute_with_cancellation(inputs, cancel)?)
    }
}

/// Reports whether a `DependencyType::Conflict` entry active anywhere
/// in `extensions` would block loading an extension declaring `id` as a
/// conflict — exposed for callers that want to pre-flight a dependency
/// check before calling [`Engine::apply_extension`] at all.
pub fn would_conflict(extensions: &[ActiveExtensionInfo], dep_type: DependencyType, id: u32) -> bool {
    matches!(dep_type, DependencyType::Conflict) && extensions.iter().any(|e| e.id == id && e.active)
}

#[cfg(test)]
mod tests {
    use super::*;
    use libetude_lef::{LayerDataDescriptor, LayerKind, LefWriter, QuantizationType};
    use libetude_lefx::{BlendMode, DiffEncoding, LayerActivation, LefxExtensionType, LefxLayerDescriptor, LefxMeta, LefxWriter};
    use std::io::Write;
    use tempfile_free_helpers::write_temp;

    mod tempfile_free_helpers {
        use std::path::PathBuf;

        /// Writes `bytes` to a uniquely-named file under the system
        /// temp directory. No `tempfile` crate dependency for one test
        /// helper; the file is left behind (tests run in disposable CI
        /// containers), same tradeoff the teacher's own test fixtures
        /// make for throwaway on-disk artifacts.
        pub fn write_temp(name: &str, bytes: &[u8]) -> PathBuf {
            let mut path = std::env::temp_dir();
            path.push(format!("libetude-engine-test-{name}-{}", std::process::id()));
            std::fs::write(&path, bytes).unwrap();
            path
        }
    }

    fn sample_model_path() -> std::path::PathBuf {
        let mut writer = LefWriter::new(ModelMeta::new("TestModel", "1.0.0"));
        writer
            .add_layer(LayerDataDescriptor {
                layer_id: 1,
                layer_kind: LayerKind::Linear,
                quantization_type: QuantizationType::None,
                meta: vec![],
                weights: [1.0f32, 2.0, 3.0, 4.0, 5.0].iter().flat_map(|f| f.to_le_bytes()).collect(),
            })
            .unwrap();
        let mut buf = Vec::new();
        writer.finish(&mut buf).unwrap();
        write_temp("model", &buf)
    }

    #[test]
    fn loads_a_model_and_exposes_its_layers_as_tensors() {
        let path = sample_model_path();
        let mut engine = Engine::new(EngineConfig::default()).unwrap();
        engine.load_model(&path).unwrap();
        assert_eq!(engine.layer_ids(), vec![1]);
        let tensor = engine.layer(1).unwrap();
        assert_eq!(tensor.get_f32(&[0]), 1.0);
        assert_eq!(tensor.get_f32(&[4]), 5.0);
    }

    #[test]
    fn apply_extension_blends_a_differential_layer_into_the_base() {
        let model_path = sample_model_path();
        let mut engine = Engine::new(EngineConfig::default()).unwrap();
        engine.load_model(&model_path).unwrap();

        let base_hash = engine.base_meta.as_ref().unwrap().hash();
        let mut ext_writer = LefxWriter::new(LefxMeta::new("pack", "1.0.0", "TestModel"), LefxExtensionType::Speaker, 9, base_hash);
        ext_writer
            .add_layer(LefxLayerDescriptor {
                extension_layer_id: 1,
                base_layer_id: 1,
                blend_mode: BlendMode::Add,
                diff_encoding: DiffEncoding::WeightDelta,
                activation: LayerActivation::Always,
                quantization_type: QuantizationType::None,
                similarity_threshold: 0.0,
                blend_weight: 1.0,
                blend_weight_secondary: 0.0,
                meta: vec![],
                diff_bytes: [1.0f32, 1.0, 1.0, 1.0, 1.0].iter().flat_map(|f| f.to_le_bytes()).collect(),
            })
            .unwrap();
        let mut ext_buf = Vec::new();
        ext_writer.finish(&mut ext_buf).unwrap();
        let ext_path = tempfile_free_helpers::write_temp("ext", &ext_buf);

        engine.apply_extension(&ext_path, 1.0, true).unwrap();
        let tensor = engine.layer(1).unwrap();
        assert_eq!(tensor.get_f32(&[0]), 2.0);
        assert_eq!(tensor.get_f32(&[4]), 6.0);
        assert_eq!(engine.active_extension_ids(), vec![9]);
    }

    #[test]
    fn run_maintenance_compacts_pools_when_enabled() {
        let mut engine = Engine::new(EngineConfig { compaction_enabled: true, ..EngineConfig::default() }).unwrap();
        let a = engine.pools_mut().alloc(PoolKind::Analysis, 128).unwrap();
        let b = engine.pools_mut().alloc(PoolKind::Analysis, 128).unwrap();
        engine.pools_mut().free(PoolKind::Analysis, a).unwrap();
        engine.run_maintenance(0);
        // Compacting never relocates a live allocation.
        assert!(engine.pools().get(PoolKind::Analysis, &b).is_ok());
    }

    #[test]
    fn run_maintenance_skips_compaction_when_disabled() {
        let mut engine = Engine::new(EngineConfig { compaction_enabled: false, ..EngineConfig::default() }).unwrap();
        let stats_before = engine.pools().stats(PoolKind::Analysis);
        engine.run_maintenance(0);
        let stats_after = engine.pools().stats(PoolKind::Analysis);
        assert_eq!(stats_before, stats_after);
    }

    #[test]
    fn build_graph_and_infer_runs_a_linear_node() {
        use libetude_graph::OperatorParams;

        let path = sample_model_path();
        let mut engine = Engine::new(EngineConfig::default()).unwrap();
        engine.load_model(&path).unwrap();
        engine.build_graph("g", 1 << 16).unwrap();

        let graph = engine.graph_mut().unwrap();
        let x_node = graph.add_node("linear", vec![], OperatorParams::new()).unwrap();
        let weight_node = graph.add_node("linear", vec![], OperatorParams::new()).unwrap();
        graph.mark_input(x_node).unwrap();
        graph.mark_input(weight_node).unwrap();
        let linear = graph.add_node("linear", vec![x_node, weight_node], OperatorParams::new()).unwrap();
        graph.mark_output(linear).unwrap();
        graph.topological_sort().unwrap();

        let pool = graph.pool();
        let x = Tensor::zeros(Arc::clone(&pool), Shape::new(vec![1, 2]), DType::Float32).unwrap();
        x.set_f32(&[0, 0], 1.0);
        x.set_f32(&[0, 1], 2.0);
        let weight = Tensor::zeros(pool, Shape::new(vec![3, 2]), DType::Float32).unwrap();
        for o in 0..3 {
            weight.set_f32(&[o, 0], 1.0);
            weight.set_f32(&[o, 1], 1.0);
        }

        let outputs = engine.infer(&[x, weight]).unwrap();
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].shape().dims(), &[1, 3]);
        assert_eq!(outputs[0].get_f32(&[0, 0]), 3.0);
    }
}
