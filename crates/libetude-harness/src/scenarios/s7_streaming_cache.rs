use libetude_lef::{LayerDataDescriptor, LayerKind, LefWriter, ModelMeta, QuantizationType, StreamingModel};

use crate::error::{HarnessError, HarnessResult};

/// Open a 10-layer file under a cache budget that fits 3 layers. Access
/// layers `1..10` in order. After access 10, the cache contains exactly
/// layers `{8, 9, 10}`; `cache_usage <= budget`.
pub fn run() -> HarnessResult<()> {
    const LAYER_BYTES: usize = 64;
    let mut writer = LefWriter::new(ModelMeta::new("StreamModel", "1.0.0"));
    for layer_id in 1..=10u16 {
        writer.add_layer(LayerDataDescriptor {
            layer_id,
            layer_kind: LayerKind::Linear,
            quantization_type: QuantizationType::None,
            meta: vec![],
            weights: vec![layer_id as u8; LAYER_BYTES],
        })?;
    }
    let mut buf = Vec::new();
    writer.finish(&mut buf)?;

    let path = std::env::temp_dir().join(format!("libetude-harness-s7-{}.lef", std::process::id()));
    std::fs::write(&path, &buf).map_err(|e| HarnessError::Assertion(format!("failed writing temp LEF file: {e}")))?;

    let budget = LAYER_BYTES * 3;
    let mut model = StreamingModel::open(&path, budget)?;
    for layer_id in 1..=10u16 {
        model.get_layer_data(layer_id)?;
    }

    let info = model.cache_info();
    let mut resident = info.resident_layers.clone();
    resident.sort_unstable();
    if resident != vec![8, 9, 10] {
        return Err(HarnessError::Assertion(format!("resident layers {resident:?} != [8, 9, 10]")));
    }
    if info.used_bytes > budget {
        return Err(HarnessError::Assertion(format!("cache usage {} exceeds budget {budget}", info.used_bytes)));
    }
    Ok(())
}
