use libetude_lef::{FullModel, LayerDataDescriptor, LayerKind, LefModel, LefWriter, ModelMeta, QuantizationType};

use crate::error::{HarnessError, HarnessResult};

fn floats(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Write a model `name="TestModel", version="1.0.0"` with two layers
/// (Linear weights `{1,2,3,4,5}`, Attention weights `{6,...,11}`).
/// Reopen, `verify_file_integrity` succeeds, and `get_layer_data(1)`'s
/// first 5 floats equal `{1,2,3,4,5}`.
pub fn run() -> HarnessResult<()> {
    let mut writer = LefWriter::new(ModelMeta::new("TestModel", "1.0.0"));
    writer.add_layer(LayerDataDescriptor {
        layer_id: 1,
        layer_kind: LayerKind::Linear,
        quantization_type: QuantizationType::None,
        meta: vec![],
        weights: floats(&[1.0, 2.0, 3.0, 4.0, 5.0]),
    })?;
    writer.add_layer(LayerDataDescriptor {
        layer_id: 2,
        layer_kind: LayerKind::Attention,
        quantization_type: QuantizationType::None,
        meta: vec![],
        weights: floats(&[6.0, 7.0, 8.0, 9.0, 10.0, 11.0]),
    })?;

    let mut buf = Vec::new();
    writer.finish(&mut buf)?;

    let mut model = FullModel::from_bytes(buf)?;
    model.verify_file_integrity()?;

    let layer1 = model.get_layer_data(1)?;
    for (i, &expected) in [1.0f32, 2.0, 3.0, 4.0, 5.0].iter().enumerate() {
        let got = f32::from_le_bytes(layer1[i * 4..i * 4 + 4].try_into().unwrap());
        if (got - expected).abs() > 1e-6 {
            return Err(HarnessError::Assertion(format!("layer 1 float {i}: got {got}, expected {expected}")));
        }
    }
    Ok(())
}
