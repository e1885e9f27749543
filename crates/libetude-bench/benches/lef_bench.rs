//! LEF container load and layer-extraction benchmarks.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use libetude_lef::{FullModel, LayerDataDescriptor, LayerKind, LefModel, LefWriter, ModelMeta, QuantizationType};

fn build_model_bytes(num_layers: u16, layer_floats: usize) -> Vec<u8> {
    let mut writer = LefWriter::new(ModelMeta::new("BenchModel", "1.0.0"));
    let weights: Vec<u8> = (0..layer_floats).flat_map(|i| (i as f32).to_le_bytes()).collect();
    for layer_id in 0..num_layers {
        writer
            .add_layer(LayerDataDescriptor {
                layer_id,
                layer_kind: LayerKind::Linear,
                quantization_type: QuantizationType::None,
                meta: vec![],
                weights: weights.clone(),
            })
            .unwrap();
    }
    let mut buf = Vec::new();
    writer.finish(&mut buf).unwrap();
    buf
}

fn bench_open_and_verify(c: &mut Criterion) {
    let layer_counts: &[u16] = &[4, 16, 64];
    let mut group = c.benchmark_group("lef_open_and_verify");

    for &count in layer_counts {
        let bytes = build_model_bytes(count, 256);
        group.bench_with_input(BenchmarkId::new("layers", count), &bytes, |b, bytes| {
            b.iter(|| {
                let mut model = FullModel::from_bytes(bytes.clone()).unwrap();
                model.verify_file_integrity().unwrap();
                black_box(&model);
            });
        });
    }
    group.finish();
}

fn bench_get_layer_data(c: &mut Criterion) {
    let bytes = build_model_bytes(32, 1024);
    c.bench_function("lef_get_layer_data_sequential", |b| {
        b.iter(|| {
            let mut model = FullModel::from_bytes(bytes.clone()).unwrap();
            for layer_id in 0..32u16 {
                black_box(model.get_layer_data(layer_id).unwrap());
            }
        });
    });
}

criterion_group!(benches, bench_open_and_verify, bench_get_layer_data);
criterion_main!(benches);
