//! Bundled "Audio" operators: the spectral front-end and a reference
//! waveform synthesizer.
//!
//! These use a direct (`O(n^2)`) discrete Fourier transform rather than
//! an FFT crate: no FFT dependency appears anywhere in this workspace's
//! grounding pack, and the bundled operators exist to make the registry
//! and graph executor exercisable end-to-end, not to be a production
//! DSP library — a real deployment swaps these for a platform-tuned
//! implementation without touching the graph executor.

use std::f32::consts::PI;

use libetude_tensor::{DType, Shape, Tensor};

use crate::error::{GraphError, GraphResult};
use crate::node::OperatorParams;
use crate::registry::{OperatorDef, OperatorState};

fn no_state(_: &OperatorParams) -> GraphResult<OperatorState> {
    Ok(OperatorState(Box::new(())))
}

fn no_destroy(_: OperatorState) {}

fn hann_window(n: usize) -> Vec<f32> {
    if n <= 1 {
        return vec![1.0; n];
    }
    (0..n).map(|i| 0.5 - 0.5 * (2.0 * PI * i as f32 / (n - 1) as f32).cos()).collect()
}

/// `waveform`: `[num_samples]` -> `[magnitude, phase]`, each
/// `[num_frames, frame_size / 2 + 1]`. `frame_size`/`hop_size` come
/// from params (defaults `1024`/`256`).
fn stft_forward(_: &OperatorState, inputs: &[&Tensor], params: &OperatorParams) -> GraphResult<Vec<Tensor>> {
    let waveform = inputs.first().ok_or(GraphError::InvalidParameter("stft requires a waveform tensor"))?;
    let frame_size = params.get_int("frame_size").unwrap_or(1024).max(2) as usize;
    let hop_size = params.get_int("hop_size").unwrap_or(256).max(1) as usize;

    let num_samples = waveform.shape().dims()[0];
    if num_samples < frame_size {
        return Err(GraphError::InvalidParameter("waveform shorter than frame_size"));
    }
    let num_frames = (num_samples - frame_size) / hop_size + 1;
    let num_bins = frame_size / 2 + 1;
    let window = hann_window(frame_size);

    let magnitude = Tensor::create(waveform.pool(), Shape::new(vec![num_frames, num_bins]), DType::Float32)?;
    let phase = Tensor::create(waveform.pool(), Shape::new(vec![num_frames, num_bins]), DType::Float32)?;
    for frame in 0..num_frames {
        let start = frame * hop_size;
        for bin in 0..num_bins {
            let angle_step = -2.0 * PI * bin as f32 / frame_size as f32;
            let (mut re, mut im) = (0.0f32, 0.0f32);
            for n in 0..frame_size {
                let sample = waveform.get_f32(&[start + n]) * window[n];
                let angle = angle_step * n as f32;
                re += sample * angle.cos();
                im += sample * angle.sin();
            }
            magnitude.set_f32(&[frame, bin], (re * re + im * im).sqrt());
            phase.set_f32(&[frame, bin], im.atan2(re));
        }
    }
    Ok(vec![magnitude, phase])
}

fn hz_to_mel(hz: f32) -> f32 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (10f32.powf(mel / 2595.0) - 1.0)
}

/// Triangular mel filterbank, `[n_mels, n_bins]`.
fn mel_filterbank(n_mels: usize, n_bins: usize, sample_rate: f32, frame_size: usize) -> Vec<Vec<f32>> {
    let mel_min = hz_to_mel(0.0);
    let mel_max = hz_to_mel(sample_rate / 2.0);
    let mel_points: Vec<f32> = (0..n_mels + 2).map(|i| mel_min + (mel_max - mel_min) * i as f32 / (n_mels + 1) as f32).collect();
    let hz_points: Vec<f32> = mel_points.iter().map(|&m| mel_to_hz(m)).collect();
    let bin_points: Vec<usize> = hz_points.iter().map(|&hz| ((frame_size as f32 + 1.0) * hz / sample_rate).floor() as usize).collect();

    let mut filters = vec![vec![0.0f32; n_bins]; n_mels];
    for m in 0..n_mels {
        let (left, center, right) = (bin_points[m], bin_points[m + 1], bin_points[m + 2]);
        for bin in left..center.min(n_bins) {
            if center > left {
                filters[m][bin] = (bin - left) as f32 / (center - left) as f32;
            }
        }
        for bin in center..right.min(n_bins) {
            if right > center {
                filters[m][bin] = (right - bin) as f32 / (right - center) as f32;
            }
        }
    }
    filters
}

/// Magnitude spectrogram `[num_frames, n_bins]` -> mel spectrogram
/// `[num_frames, n_mels]`. `n_mels`/`sample_rate` come from params
/// (defaults `80`/`22050.0`).
fn mel_scale_forward(_: &OperatorState, inputs: &[&Tensor], params: &OperatorParams) -> GraphResult<Vec<Tensor>> {
    let spectrogram = inputs.first().ok_or(GraphError::InvalidParameter("mel_scale requires a spectrogram tensor"))?;
    let n_mels = params.get_int("n_mels").unwrap_or(80).max(1) as usize;
    let sample_rate = params.get_float("sample_rate").unwrap_or(22_050.0);

    let num_frames = spectrogram.shape().dims()[0];
    let n_bins = spectrogram.shape().dims()[1];
    let frame_size = (n_bins - 1) * 2;
    let filters = mel_filterbank(n_mels, n_bins, sample_rate, frame_size);

    let out = Tensor::create(spectrogram.pool(), Shape::new(vec![num_frames, n_mels]), DType::Float32)?;
    for frame in 0..num_frames {
        for (m, filter) in filters.iter().enumerate() {
            let mut acc = 0.0f32;
            for (bin, &weight) in filter.iter().enumerate() {
                if weight != 0.0 {
                    acc += spectrogram.get_f32(&[frame, bin]) * weight;
                }
            }
            out.set_f32(&[frame, m], acc.max(1e-10).ln());
        }
    }
    Ok(vec![out])
}

/// Reference (non-neural) vocoder: projects a log-mel spectrogram back
/// onto a linear magnitude spectrogram via the filterbank's transpose,
/// then reconstructs a waveform by overlap-add inverse DFT with a
/// zero-phase assumption. Adequate for shape/flow conformance, not
/// perceptual audio quality — a trained neural vocoder is what a real
/// model graph would load into this operator's node instead.
fn vocoder_forward(_: &OperatorState, inputs: &[&Tensor], params: &OperatorParams) -> GraphResult<Vec<Tensor>> {
    let mel = inputs.first().ok_or(GraphError::InvalidParameter("vocoder requires a mel spectrogram tensor"))?;
    let frame_size = params.get_int("frame_size").unwrap_or(1024).max(2) as usize;
    let hop_size = params.get_int("hop_size").unwrap_or(256).max(1) as usize;
    let sample_rate = params.get_float("sample_rate").unwrap_or(22_050.0);

    let num_frames = mel.shape().dims()[0];
    let n_mels = mel.shape().dims()[1];
    let n_bins = frame_size / 2 + 1;
    let filters = mel_filterbank(n_mels, n_bins, sample_rate, frame_size);
    let window = hann_window(frame_size);

    let num_samples = (num_frames - 1) * hop_size + frame_size;
    let out = Tensor::zeros(mel.pool(), Shape::new(vec![num_samples]), DType::Float32)?;
    let mut norm = vec![0.0f32; num_samples];

    for frame in 0..num_frames {
        let mut magnitude = vec![0.0f32; n_bins];
        for bin in 0..n_bins {
            let mut acc = 0.0f32;
            for (m, filter) in filters.iter().enumerate() {
                acc += mel.get_f32(&[frame, m]).exp() * filter[bin];
            }
            magnitude[bin] = acc;
        }

        let start = frame * hop_size;
        for n in 0..frame_size {
            let mut sample = 0.0f32;
            for bin in 0..n_bins {
                let angle = 2.0 * PI * bin as f32 * n as f32 / frame_size as f32;
                sample += magnitude[bin] * angle.cos();
            }
            sample = sample / frame_size as f32 * window[n];
            let existing = out.get_f32(&[start + n]);
            out.set_f32(&[start + n], existing + sample);
            norm[start + n] += window[n] * window[n];
        }
    }

    for i in 0..num_samples {
        if norm[i] > 1e-8 {
            let v = out.get_f32(&[i]) / norm[i];
            out.set_f32(&[i], v);
        }
    }
    Ok(vec![out])
}

pub(crate) fn operator_defs() -> Vec<OperatorDef> {
    vec![
        OperatorDef { name: "stft", create: no_state, forward: stft_forward, destroy: no_destroy, backward: None },
        OperatorDef { name: "mel_scale", create: no_state, forward: mel_scale_forward, destroy: no_destroy, backward: None },
        OperatorDef { name: "vocoder", create: no_state, forward: vocoder_forward, destroy: no_destroy, backward: None },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use libetude_pool::Pool;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn pool() -> Arc<Mutex<Pool>> {
        Arc::new(Mutex::new(Pool::create(4 << 20, 32).unwrap()))
    }

    #[test]
    fn stft_produces_expected_shape() {
        let p = pool();
        let waveform = Tensor::zeros(p, Shape::new(vec![4096]), DType::Float32).unwrap();
        for i in 0..4096 {
            waveform.set_f32(&[i], (i as f32 * 0.01).sin());
        }
        let params = OperatorParams::new()
            .with("frame_size", crate::node::ParamValue::Int(1024))
            .with("hop_size", crate::node::ParamValue::Int(256));
        let state = OperatorState(Box::new(()));
        let outputs = stft_forward(&state, &[&waveform], &params).unwrap();
        assert_eq!(outputs.len(), 2, "stft must return magnitude and phase");
        let (magnitude, phase) = (&outputs[0], &outputs[1]);
        assert_eq!(magnitude.shape().dims()[1], 513);
        assert!(magnitude.shape().dims()[0] > 0);
        assert_eq!(phase.shape().dims(), magnitude.shape().dims());
    }

    #[test]
    fn mel_scale_reduces_bin_count() {
        let p = pool();
        let spec = Tensor::ones(p, Shape::new(vec![4, 513]), DType::Float32).unwrap();
        let params = OperatorParams::new().with("n_mels", crate::node::ParamValue::Int(80));
        let state = OperatorState(Box::new(()));
        let mel = mel_scale_forward(&state, &[&spec], &params).unwrap();
        assert_eq!(mel[0].shape().dims(), &[4, 80]);
    }

    #[test]
    fn vocoder_produces_contiguous_waveform_length() {
        let p = pool();
        let mel = Tensor::zeros(p, Shape::new(vec![3, 80]), DType::Float32).unwrap();
        let params = OperatorParams::new()
            .with("frame_size", crate::node::ParamValue::Int(256))
            .with("hop_size", crate::node::ParamValue::Int(64));
        let state = OperatorState(Box::new(()));
        let wave = vocoder_forward(&state, &[&mel], &params).unwrap();
        assert_eq!(wave[0].shape().dims()[0], (3 - 1) * 64 + 256);
    }
}
