//! LEFX: differential and conditionally-activated extensions layered
//! over a base LEF model. Parallel on-disk format to `libetude_lef`
//! (same header/meta/index discipline), plus activation rules, blend
//! modes, and inter-extension dependency resolution that the base
//! format has no need for.

mod activation;
mod blend;
mod container;
mod dependency;
mod diff;
mod error;
mod extension;
mod header;
mod layer;
mod loader;
mod meta;
mod transition;
mod util;
mod writer;

pub use activation::{ActivationContext, ActivationManager, ActivationConditionType, ActivationOperator, ActivationResult, ActivationRule};
pub use blend::blend;
pub use dependency::{ActiveExtensionInfo, DependencyReport, DependencyType, LefxDependency, resolve, require_satisfied};
pub use diff::reconstruct;
pub use error::{LefxError, LefxResult};
pub use extension::{BlendedLayer, ExtensionState, LefxExtension, apply_extension};
pub use header::{LEFX_CURRENT_VERSION, LEFX_HEADER_SIZE, LEFX_MAGIC, LefxExtensionType, LefxFlags, LefxHeader};
pub use layer::{BlendMode, DiffEncoding, LayerActivation, LayerIndexEntry, LefxLayerHeader, QuantizationType};
pub use loader::LoadedExtension;
pub use meta::LefxMeta;
pub use transition::{Transition, TransitionCurve};
pub use writer::{LefxLayerDescriptor, LefxWriter};
