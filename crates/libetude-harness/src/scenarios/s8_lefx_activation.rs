use libetude_lefx::{ActivationConditionType, ActivationContext, ActivationManager, ActivationOperator, ActivationRule};

use crate::error::{HarnessError, HarnessResult};

/// Register an extension with a single rule `(language, equals, "ko",
/// weight=1.0)`. Evaluating with `language_hint="ko"` yields
/// `should_activate=true, activation_weight=1.0`; `"en"` yields false.
pub fn run() -> HarnessResult<()> {
    let mut manager = ActivationManager::new();
    let rule = ActivationRule::new(ActivationConditionType::Language, ActivationOperator::Equals, "ko", 1.0);
    manager.register(42, vec![rule], 0.5);

    let ko_ctx = ActivationContext { language_hint: Some("ko".to_string()), ..Default::default() };
    let results = manager.evaluate(&ko_ctx);
    let result = results.iter().find(|r| r.extension_id == 42).ok_or_else(|| HarnessError::Assertion("no result for extension 42".to_string()))?;
    if !result.should_activate || (result.activation_weight - 1.0).abs() > 1e-6 {
        return Err(HarnessError::Assertion(format!(
            "ko context: should_activate={}, activation_weight={}",
            result.should_activate, result.activation_weight
        )));
    }

    let en_ctx = ActivationContext { language_hint: Some("en".to_string()), ..Default::default() };
    let results = manager.evaluate(&en_ctx);
    let result = results.iter().find(|r| r.extension_id == 42).ok_or_else(|| HarnessError::Assertion("no result for extension 42".to_string()))?;
    if result.should_activate {
        return Err(HarnessError::Assertion("en context unexpectedly activated".to_string()));
    }
    Ok(())
}
