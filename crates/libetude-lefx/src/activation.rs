//! Conditional activation: match extension-supplied rules against a
//! caller-supplied context and decide whether (and how strongly) an
//! extension should be active.
//!
//! `ActivationConditionType`/`ActivationOperator` are closed, small enum
//! sets dispatched with a plain `match`, the same shape as the teacher's
//! `ElfError`/`RelocationType` rather than a trait-object matcher — the
//! rule set here is just as closed and just as small.

use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationConditionType {
    Text,
    Speaker,
    Language,
    Time,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationOperator {
    Equals,
    Contains,
    InRange,
    Regex,
}

/// The caller-supplied situation an extension's rules are evaluated
/// against. Every field is optional except `timestamp_ms`, which the
/// caller always has (it drives transitions too, see `transition.rs`).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ActivationContext {
    pub text: Option<String>,
    pub speaker_id: Option<String>,
    pub speaker_gender: Option<String>,
    pub speaker_age: Option<f64>,
    pub language_hint: Option<String>,
    pub emotion: Option<String>,
    pub timestamp_ms: u64,
    pub quality_preference: Option<f32>,
    pub performance_budget_ms: Option<u32>,
    pub custom: Option<Vec<u8>>,
}

/// One activation rule. `value` is the operand the matcher compares
/// against; `numeric_range` is only consulted when `operator` is
/// `InRange` (age, time-of-day, etc).
#[derive(Debug, Clone, PartialEq)]
pub struct ActivationRule {
    pub condition_type: ActivationConditionType,
    pub operator: ActivationOperator,
    pub value: String,
    pub numeric_range: Option<(f64, f64)>,
    pub activation_weight: f32,
    pub priority: i32,
}

impl ActivationRule {
    pub fn new(condition_type: ActivationConditionType, operator: ActivationOperator, value: impl Into<String>, activation_weight: f32) -> Self {
        Self { condition_type, operator, value: value.into(), numeric_range: None, activation_weight, priority: 0 }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_numeric_range(mut self, min: f64, max: f64) -> Self {
        self.numeric_range = Some((min, max));
        self
    }

    /// Returns this rule's `activation_weight` if it matches `ctx`, or
    /// `0.0` otherwise.
    pub fn matches(&self, ctx: &ActivationContext) -> f32 {
        let matched = match self.condition_type {
            ActivationConditionType::Text => self.match_text(ctx.text.as_deref()),
            ActivationConditionType::Language => self.match_text(ctx.language_hint.as_deref()),
            ActivationConditionType::Speaker => self.match_speaker(ctx),
            ActivationConditionType::Time => self.match_numeric(ctx.timestamp_ms as f64),
            ActivationConditionType::Custom => self.match_text(ctx.custom.as_deref().map(String::from_utf8_lossy).as_deref()),
        };
        if matched { self.activation_weight } else { 0.0 }
    }

    fn match_text(&self, field: Option<&str>) -> bool {
        let Some(field) = field else { return false };
        match self.operator {
            ActivationOperator::Equals => field == self.value,
            ActivationOperator::Contains => field.contains(&self.value),
            ActivationOperator::Regex => Regex::new(&self.value).map(|re| re.is_match(field)).unwrap_or(false),
            ActivationOperator::InRange => false,
        }
    }

    /// Speaker rules compare against `speaker_id` unless `value` is
    /// prefixed `gender:` or `age:`, in which case the suffix/numeric
    /// range is matched against the corresponding context field.
    fn match_speaker(&self, ctx: &ActivationContext) -> bool {
        if let Some(expected) = self.value.strip_prefix("gender:") {
            return ctx.speaker_gender.as_deref() == Some(expected);
        }
        if self.value == "age" {
            return ctx.speaker_age.map(|age| self.match_numeric(age)).unwrap_or(false);
        }
        self.match_text(ctx.speaker_id.as_deref())
    }

    fn match_numeric(&self, value: f64) -> bool {
        match self.operator {
            ActivationOperator::InRange => self.numeric_range.map(|(lo, hi)| value >= lo && value <= hi).unwrap_or(false),
            ActivationOperator::Equals => self.value.parse::<f64>().map(|v| v == value).unwrap_or(false),
            ActivationOperator::Contains | ActivationOperator::Regex => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActivationResult {
    pub extension_id: u32,
    pub should_activate: bool,
    pub activation_weight: f32,
}

struct Registration {
    extension_id: u32,
    rules: Vec<ActivationRule>,
    threshold: f32,
}

/// Single-threaded rule evaluator with a cached last-context, per the
/// concurrency model: the Activation Manager is not meant to be shared
/// across threads.
#[derive(Default)]
pub struct ActivationManager {
    registrations: Vec<Registration>,
    last_context: Option<ActivationContext>,
    last_results: Vec<ActivationResult>,
}

impl ActivationManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) an extension's rule set. Invalidates the
    /// context cache, per the concurrency model's explicit rule.
    pub fn register(&mut self, extension_id: u32, rules: Vec<ActivationRule>, threshold: f32) {
        self.registrations.retain(|r| r.extension_id != extension_id);
        self.registrations.push(Registration { extension_id, rules, threshold });
        self.invalidate();
    }

    pub fn unregister(&mut self, extension_id: u32) {
        self.registrations.retain(|r| r.extension_id != extension_id);
        self.invalidate();
    }

    pub fn invalidate(&mut self) {
        self.last_context = None;
        self.last_results.clear();
    }

    /// Evaluates every registered extension's rules against `ctx`. If
    /// `ctx` is identical to the last-evaluated context, returns the
    /// cached results without re-matching.
    pub fn evaluate(&mut self, ctx: &ActivationContext) -> &[ActivationResult] {
        if self.last_context.as_ref() == Some(ctx) {
            return &self.last_results;
        }

        self.last_results = self
            .registrations
            .iter()
            .map(|reg| {
                let weight = reg
                    .rules
                    .iter()
                    .filter_map(|r| {
                        let w = r.matches(ctx);
                        (w > 0.0).then_some((r.priority, w))
                    })
                    .max_by(|(pa, wa), (pb, wb)| pa.cmp(pb).then(wa.total_cmp(wb)))
                    .map(|(_, w)| w)
                    .unwrap_or(0.0);
                ActivationResult { extension_id: reg.extension_id, should_activate: weight > 0.0 && weight >= reg.threshold, activation_weight: weight }
            })
            .collect();
        self.last_context = Some(ctx.clone());
        &self.last_results
    }
}
