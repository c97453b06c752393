//! A live edit session.

use std::sync::Arc;

use enc_diagnostic::EmitError;
use enc_ir::{SharedInterner, StringInterner};

use crate::output::GenerationOutput;
use crate::pipeline::prepare_generation;
use crate::{Baseline, EmitOptions, GenerationInput};

/// Owns the committed baseline of one running program.
///
/// [`EditSession::prepare`] computes the next generation without touching the
/// session; [`EditSession::commit`] makes it the new baseline once the runtime
/// accepted the delta. A generation that is never committed can simply be
/// dropped.
pub struct EditSession {
    baseline: Arc<Baseline>,
    interner: SharedInterner,
    options: EmitOptions,
}

impl EditSession {
    /// A session before the cold build.
    pub fn new(interner: SharedInterner, options: EmitOptions) -> Self {
        EditSession {
            baseline: Arc::new(Baseline::empty()),
            interner,
            options,
        }
    }

    /// Resume from a previously committed baseline.
    pub fn from_baseline(baseline: Baseline, interner: SharedInterner, options: EmitOptions) -> Self {
        EditSession {
            baseline: Arc::new(baseline),
            interner,
            options,
        }
    }

    pub fn baseline(&self) -> &Arc<Baseline> {
        &self.baseline
    }

    pub fn interner(&self) -> &StringInterner {
        &self.interner
    }

    pub fn options(&self) -> &EmitOptions {
        &self.options
    }

    /// Compute the next generation against the committed baseline.
    ///
    /// # Errors
    ///
    /// [`EmitError::RudeEdits`] with every rude edit found when the change
    /// cannot be applied to the running program, or an internal error.
    pub fn prepare(&self, input: &GenerationInput) -> Result<GenerationOutput, EmitError> {
        prepare_generation(&self.baseline, input, &self.interner, &self.options)
    }

    /// Make a prepared generation the committed baseline.
    ///
    /// # Errors
    ///
    /// [`EmitError::GenerationOutOfOrder`] when `output` was not prepared
    /// against the current baseline.
    pub fn commit(&mut self, output: &GenerationOutput) -> Result<(), EmitError> {
        let expected = self.baseline.next_generation();
        if output.generation != expected {
            return Err(EmitError::GenerationOutOfOrder {
                baseline: self.baseline.generation().unwrap_or_default(),
                found: output.generation,
            });
        }
        self.baseline = Arc::clone(&output.baseline);
        tracing::debug!(generation = %output.generation, "committed generation");
        Ok(())
    }

    /// Prepare and commit in one step.
    ///
    /// # Errors
    ///
    /// Whatever [`EditSession::prepare`] reports; the baseline is unchanged.
    pub fn apply(&mut self, input: &GenerationInput) -> Result<GenerationOutput, EmitError> {
        let output = self.prepare(input)?;
        self.commit(&output)?;
        Ok(output)
    }
}
