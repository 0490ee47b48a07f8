//! Restore operand stack integrity around `try`/`catch` regions
//!
//! The JVM verifier requires a known operand stack shape wherever a protected region begins and
//! wherever a handler is entered. Code that went through inlining may break that, leaving extra
//! values on the stack at those points. This pass marks the spots where the stack needs to be
//! spilled and reloaded; stack lowering later turns the markers into real instructions.
//!
//! The pass runs in three steps, each in its own module:
//!
//!   1. [`TryDescriptors::collect`] groups exception table entries into `try` blocks
//!   2. [`MarkerPlan`] inserts [`PseudoInsn::SaveStackBeforeTry`] and
//!      [`PseudoInsn::RestoreStackInHandler`] markers, moving each region start to a fresh label
//!      after the save marker
//!   3. [`rewrite_exception_table`] points the exception table at the moved region starts
//!
//! Either all of this happens to a method or none of it does.
//!
//! [`PseudoInsn::SaveStackBeforeTry`]: crate::jvm::code::PseudoInsn::SaveStackBeforeTry
//! [`PseudoInsn::RestoreStackInHandler`]: crate::jvm::code::PseudoInsn::RestoreStackInHandler

mod collect;
mod errors;
mod insert;
mod rewrite;
mod settings;

pub use collect::*;
pub use errors::*;
pub use insert::*;
pub use rewrite::*;
pub use settings::*;

use crate::jvm::code::Code;
use crate::jvm::model::Method;
use rayon::prelude::*;

/// What the pass did to one method
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RepairSummary {
    /// Method had no exception table, so nothing was touched
    pub skipped: bool,

    /// Number of `try` blocks recovered from the exception table
    pub descriptors: usize,

    pub save_markers: usize,

    /// Restore markers placed just inside protected regions
    pub region_restore_markers: usize,

    /// Restore markers placed at the start of handlers
    pub handler_restore_markers: usize,

    /// Exception table entries whose start label changed
    pub rewritten_entries: usize,
}

/// Repair one method
pub fn repair_method(method: &mut Method, settings: &Settings) -> Result<RepairSummary, Error> {
    log::debug!("Repairing try/catch stack shapes in '{}'", method.name);
    let summary = repair_code(&mut method.code, settings)?;
    if !summary.skipped {
        log::debug!(
            "Repaired '{}': {} try blocks, {} save markers, {} restore markers",
            method.name,
            summary.descriptors,
            summary.save_markers,
            summary.region_restore_markers + summary.handler_restore_markers,
        );
    }
    Ok(summary)
}

/// Repair one method body
pub fn repair_code(code: &mut Code, settings: &Settings) -> Result<RepairSummary, Error> {
    if !code.has_protected_regions() {
        return Ok(RepairSummary {
            skipped: true,
            ..RepairSummary::default()
        });
    }

    // Nothing below may fail once the stream starts changing
    if settings.validate_table {
        validate_exception_table(code)?;
    }
    let descriptors = TryDescriptors::collect(&code.exception_table)?;
    for descriptor in descriptors.descriptors() {
        log::debug!(
            "Try block at {:?}: handlers {:?}, default handler {:?}",
            descriptor.try_start,
            descriptor.handler_starts,
            descriptor.default_handler,
        );
    }
    let plan = MarkerPlan::new(&descriptors, &code.exception_table, &code.instructions)?;

    let inserted = plan.apply(&mut code.instructions)?;
    let exception_table = rewrite_exception_table(&code.exception_table, &inserted.new_starts);
    let rewritten_entries = code
        .exception_table
        .iter()
        .zip(&exception_table)
        .filter(|(old, new)| old.start != new.start)
        .count();
    code.exception_table = exception_table;

    Ok(RepairSummary {
        skipped: false,
        descriptors: descriptors.descriptors().len(),
        save_markers: inserted.save_markers,
        region_restore_markers: inserted.region_restore_markers,
        handler_restore_markers: inserted.handler_restore_markers,
        rewritten_entries,
    })
}

/// Repair many independent methods
///
/// Each method is repaired on its own, so one failure does not affect the others. Results come
/// back in the same order as the methods.
pub fn repair_methods(
    methods: &mut [Method],
    settings: &Settings,
) -> Vec<Result<RepairSummary, Error>> {
    if settings.parallel {
        methods
            .par_iter_mut()
            .map(|method| repair_method(method, settings))
            .collect()
    } else {
        methods
            .iter_mut()
            .map(|method| repair_method(method, settings))
            .collect()
    }
}
