//! Whole-binary analysis.
//!
//! [`analyze`] runs either the flow tracer (with an optional linear
//! harvest for extra labels) or the linear scanner alone, confirms
//! self-modifying code and allocates labels. The result is everything the
//! listing renderer needs apart from data-region detail.

pub mod flow;
pub mod labels;
pub mod linear;

pub use flow::{FlowTracer, InstructionSink, TraceResult};
pub use labels::{Label, LabelKind, LabelMap};
pub use linear::{LinearScanner, SweepItem};

use crate::error::Result;
use crate::types::{
    Address, AnalysisMode, AnalysisOptions, Binary, Classification, SmcFindings, TargetSets,
};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Result of analysing one binary.
#[derive(Debug, Clone)]
pub struct Analysis<'a> {
    /// The analysed binary
    pub binary: &'a Binary,
    /// Options the pass ran with
    pub options: AnalysisOptions,
    /// Entry points actually seeded (flow mode)
    pub entries: Vec<Address>,
    /// Final CODE/DATA tags; all DATA in linear mode
    pub classification: Classification,
    /// Targets used for label allocation
    pub targets: TargetSets,
    /// Allocated labels
    pub labels: LabelMap,
    /// Confirmed self-modifying code
    pub smc: SmcFindings,
    /// Addresses where a traced instruction begins
    pub instruction_starts: BTreeSet<Address>,
    /// Entries rejected for overlapping an earlier instruction
    pub conflicts: BTreeSet<Address>,
}

impl Analysis<'_> {
    /// Which walk produced this analysis.
    pub fn mode(&self) -> AnalysisMode {
        self.options.mode
    }
}

/// Analyse `binary` according to `options`.
///
/// # Errors
///
/// [`DisasmError::ConfigError`](crate::DisasmError::ConfigError) if the options fail validation. Entry
/// points outside the binary are dropped; if none is left the whole binary
/// renders as DATA.
pub fn analyze<'a>(binary: &'a Binary, options: &AnalysisOptions) -> Result<Analysis<'a>> {
    options.validate()?;

    let analysis = match options.mode {
        AnalysisMode::Flow => analyze_flow(binary, options),
        AnalysisMode::Linear => analyze_linear(binary, options),
    };

    info!(
        mode = %analysis.options.mode,
        code_bytes = analysis.classification.code_bytes(),
        data_bytes = analysis.classification.data_bytes(),
        labels = analysis.labels.len(),
        smc_sites = analysis.smc.site_count(),
        "analysis complete"
    );
    Ok(analysis)
}

fn analyze_flow<'a>(binary: &'a Binary, options: &AnalysisOptions) -> Analysis<'a> {
    let requested = options.entries_for(binary);
    let entries: Vec<Address> = requested
        .iter()
        .copied()
        .filter(|addr| binary.contains(*addr))
        .collect();
    if entries.is_empty() {
        debug!(
            "no entry point inside ${:04X}-${:04X}, every byte stays DATA",
            binary.load_address(),
            binary.last_address()
        );
    }

    let mut tracer = FlowTracer::new(binary);
    for &entry in &requested {
        tracer.add_entry(entry);
    }
    tracer.trace();
    let traced = tracer.finish();

    let mut targets = traced.targets.clone();
    if options.harvest_linear_labels {
        let harvested = LinearScanner::new(binary).harvest();
        targets.absorb_transfers_within(&harvested, binary);
        debug!(
            traced = traced.targets.branch_targets.len()
                + traced.targets.jump_targets.len()
                + traced.targets.subroutine_targets.len(),
            merged = targets.branch_targets.len()
                + targets.jump_targets.len()
                + targets.subroutine_targets.len(),
            "merged linear harvest"
        );
    }

    let smc = if options.detect_smc {
        traced.detect_smc()
    } else {
        SmcFindings::default()
    };

    Analysis {
        binary,
        options: options.clone(),
        entries,
        labels: LabelMap::allocate(&targets),
        targets,
        smc,
        classification: traced.classification,
        instruction_starts: traced.instruction_starts,
        conflicts: traced.conflicts,
    }
}

fn analyze_linear<'a>(binary: &'a Binary, options: &AnalysisOptions) -> Analysis<'a> {
    let targets = LinearScanner::new(binary).harvest();
    Analysis {
        binary,
        options: options.clone(),
        entries: Vec::new(),
        classification: Classification::new(binary),
        labels: LabelMap::allocate(&targets),
        targets,
        smc: SmcFindings::default(),
        instruction_starts: BTreeSet::new(),
        conflicts: BTreeSet::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DisasmError;
    use crate::types::ByteClass;

    fn bin(bytes: &[u8], load: Address) -> Binary {
        Binary::new(bytes.to_vec(), load).unwrap()
    }

    #[test]
    fn test_flow_defaults_to_load_address() {
        let b = bin(&[0xA9, 0x05, 0x8D, 0x00, 0xC0, 0x4C, 0x00, 0x08], 0x0800);
        let analysis = analyze(&b, &AnalysisOptions::new()).unwrap();
        assert_eq!(analysis.entries, vec![0x0800]);
        assert_eq!(analysis.classification.code_bytes(), 8);
        assert_eq!(analysis.labels.name(0x0800), Some("jmp_0800"));
        assert!(analysis.smc.is_empty());
    }

    #[test]
    fn test_no_entry_points_in_range() {
        let b = bin(&[0xEA, 0x60], 0x0800);
        let options = AnalysisOptions::new().with_entry(0x2000);
        let analysis = analyze(&b, &options).unwrap();
        assert!(analysis.entries.is_empty());
        assert_eq!(analysis.classification.code_bytes(), 0);
        assert_eq!(analysis.classification.data_bytes(), 2);
        assert!(analysis.instruction_starts.is_empty());
    }

    #[test]
    fn test_some_entries_out_of_range() {
        let b = bin(&[0x60, 0x60], 0x0800);
        let options = AnalysisOptions::new().with_entry(0x2000).with_entry(0x0801);
        let analysis = analyze(&b, &options).unwrap();
        assert_eq!(analysis.entries, vec![0x0801]);
        assert_eq!(analysis.classification.get(0x0800), Some(ByteClass::Data));
        assert!(analysis.classification.is_code(0x0801));
    }

    #[test]
    fn test_linear_harvest_adds_labels_only_in_range() {
        // RTS, then unreached bytes that decode as JSR $0800 and JSR $FDED
        let b = bin(&[0x60, 0x20, 0x00, 0x08, 0x20, 0xED, 0xFD], 0x0800);
        let with = analyze(&b, &AnalysisOptions::new()).unwrap();
        assert_eq!(with.labels.name(0x0800), Some("sub_0800"));
        assert!(!with.labels.contains(0xFDED));
        assert_eq!(with.classification.code_bytes(), 1);

        let mut options = AnalysisOptions::new();
        options.harvest_linear_labels = false;
        let without = analyze(&b, &options).unwrap();
        assert!(without.labels.is_empty());
    }

    #[test]
    fn test_linear_mode() {
        let b = bin(&[0x20, 0xED, 0xFD, 0x60], 0x0800);
        let analysis = analyze(&b, &AnalysisOptions::linear()).unwrap();
        assert_eq!(analysis.mode(), AnalysisMode::Linear);
        assert_eq!(analysis.classification.code_bytes(), 0);
        assert_eq!(analysis.labels.name(0xFDED), Some("sub_FDED"));
    }

    #[test]
    fn test_smc_toggle() {
        let b = bin(
            &[0xA9, 0x60, 0x8D, 0x09, 0x08, 0x4C, 0x08, 0x08, 0xA9, 0x00, 0x60],
            0x0800,
        );
        let on = analyze(&b, &AnalysisOptions::new()).unwrap();
        assert_eq!(on.smc.site_count(), 1);
        let off = analyze(&b, &AnalysisOptions::new().without_smc()).unwrap();
        assert!(off.smc.is_empty());
        assert_eq!(on.classification, off.classification);
    }

    #[test]
    fn test_invalid_options() {
        let b = bin(&[0x60], 0x0800);
        let mut options = AnalysisOptions::new();
        options.raw_chunk_len = 0;
        assert!(matches!(
            analyze(&b, &options),
            Err(DisasmError::ConfigError { .. })
        ));
    }
}
