//! The canonical 9-stage table (spec §4.4), as data rather than scattered
//! `if`/`match` ladders.

use cleo_core::PipelineStage;

/// One row of the canonical stage table.
#[derive(Debug, Clone, Copy)]
pub struct StageDef {
    pub stage: PipelineStage,
    pub skippable: bool,
    pub prereqs: &'static [PipelineStage],
    /// Named gates that must all record a `pass` result before the stage
    /// is completable (spec §4.4: "a stage is completable only when all
    /// required gates pass"). The spec names the mechanism but not the
    /// concrete gate set per stage; this table is a DESIGN.md Open
    /// Question decision, not a literal spec requirement.
    pub required_gates: &'static [&'static str],
}

use PipelineStage::*;

/// The full table, in canonical order (spec §4.4's table).
pub const STAGES: [StageDef; 9] = [
    StageDef { stage: Research, skippable: false, prereqs: &[], required_gates: &[] },
    StageDef { stage: Consensus, skippable: true, prereqs: &[Research], required_gates: &["consensus_reached"] },
    StageDef { stage: Adr, skippable: true, prereqs: &[Research, Consensus], required_gates: &["adr_approved"] },
    StageDef { stage: Spec, skippable: false, prereqs: &[Research, Consensus, Adr], required_gates: &["spec_reviewed"] },
    StageDef {
        stage: Decompose,
        skippable: false,
        prereqs: &[Research, Spec],
        required_gates: &["tasks_decomposed"],
    },
    StageDef {
        stage: Implement,
        skippable: false,
        prereqs: &[Research, Spec, Decompose],
        required_gates: &["code_complete"],
    },
    StageDef { stage: Verify, skippable: false, prereqs: &[Implement], required_gates: &["verification_passed"] },
    StageDef { stage: Test, skippable: false, prereqs: &[Implement, Verify], required_gates: &["tests_passing"] },
    StageDef {
        stage: Release,
        skippable: true,
        prereqs: &[Implement, Verify, Test],
        required_gates: &["release_approved"],
    },
];

pub fn def_for(stage: PipelineStage) -> &'static StageDef {
    STAGES.iter().find(|d| d.stage == stage).expect("every PipelineStage has a StageDef row")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_ordered_stage_has_a_def_in_the_same_order() {
        for (i, stage) in PipelineStage::ORDERED.iter().enumerate() {
            assert_eq!(STAGES[i].stage, *stage);
        }
    }

    #[test]
    fn research_has_no_prereqs_release_requires_implement_verify_test() {
        assert!(def_for(Research).prereqs.is_empty());
        let release = def_for(Release);
        assert_eq!(release.prereqs, &[Implement, Verify, Test]);
    }
}
