//! The `Pipeline` aggregate operations (spec §4.3 `lifecycle` domain, §4.4
//! transition rules): `progress`, `block`, `unblock`, `skip`,
//! `record_gate`, `add_evidence`. Each state-changing operation produces a
//! `Transition` row; `block`/`unblock` are the exception since they toggle
//! a stage in place without moving the pipeline forward.

use cleo_core::{
    CleoError, EnforcementMode, Evidence, GateOutcome, GateResult, LifecyclePipeline,
    LifecycleStageRow, PipelineStage, StageStatus, TaskId, Transition, TransitionType,
};
use cleo_storage::SafeAccessor;
use tracing::warn;

use crate::stage_def::{self, StageDef};

/// Fetch (or lazily create) the pipeline for `task_id`, along with its
/// stage rows ordered by sequence.
async fn load(
    accessor: &SafeAccessor,
    task_id: TaskId,
) -> Result<(LifecyclePipeline, Vec<LifecycleStageRow>), CleoError> {
    let pipeline = match cleo_storage::DataAccessor::get_pipeline(accessor, task_id).await? {
        Some(p) => p,
        None => cleo_storage::DataAccessor::create_pipeline(accessor, task_id).await?,
    };
    let stages = cleo_storage::DataAccessor::list_stages(accessor, pipeline.id).await?;
    Ok((pipeline, stages))
}

fn current_stage(stages: &[LifecycleStageRow], pipeline: &LifecyclePipeline) -> Result<LifecycleStageRow, CleoError> {
    stages
        .iter()
        .find(|s| s.id == pipeline.current_stage_id)
        .cloned()
        .ok_or_else(|| CleoError::internal("pipeline current_stage_id has no matching stage row"))
}

fn stage_row(stages: &[LifecycleStageRow], stage: PipelineStage) -> Result<LifecycleStageRow, CleoError> {
    stages
        .iter()
        .find(|s| s.stage_name == stage)
        .cloned()
        .ok_or_else(|| CleoError::internal(format!("stage {stage} missing from pipeline")))
}

/// All of a stage definition's prerequisites are completed or skipped.
/// `outgoing` names the stage that is completing (or being skipped) as
/// part of the very transition under evaluation — it is about to satisfy
/// its own prerequisite obligation to `def` even though its row hasn't
/// been written yet, so it's treated as already satisfied.
fn prereqs_satisfied(def: &StageDef, stages: &[LifecycleStageRow], outgoing: PipelineStage) -> Option<PipelineStage> {
    def.prereqs.iter().find(|prereq| {
        if **prereq == outgoing {
            return false;
        }
        stages
            .iter()
            .find(|s| s.stage_name == **prereq)
            .map(|s| !s.status.satisfies_prerequisite())
            .unwrap_or(true)
    }).copied()
}

/// Every gate named in `def.required_gates` has a recorded `pass` result
/// for `stage_id` (spec §4.4: "a stage is completable only when all
/// required gates pass").
async fn gates_satisfied(
    accessor: &SafeAccessor,
    stage_id: i64,
    def: &StageDef,
) -> Result<Option<&'static str>, CleoError> {
    if def.required_gates.is_empty() {
        return Ok(None);
    }
    let recorded = cleo_storage::DataAccessor::list_gates(accessor, stage_id).await?;
    for gate_name in def.required_gates {
        let passed = recorded.iter().any(|g| &g.gate_name == gate_name && g.result == GateOutcome::Pass);
        if !passed {
            return Ok(Some(gate_name));
        }
    }
    Ok(None)
}

/// Surface or swallow a lifecycle violation depending on enforcement mode
/// (spec §6 config key `lifecycleEnforcement.mode`; SPEC_FULL §4.4).
/// `off` never even calls this — callers skip the check entirely.
fn enforce(mode: EnforcementMode, err: CleoError) -> Result<(), CleoError> {
    match mode {
        EnforcementMode::Strict => Err(err),
        EnforcementMode::Advisory => {
            warn!(code = err.code, message = %err.message, "lifecycle: advisory violation, proceeding");
            Ok(())
        }
        EnforcementMode::Off => Ok(()),
    }
}

/// General-purpose lifecycle transition (spec §8 `checkTransition(from, to,
/// force)`): move the pipeline's current stage to any `target`, not just
/// the next one in canonical order.
///
/// - `target == current` is always allowed and is a true no-op: nothing is
///   read back out, no row is written, no `Transition` is recorded.
/// - Backward transitions (`target` earlier than `current`) are denied
///   unless `force=true`; forcing one reverts the stage being left to
///   `pending` and reopens `target` as `in_progress`.
/// - A forward jump of more than one stage also requires `force=true` —
///   the intervening stages haven't been completed, so skipping straight
///   past them is itself a forced transition.
/// - A single-step forward transition (the common case) is subject to the
///   same prerequisite/gate checks as before, enforced per `mode` unless
///   `force` bypasses them.
/// - Progressing forward out of `release` is a structural dead-end — there
///   is no tenth stage — and is rejected unconditionally, independent of
///   `force`/`mode`.
pub async fn progress_to(
    accessor: &SafeAccessor,
    task_id: TaskId,
    target: PipelineStage,
    force: bool,
    mode: EnforcementMode,
) -> Result<LifecyclePipeline, CleoError> {
    let (mut pipeline, stages) = load(accessor, task_id).await?;
    let current = current_stage(&stages, &pipeline)?;

    if target == current.stage_name {
        return Ok(pipeline);
    }

    let current_seq = current.stage_name.sequence();
    let target_seq = target.sequence();
    let forward = target_seq > current_seq;

    if !forward && !force {
        return Err(CleoError::lifecycle_transition_denied(
            &current.stage_name.to_string(),
            &target.to_string(),
            "backward transitions require force=true",
        ));
    }

    if forward && current.stage_name == PipelineStage::Release {
        return Err(CleoError::lifecycle_transition_denied(
            "release",
            &target.to_string(),
            "release is the terminal stage; no further transition is possible",
        ));
    }

    let is_adjacent = forward && target_seq == current_seq + 1;
    if forward && !is_adjacent && !force {
        return Err(CleoError::lifecycle_transition_denied(
            &current.stage_name.to_string(),
            &target.to_string(),
            "skipping more than one stage requires force=true",
        ));
    }

    if is_adjacent && !force && mode != EnforcementMode::Off {
        let target_def = stage_def::def_for(target);
        if let Some(missing) = prereqs_satisfied(target_def, &stages, current.stage_name) {
            enforce(mode, CleoError::lifecycle_prerequisite(&target.to_string(), &missing.to_string()))?;
        }
        let current_def = stage_def::def_for(current.stage_name);
        if let Some(missing_gate) = gates_satisfied(accessor, current.id, current_def).await? {
            enforce(mode, CleoError::gate_failed(missing_gate, &current.stage_name.to_string()))?;
        }
    }

    let target_row = stage_row(&stages, target)?;
    let now = chrono::Utc::now();

    let mut left_behind = current.clone();
    if forward {
        left_behind.status = StageStatus::Completed;
        left_behind.completed_at = Some(now);
    } else {
        left_behind.status = StageStatus::Pending;
        left_behind.started_at = None;
        left_behind.completed_at = None;
    }
    cleo_storage::DataAccessor::replace_stage(accessor, &left_behind).await?;

    let mut reopened = target_row.clone();
    reopened.status = StageStatus::InProgress;
    reopened.started_at = Some(now);
    reopened.completed_at = None;
    cleo_storage::DataAccessor::replace_stage(accessor, &reopened).await?;

    pipeline.current_stage_id = reopened.id;
    cleo_storage::DataAccessor::replace_pipeline(accessor, &pipeline).await?;

    let transition = Transition {
        id: 0,
        pipeline_id: pipeline.id,
        from_stage_id: Some(left_behind.id),
        to_stage_id: reopened.id,
        transition_type: if force { TransitionType::Forced } else { TransitionType::Manual },
        created_at: now,
    };
    cleo_storage::DataAccessor::record_transition(accessor, &transition).await?;

    Ok(pipeline)
}

/// Advance the pipeline's current stage to the next stage in canonical
/// order (spec §4.3: "progress (advance current stage)"). Thin wrapper
/// over [`progress_to`] for the common single-step-forward case;
/// `release`'s dead-end is checked here too so the error fires before
/// `ORDERED[current + 1]` would go out of bounds.
pub async fn progress(
    accessor: &SafeAccessor,
    task_id: TaskId,
    force: bool,
    mode: EnforcementMode,
) -> Result<LifecyclePipeline, CleoError> {
    let (pipeline, stages) = load(accessor, task_id).await?;
    let current = current_stage(&stages, &pipeline)?;

    if current.stage_name == PipelineStage::Release {
        return Err(CleoError::lifecycle_transition_denied(
            "release",
            "release",
            "release is the terminal stage; no further transition is possible",
        ));
    }

    let next_stage = PipelineStage::ORDERED[current.stage_name.sequence() as usize + 1];
    progress_to(accessor, task_id, next_stage, force, mode).await
}

/// Mark the current stage `blocked`, recording `reason` (spec §4.3
/// `lifecycle.block`). Does not move the pipeline forward or record a
/// `Transition`.
pub async fn block(accessor: &SafeAccessor, task_id: TaskId, reason: Option<String>) -> Result<LifecycleStageRow, CleoError> {
    let (pipeline, stages) = load(accessor, task_id).await?;
    let mut current = current_stage(&stages, &pipeline)?;
    current.status = StageStatus::Blocked;
    current.blocked_at = Some(chrono::Utc::now());
    current.reason = reason;
    cleo_storage::DataAccessor::replace_stage(accessor, &current).await?;
    Ok(current)
}

/// Lift a `blocked` stage back to `in_progress` (spec §4.3
/// `lifecycle.unblock`).
pub async fn unblock(accessor: &SafeAccessor, task_id: TaskId) -> Result<LifecycleStageRow, CleoError> {
    let (pipeline, stages) = load(accessor, task_id).await?;
    let mut current = current_stage(&stages, &pipeline)?;
    if current.status != StageStatus::Blocked {
        return Err(CleoError::no_change(format!("stage {} is not blocked", current.stage_name)));
    }
    current.status = StageStatus::InProgress;
    current.blocked_at = None;
    current.reason = None;
    cleo_storage::DataAccessor::replace_stage(accessor, &current).await?;
    Ok(current)
}

/// Skip the current stage and advance (spec §4.3: "skip (only on
/// skippable stages or with force)"). Behaves like [`progress`] except
/// the current stage is marked `skipped` rather than `completed`, and the
/// skippability check replaces the outgoing stage's gate check.
pub async fn skip(
    accessor: &SafeAccessor,
    task_id: TaskId,
    reason: Option<String>,
    force: bool,
    mode: EnforcementMode,
) -> Result<LifecyclePipeline, CleoError> {
    let (mut pipeline, stages) = load(accessor, task_id).await?;
    let current = current_stage(&stages, &pipeline)?;

    if current.stage_name == PipelineStage::Release {
        return Err(CleoError::lifecycle_transition_denied(
            "release",
            "release",
            "release is the terminal stage; no further transition is possible",
        ));
    }

    let current_def = stage_def::def_for(current.stage_name);
    if !current_def.skippable && !force {
        enforce(
            mode,
            CleoError::lifecycle_transition_denied(
                &current.stage_name.to_string(),
                "skipped",
                "stage is not skippable; pass force=true to override",
            ),
        )?;
    }

    let next_stage = PipelineStage::ORDERED[current.stage_name.sequence() as usize + 1];
    let next = stage_row(&stages, next_stage)?;
    if !force {
        let next_def = stage_def::def_for(next_stage);
        if let Some(missing) = prereqs_satisfied(next_def, &stages, current.stage_name) {
            enforce(mode, CleoError::lifecycle_prerequisite(&next_stage.to_string(), &missing.to_string()))?;
        }
    }

    let now = chrono::Utc::now();
    let mut skipped_current = current.clone();
    skipped_current.status = StageStatus::Skipped;
    skipped_current.skipped_at = Some(now);
    skipped_current.reason = reason;
    cleo_storage::DataAccessor::replace_stage(accessor, &skipped_current).await?;

    let mut started_next = next.clone();
    started_next.status = StageStatus::InProgress;
    started_next.started_at = Some(now);
    cleo_storage::DataAccessor::replace_stage(accessor, &started_next).await?;

    pipeline.current_stage_id = next.id;
    cleo_storage::DataAccessor::replace_pipeline(accessor, &pipeline).await?;

    let transition = Transition {
        id: 0,
        pipeline_id: pipeline.id,
        from_stage_id: Some(current.id),
        to_stage_id: next.id,
        transition_type: if force { TransitionType::Forced } else { TransitionType::Manual },
        created_at: now,
    };
    cleo_storage::DataAccessor::record_transition(accessor, &transition).await?;

    Ok(pipeline)
}

/// Record a gate result for the current stage (spec §4.3
/// `lifecycle.gate.record`).
pub async fn record_gate(
    accessor: &SafeAccessor,
    task_id: TaskId,
    gate_name: impl Into<String>,
    result: GateOutcome,
    checked_by: impl Into<String>,
    details: Option<String>,
    reason: Option<String>,
) -> Result<GateResult, CleoError> {
    let (pipeline, stages) = load(accessor, task_id).await?;
    let current = current_stage(&stages, &pipeline)?;
    let gate = GateResult {
        id: 0,
        stage_id: current.id,
        gate_name: gate_name.into(),
        result,
        checked_by: checked_by.into(),
        details,
        reason,
        checked_at: chrono::Utc::now(),
    };
    cleo_storage::DataAccessor::record_gate(accessor, &gate).await?;
    Ok(gate)
}

/// Attach evidence to the current stage (spec §4.3 `lifecycle.evidence.add`).
pub async fn add_evidence(
    accessor: &SafeAccessor,
    task_id: TaskId,
    uri: impl Into<String>,
    evidence_type: cleo_core::EvidenceType,
    description: Option<String>,
) -> Result<Evidence, CleoError> {
    let (pipeline, stages) = load(accessor, task_id).await?;
    let current = current_stage(&stages, &pipeline)?;
    let evidence = Evidence { id: 0, stage_id: current.id, uri: uri.into(), evidence_type, description };
    cleo_storage::DataAccessor::add_evidence(accessor, &evidence).await?;
    Ok(evidence)
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
