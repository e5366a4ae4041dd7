//! Cable Trainer MCP Server Implementation
//!
//! This module implements the MCP server using rmcp 0.9's #[tool_router] pattern.
//! Tool calls are routed to a `SessionCoordinator` driving a simulated trainer,
//! so a whole workout can be played end-to-end without hardware.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;

use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::*,
    tool, tool_handler, tool_router, ErrorData as McpError,
};

use tracing::{debug, info, instrument, warn};

use cable_trainer_core::{Error, Result, TrainerConfig, UserSettings, WorkoutState};
use cable_trainer_device::{DeviceLink, SimulatedDevice};
use cable_trainer_session::{
    ExerciseRepository, InMemoryLibrary, InMemorySessionRepository, RoutineRepository,
    SessionCoordinator, SessionPersistencePipeline, WaitCondition,
};

use crate::tools::*;

/// Load per cable the simulated trainer reports with the handles docked.
const RESTING_LOAD_KG: f32 = 1.5;

/// How long a start waits to see the baseline probe before giving up on it.
const BASELINE_PROBE_WAIT: Duration = Duration::from_millis(250);

/// Largest batch `device_simulate_rep` plays at once.
const MAX_SIMULATED_REPS: u32 = 50;

/// Map a controller error onto an MCP error code.
pub fn tool_error(e: Error) -> McpError {
    let code = match e {
        Error::InvalidInput(_)
        | Error::InvalidTransition(_)
        | Error::NoRoutineLoaded
        | Error::NothingToSave
        | Error::SaveInProgress(_)
        | Error::UnsavedSet(_) => ErrorCode(-32602), // Invalid params
        _ => ErrorCode(-32603), // Internal error
    };
    McpError::new(code, e.to_string(), None)
}

fn respond<T: Serialize>(response: &T) -> std::result::Result<CallToolResult, McpError> {
    let text = serde_json::to_string_pretty(response).map_err(|e| {
        McpError::new(
            ErrorCode(-32603),
            format!("Failed to encode response: {e}"),
            None,
        )
    })?;
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

/// Cable Trainer MCP Server
///
/// Owns one workout session on a simulated trainer and exposes it via MCP tools.
#[derive(Clone)]
pub struct TrainerMcpServer {
    /// Session under control
    coordinator: SessionCoordinator,
    /// Trainer the session talks to
    device: Arc<SimulatedDevice>,
    /// Where finished sets land
    repository: Arc<InMemorySessionRepository>,
    /// Exercise definitions and routine templates
    library: Arc<InMemoryLibrary>,
    /// Keeps the settings stream open for the coordinator
    _settings: Arc<watch::Sender<UserSettings>>,
    /// Tool router for handling MCP tool calls
    tool_router: ToolRouter<Self>,
}

impl TrainerMcpServer {
    /// Connect a simulated trainer and start a session.
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn new(config: TrainerConfig) -> Result<Self> {
        config.validate()?;
        let device = Arc::new(SimulatedDevice::new(
            config.device.simulated_device_name.clone(),
        ));
        device.connect().await?;

        let repository = Arc::new(InMemorySessionRepository::new());
        let (settings_tx, settings_rx) = watch::channel(config.session.user_settings());
        let coordinator = SessionCoordinator::new(
            config,
            device.clone(),
            SessionPersistencePipeline::new(repository.clone()),
            settings_rx,
        );
        info!("Trainer server ready: device={}", device.name());

        Ok(Self {
            coordinator,
            device,
            repository,
            library: Arc::new(InMemoryLibrary::seeded()),
            _settings: Arc::new(settings_tx),
            tool_router: Self::tool_router(),
        })
    }

    /// Session under control.
    pub fn coordinator(&self) -> &SessionCoordinator {
        &self.coordinator
    }

    /// Simulated trainer.
    pub fn device(&self) -> &Arc<SimulatedDevice> {
        &self.device
    }

    /// Stored sets.
    pub fn repository(&self) -> &Arc<InMemorySessionRepository> {
        &self.repository
    }

    /// Exercise and routine library.
    pub fn library(&self) -> &Arc<InMemoryLibrary> {
        &self.library
    }

    /// Names of every registered tool.
    pub fn tool_names(&self) -> Vec<String> {
        self.tool_router
            .list_all()
            .into_iter()
            .map(|tool| tool.name.to_string())
            .collect()
    }

    fn workout_state(&self) -> WorkoutState {
        self.coordinator.state().workout_state()
    }

    fn workout_response(&self, changed: bool, message: impl Into<String>) -> WorkoutResponse {
        WorkoutResponse {
            changed,
            workout_state: self.workout_state(),
            message: message.into(),
        }
    }

    fn routine_response(&self, moved: bool, message: impl Into<String>) -> RoutineResponse {
        let snapshot = self.coordinator.snapshot();
        RoutineResponse {
            moved,
            flow: snapshot.flow,
            current_step: snapshot.routine.as_ref().map(|r| r.current_step),
            resume_point: snapshot.routine.and_then(|r| r.resume_point),
            message: message.into(),
        }
    }

    // ------------------------------------------------------------------
    // Operations behind the tools
    // ------------------------------------------------------------------

    /// Full session status.
    pub fn status(&self) -> StatusResponse {
        StatusResponse {
            snapshot: self.coordinator.snapshot(),
            connected: self.device.connection_state().borrow().is_connected(),
            sessions_saved: self.repository.session_count(),
        }
    }

    /// Start the staged set, or a Just Lift set.
    pub async fn start(&self, params: StartParams) -> Result<WorkoutResponse> {
        let before = self.workout_state();
        let needs_baseline = self.coordinator.snapshot().load_baseline_kg.is_none();

        let coordinator = self.coordinator.clone();
        let start = tokio::spawn(async move {
            coordinator
                .start_workout(params.skip_countdown, params.just_lift)
                .await
        });

        if needs_baseline {
            // the simulated trainer answers the baseline probe with its resting load
            let probe = self
                .coordinator
                .wait_for(&WaitCondition::for_state("initializing").with_timeout(BASELINE_PROBE_WAIT))
                .await;
            if probe.condition_met {
                self.device.emit_sample(0.0, 0.0, RESTING_LOAD_KG, 100);
            }
        }

        start
            .await
            .map_err(|e| Error::Other(format!("start task failed: {e}")))??;

        let after = self.workout_state();
        let changed = before != after;
        Ok(self.workout_response(
            changed,
            if changed {
                format!("Set starting: {after}")
            } else {
                format!("Start ignored while {after}")
            },
        ))
    }

    /// Stop the running set.
    pub async fn stop(&self, params: StopParams) -> Result<WorkoutResponse> {
        let before = self.workout_state();
        self.coordinator.stop_workout(params.exit_workout).await?;
        let changed = before != self.workout_state();
        Ok(self.workout_response(
            changed,
            if params.exit_workout {
                "Workout exited"
            } else if changed {
                "Set stopped"
            } else {
                "No set to stop"
            },
        ))
    }

    /// Pause the active set.
    pub fn pause(&self) -> WorkoutResponse {
        let changed = self.coordinator.pause_workout();
        self.workout_response(changed, if changed { "Set paused" } else { "Nothing to pause" })
    }

    /// Resume the paused set.
    pub fn resume(&self) -> WorkoutResponse {
        let changed = self.coordinator.resume_workout();
        self.workout_response(changed, if changed { "Set resumed" } else { "Nothing to resume" })
    }

    /// Drop the current set and return to idle.
    pub fn reset(&self) -> WorkoutResponse {
        self.coordinator.reset_for_new_workout();
        self.workout_response(true, "Session reset")
    }

    /// Log RPE for the set in the summary.
    pub async fn log_rpe(&self, params: RpeParams) -> Result<WorkoutResponse> {
        let logged = self.coordinator.log_rpe_for_current_set(params.rpe).await?;
        Ok(self.workout_response(
            logged,
            if logged {
                format!("RPE {} logged", params.rpe)
            } else {
                "No set summary to rate".to_string()
            },
        ))
    }

    /// Leave the set summary.
    pub async fn proceed(&self) -> Result<WorkoutResponse> {
        self.coordinator.proceed_from_summary().await?;
        Ok(self.workout_response(true, format!("Now {}", self.workout_state())))
    }

    /// Save the summary's set again after a failed save.
    pub async fn retry_save(&self) -> Result<SaveResponse> {
        let outcome = self.coordinator.retry_save().await?;
        Ok(SaveResponse {
            is_personal_record: outcome.is_personal_record,
            badges: outcome.badges,
            sessions_saved: self.repository.session_count(),
            message: if outcome.is_personal_record {
                "Set saved: new personal record".to_string()
            } else {
                "Set saved".to_string()
            },
        })
    }

    /// Throw away a set that could not be saved.
    pub fn discard_set(&self) -> Result<WorkoutResponse> {
        let session_id = self.coordinator.discard_unsaved_set()?;
        Ok(self.workout_response(true, format!("Discarded unsaved set {session_id}")))
    }

    /// End the running rest.
    pub fn skip_rest(&self) -> WorkoutResponse {
        let changed = self.coordinator.skip_rest();
        self.workout_response(changed, if changed { "Rest skipped" } else { "No rest running" })
    }

    /// Lengthen the running rest.
    pub fn add_rest(&self, params: RestParams) -> Result<WorkoutResponse> {
        if params.seconds == 0 {
            return Err(Error::InvalidInput("seconds must be > 0".to_string()));
        }
        let changed = self.coordinator.add_rest_time(params.seconds);
        Ok(self.workout_response(
            changed,
            if changed {
                format!("Added {}s of rest", params.seconds)
            } else {
                "No rest running".to_string()
            },
        ))
    }

    /// Switch to Just Lift.
    pub async fn just_lift(&self) -> Result<WorkoutResponse> {
        self.coordinator.prepare_for_just_lift().await?;
        Ok(self.workout_response(
            true,
            "Just Lift ready: grab the handles to start",
        ))
    }

    /// Wait for the workout state to change.
    pub async fn wait(&self, params: WaitParams) -> WaitResponse {
        let condition = WaitCondition {
            states: params.states,
            gone: params.gone,
            timeout: Duration::from_millis(params.timeout_ms),
        };
        let result = self.coordinator.wait_for(&condition).await;
        if result.condition_met {
            info!("Condition met after {}ms", result.waited_ms);
        } else {
            warn!("Condition not met, timeout after {}ms", result.waited_ms);
        }
        WaitResponse {
            condition_met: result.condition_met,
            waited_ms: result.waited_ms,
            message: if result.condition_met {
                format!("Reached {} after {}ms", result.state, result.waited_ms)
            } else {
                format!("Timeout after {}ms in {}", result.waited_ms, result.state)
            },
            workout_state: result.state,
        }
    }

    /// Load a built-in routine.
    pub async fn load_sample(&self, params: LoadSampleParams) -> Result<RoutineResponse> {
        self.load(LoadRoutineParams {
            routine_id: params.routine.routine_id().to_string(),
            stage_first_set: params.stage_first_set,
        })
        .await
    }

    /// Load a routine from the library.
    pub async fn load(&self, params: LoadRoutineParams) -> Result<RoutineResponse> {
        let routine = self
            .coordinator
            .load_routine_from(self.library.as_ref(), &params.routine_id)
            .await?;
        if params.stage_first_set {
            self.coordinator.enter_set_ready()?;
        }
        Ok(self.routine_response(true, format!("Loaded '{}'", routine.name)))
    }

    /// Stored routines.
    pub async fn list_routines(&self) -> Result<RoutineListResponse> {
        let routines = self.library.list_routines().await?;
        Ok(RoutineListResponse {
            routines: routines.iter().map(RoutineSummary::from).collect(),
        })
    }

    /// Exercise definitions, optionally narrowed to hybrid or one kind.
    pub async fn list_exercises(
        &self,
        params: ExerciseListParams,
    ) -> Result<ExerciseListResponse> {
        let exercises = if params.hybrid_only {
            self.library.hybrid_exercises(params.exercise_type).await?
        } else {
            let mut exercises = self.library.list_exercises().await?;
            if let Some(kind) = params.exercise_type {
                exercises.retain(|e| e.exercise_type == kind);
            }
            exercises
        };
        Ok(ExerciseListResponse {
            count: exercises.len(),
            exercises,
        })
    }

    /// Change weight, reps, or echo settings of the staged set.
    pub fn adjust_set(&self, params: AdjustSetParams) -> Result<RoutineResponse> {
        self.coordinator.update_set_ready(params.into())?;
        Ok(self.routine_response(false, "Staged set adjusted"))
    }

    /// Move to the next routine step.
    pub fn next_step(&self) -> RoutineResponse {
        let moved = self.coordinator.next_step();
        self.routine_response(moved, if moved { "Moved forward" } else { "Cannot move forward" })
    }

    /// Move to the previous routine step.
    pub fn previous_step(&self) -> RoutineResponse {
        let moved = self.coordinator.previous_step();
        self.routine_response(moved, if moved { "Moved back" } else { "Cannot move back" })
    }

    /// Skip the current exercise.
    pub fn skip_exercise(&self) -> RoutineResponse {
        let moved = self.coordinator.skip_exercise();
        self.routine_response(moved, if moved { "Exercise skipped" } else { "Nothing to skip" })
    }

    /// Jump to an exercise by index.
    pub fn jump(&self, params: JumpParams) -> RoutineResponse {
        let moved = self.coordinator.jump_to_exercise(params.exercise_index);
        self.routine_response(
            moved,
            if moved {
                format!("Jumped to exercise {}", params.exercise_index)
            } else {
                format!("Cannot jump to exercise {}", params.exercise_index)
            },
        )
    }

    /// Play reps on the simulated trainer.
    pub fn simulate_reps(&self, params: SimulateRepParams) -> Result<DeviceResponse> {
        if params.count == 0 || params.count > MAX_SIMULATED_REPS {
            return Err(Error::InvalidInput(format!(
                "count must be within 1-{MAX_SIMULATED_REPS}, got {}",
                params.count
            )));
        }
        if params.top_mm <= params.bottom_mm {
            return Err(Error::InvalidInput(format!(
                "top_mm ({}) must be above bottom_mm ({})",
                params.top_mm, params.bottom_mm
            )));
        }
        for _ in 0..params.count {
            self.device
                .simulate_rep(params.bottom_mm, params.top_mm, params.load_kg);
        }
        debug!("Simulated {} rep(s)", params.count);
        Ok(DeviceResponse {
            workout_state: self.workout_state(),
            message: format!("Played {} rep(s)", params.count),
        })
    }

    /// Grab or release the simulated handles.
    pub fn set_handles(&self, params: HandleParams) -> DeviceResponse {
        self.device.set_handle_state(params.state);
        DeviceResponse {
            workout_state: self.workout_state(),
            message: format!("Handles {:?}", params.state).to_lowercase(),
        }
    }
}

#[tool_router]
impl TrainerMcpServer {
    /// Report the workout session
    #[tool(
        description = "Report the workout state, rep counts, routine position, auto-stop progress, and running timers"
    )]
    #[instrument(skip_all)]
    async fn workout_status(
        &self,
        Parameters(_params): Parameters<EmptyParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        debug!("Reporting workout status");
        respond(&self.status())
    }

    /// Start a set
    #[tool(description = "Start the staged set (or a Just Lift set), with or without the countdown")]
    #[instrument(skip_all)]
    async fn workout_start(
        &self,
        Parameters(params): Parameters<StartParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        info!(
            "Starting set: skip_countdown={}, just_lift={}",
            params.skip_countdown, params.just_lift
        );
        respond(&self.start(params).await.map_err(tool_error)?)
    }

    /// Stop the set
    #[tool(description = "Stop the running set and show its summary, or exit the workout entirely")]
    #[instrument(skip_all)]
    async fn workout_stop(
        &self,
        Parameters(params): Parameters<StopParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        info!("Stopping set: exit_workout={}", params.exit_workout);
        respond(&self.stop(params).await.map_err(tool_error)?)
    }

    /// Pause the set
    #[tool(description = "Pause the active set")]
    #[instrument(skip_all)]
    async fn workout_pause(
        &self,
        Parameters(_params): Parameters<EmptyParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        respond(&self.pause())
    }

    /// Resume the set
    #[tool(description = "Resume a paused set")]
    #[instrument(skip_all)]
    async fn workout_resume(
        &self,
        Parameters(_params): Parameters<EmptyParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        respond(&self.resume())
    }

    /// Reset the session
    #[tool(description = "Discard the current set and return to idle, keeping parameters")]
    #[instrument(skip_all)]
    async fn workout_reset(
        &self,
        Parameters(_params): Parameters<EmptyParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        respond(&self.reset())
    }

    /// Log RPE
    #[tool(description = "Log the rating of perceived exertion (1-10) for the set in the summary")]
    #[instrument(skip_all)]
    async fn workout_log_rpe(
        &self,
        Parameters(params): Parameters<RpeParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        respond(&self.log_rpe(params).await.map_err(tool_error)?)
    }

    /// Leave the summary
    #[tool(
        description = "Leave the set summary: rest before the next routine set, return to idle, or complete the workout"
    )]
    #[instrument(skip_all)]
    async fn workout_proceed(
        &self,
        Parameters(_params): Parameters<EmptyParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        respond(&self.proceed().await.map_err(tool_error)?)
    }

    /// Retry a failed save
    #[tool(description = "Save the set in the summary again after a storage failure")]
    #[instrument(skip_all)]
    async fn workout_retry_save(
        &self,
        Parameters(_params): Parameters<EmptyParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        respond(&self.retry_save().await.map_err(tool_error)?)
    }

    /// Discard an unsaved set
    #[tool(
        description = "Throw away a finished set that could not be saved, so the workout can move on"
    )]
    #[instrument(skip_all)]
    async fn workout_discard_set(
        &self,
        Parameters(_params): Parameters<EmptyParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        respond(&self.discard_set().map_err(tool_error)?)
    }

    /// Skip the rest
    #[tool(description = "End the rest between sets early")]
    #[instrument(skip_all)]
    async fn workout_skip_rest(
        &self,
        Parameters(_params): Parameters<EmptyParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        respond(&self.skip_rest())
    }

    /// Add rest time
    #[tool(description = "Add seconds to the running rest")]
    #[instrument(skip_all)]
    async fn workout_add_rest(
        &self,
        Parameters(params): Parameters<RestParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        respond(&self.add_rest(params).map_err(tool_error)?)
    }

    /// Switch to Just Lift
    #[tool(
        description = "Switch to Just Lift: free-form lifting that starts when the handles are grabbed and stops on its own"
    )]
    #[instrument(skip_all)]
    async fn workout_just_lift(
        &self,
        Parameters(_params): Parameters<EmptyParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        respond(&self.just_lift().await.map_err(tool_error)?)
    }

    /// Wait for a state
    #[tool(description = "Wait until the workout reaches (or leaves) one of the given states")]
    #[instrument(skip_all)]
    async fn workout_wait(
        &self,
        Parameters(params): Parameters<WaitParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        info!(
            "Waiting for states={:?}, gone={}, timeout={}ms",
            params.states, params.gone, params.timeout_ms
        );
        respond(&self.wait(params).await)
    }

    /// Load a sample routine
    #[tool(description = "Load a built-in routine template and optionally stage its first set")]
    #[instrument(skip_all)]
    async fn routine_load_sample(
        &self,
        Parameters(params): Parameters<LoadSampleParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        respond(&self.load_sample(params).await.map_err(tool_error)?)
    }

    /// Load a routine by id
    #[tool(
        description = "Load a routine from the library by id and optionally stage its first set"
    )]
    #[instrument(skip_all)]
    async fn routine_load(
        &self,
        Parameters(params): Parameters<LoadRoutineParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        info!("Loading routine {}", params.routine_id);
        respond(&self.load(params).await.map_err(tool_error)?)
    }

    /// List routines
    #[tool(description = "List the routines stored in the library")]
    #[instrument(skip_all)]
    async fn routine_list(
        &self,
        Parameters(_params): Parameters<EmptyParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        respond(&self.list_routines().await.map_err(tool_error)?)
    }

    /// Adjust the staged set
    #[tool(
        description = "Change the weight, rep target, echo level, or eccentric load of the staged set"
    )]
    #[instrument(skip_all)]
    async fn routine_adjust_set(
        &self,
        Parameters(params): Parameters<AdjustSetParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        respond(&self.adjust_set(params).map_err(tool_error)?)
    }

    /// List exercises
    #[tool(
        description = "List exercise definitions; hybrid_only keeps the ones done away from the cable machine, exercise_type narrows to one kind"
    )]
    #[instrument(skip_all)]
    async fn exercise_list(
        &self,
        Parameters(params): Parameters<ExerciseListParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        respond(&self.list_exercises(params).await.map_err(tool_error)?)
    }

    /// Next routine step
    #[tool(description = "Move to the next set in the routine (superset-aware)")]
    #[instrument(skip_all)]
    async fn routine_next_step(
        &self,
        Parameters(_params): Parameters<EmptyParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        respond(&self.next_step())
    }

    /// Previous routine step
    #[tool(description = "Move to the previous set in the routine (superset-aware)")]
    #[instrument(skip_all)]
    async fn routine_previous_step(
        &self,
        Parameters(_params): Parameters<EmptyParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        respond(&self.previous_step())
    }

    /// Skip the exercise
    #[tool(description = "Skip the remaining sets of the current exercise")]
    #[instrument(skip_all)]
    async fn routine_skip_exercise(
        &self,
        Parameters(_params): Parameters<EmptyParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        respond(&self.skip_exercise())
    }

    /// Jump to an exercise
    #[tool(description = "Jump to an exercise by index and stage its first open set")]
    #[instrument(skip_all)]
    async fn routine_jump_to_exercise(
        &self,
        Parameters(params): Parameters<JumpParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        respond(&self.jump(params))
    }

    /// Play reps
    #[tool(description = "Play full reps on the simulated trainer")]
    #[instrument(skip_all)]
    async fn device_simulate_rep(
        &self,
        Parameters(params): Parameters<SimulateRepParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        respond(&self.simulate_reps(params).map_err(tool_error)?)
    }

    /// Grab or release handles
    #[tool(description = "Grab or release the handles of the simulated trainer")]
    #[instrument(skip_all)]
    async fn device_set_handles(
        &self,
        Parameters(params): Parameters<HandleParams>,
    ) -> std::result::Result<CallToolResult, McpError> {
        respond(&self.set_handles(params))
    }
}

// `#[tool_handler]` expands to an unqualified `Result<_, _>`, which would
// otherwise pick up `cable_trainer_core::Result`.
mod handler {
    use super::*;
    use std::result::Result;

    // Implement the ServerHandler trait to define server capabilities
    #[tool_handler]
    impl rmcp::ServerHandler for TrainerMcpServer {
        fn get_info(&self) -> ServerInfo {
            ServerInfo {
                instructions: Some(
                    "Cable Trainer MCP Server - Drive a workout session on a simulated cable trainer. \
                     Use routine_list and routine_load (or routine_load_sample) to stage a routine, \
                     workout_start to begin a set, device_simulate_rep to lift, workout_stop and \
                     workout_proceed to move on, and workout_status to inspect everything. \
                     A set whose save failed must be retried (workout_retry_save) or discarded \
                     (workout_discard_set) before the workout moves on."
                        .into(),
                ),
                capabilities: ServerCapabilities::builder().enable_tools().build(),
                ..Default::default()
            }
        }
    }
}
