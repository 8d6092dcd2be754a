//! Scheduling of restarts, reductions and search mode switches.
use std::time::{Duration, Instant};

use log::info;

use partial_ref::{partial, PartialRef};

use crate::cdcl::{conflict_step, SearchStep};
use crate::clause::reduce::reduce;
use crate::config::SolverConfig;
use crate::context::{
    AnalyzeConflictP, AssignmentP, BinaryClausesP, ClauseAllocP, ClauseDbP, Context, ImplGraphP,
    PhasesP, ScheduleP, SolverConfigP, SolverStateP, StatsP, TmpDataP, TrailP, VmtfP, VsidsP,
    WatchlistsP,
};
use crate::prop::backtrack;
use crate::rng::Rng;
use crate::state::SatState;
use crate::stats::Stats;

mod ema;
mod luby;

use ema::Ema;
use luby::LubySequence;

/// The two alternating search modes.
///
/// The focused mode restarts aggressively based on the quality of recent learned clauses and
/// decides with the move-to-front heuristic. The stable mode restarts on the slow reluctant
/// doubling schedule, decides by activity and steers phases towards the best trail seen.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum SearchMode {
    Focused,
    Stable,
}

/// Scheduling state for restarts, reductions and mode switches.
pub struct Schedule {
    pub(crate) mode: SearchMode,
    pub(crate) rng: Rng,
    /// Remaining length of the current random decision sequence.
    pub(crate) random_remaining: u64,
    next_random: u64,
    glue_fast: Ema,
    glue_slow: Ema,
    luby: LubySequence,
    next_restart: u64,
    restart_factor: f64,
    next_reduce: u64,
    reduce_scale: f64,
    next_mode_switch: u64,
    search_start: Option<Instant>,
    reduce_time: Duration,
}

/// Window of the fast glue average in conflicts.
const GLUE_FAST_WINDOW: u64 = 32;
/// Window of the slow glue average in conflicts.
const GLUE_SLOW_WINDOW: u64 = 8192;

impl Default for Schedule {
    fn default() -> Schedule {
        Schedule {
            mode: SearchMode::Focused,
            rng: Rng::new(SolverConfig::default().random_seed),
            random_remaining: 0,
            next_random: 0,
            glue_fast: Ema::new(GLUE_FAST_WINDOW),
            glue_slow: Ema::new(GLUE_SLOW_WINDOW),
            luby: LubySequence::default(),
            next_restart: 0,
            restart_factor: 1.0,
            next_reduce: 0,
            reduce_scale: 1.0,
            next_mode_switch: 0,
            search_start: None,
            reduce_time: Duration::from_secs(0),
        }
    }
}

impl Schedule {
    /// Reseed the pseudo random sequences.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = Rng::new(seed);
    }

    /// The active search mode.
    pub fn mode(&self) -> SearchMode {
        self.mode
    }
}

/// Perform one step of the schedule.
///
/// Runs the search until the next conflict is resolved and fires the per-conflict triggers:
/// clause database reduction, restarts and search mode switches. Returns `false` when the search
/// is finished or was interrupted by a limit or cancellation.
pub fn schedule_step(
    mut ctx: partial!(
        Context,
        mut AnalyzeConflictP,
        mut AssignmentP,
        mut BinaryClausesP,
        mut ClauseAllocP,
        mut ClauseDbP,
        mut ImplGraphP,
        mut PhasesP,
        mut ScheduleP,
        mut SolverStateP,
        mut StatsP,
        mut TmpDataP,
        mut TrailP,
        mut VmtfP,
        mut VsidsP,
        mut WatchlistsP,
        SolverConfigP,
    ),
) -> bool {
    if ctx.part(SolverStateP).sat_state != SatState::Unknown {
        return false;
    }

    init_budgets(ctx.borrow());

    let glue = match conflict_step(ctx.borrow()) {
        SearchStep::Done => return false,
        SearchStep::Interrupted => return false,
        SearchStep::Conflict { glue } => glue,
    };

    if ctx.part(SolverStateP).sat_state != SatState::Unknown {
        return false;
    }

    {
        let schedule = ctx.part_mut(ScheduleP);
        schedule.glue_fast.update(glue as f64);
        schedule.glue_slow.update(glue as f64);
    }

    log_progress(ctx.borrow());

    let conflicts = ctx.part(StatsP).conflicts;

    if ctx.part(SolverConfigP).reduce && conflicts >= ctx.part(ScheduleP).next_reduce {
        reduce_step(ctx.borrow());
    }

    if ctx.part(SolverConfigP).restart && conflicts >= ctx.part(ScheduleP).next_restart {
        restart_step(ctx.borrow());
    }

    if ctx.part(SolverConfigP).stable && conflicts >= ctx.part(ScheduleP).next_mode_switch {
        switch_mode(ctx.borrow());
    }

    if ctx.part(SolverConfigP).random_decisions && conflicts >= ctx.part(ScheduleP).next_random {
        let interval = ctx.part(SolverConfigP).random_decision_interval;
        let length = ctx.part(SolverConfigP).random_decision_length;
        let schedule = ctx.part_mut(ScheduleP);
        schedule.random_remaining = length;
        schedule.next_random = conflicts + interval;
    }

    true
}

/// Initialize the conflict budgets when the search starts.
fn init_budgets(mut ctx: partial!(Context, mut ScheduleP, SolverConfigP)) {
    let (config, mut ctx) = ctx.split_part(SolverConfigP);
    let schedule = ctx.part_mut(ScheduleP);

    if schedule.search_start.is_none() {
        schedule.search_start = Some(Instant::now());
        schedule.next_restart = config.restart_interval;
        schedule.next_reduce = config.reduce_interval;
        schedule.next_mode_switch = config.switch_interval;
        schedule.next_random = config.random_decision_interval;
    }
}

/// Log search progress every few thousand conflicts.
fn log_progress(
    ctx: partial!(
        Context,
        AssignmentP,
        BinaryClausesP,
        ClauseDbP,
        ScheduleP,
        StatsP,
        TrailP,
    ),
) {
    let stats = ctx.part(StatsP);

    if stats.conflicts % 5000 != 0 {
        return;
    }

    let db = ctx.part(ClauseDbP);
    let units = ctx.part(TrailP).top_level_assignment_count();
    info!(
        "confl: {}k rest: {} red: {} vars: {} bin: {} irred: {} learned: {} mode: {:?}",
        stats.conflicts / 1000,
        stats.restarts,
        stats.reductions,
        ctx.part(AssignmentP).assignment().len() - units,
        ctx.part(BinaryClausesP).count(),
        db.irredundant_count(),
        db.redundant_count(),
        ctx.part(ScheduleP).mode(),
    );
}

/// Run a clause database reduction and schedule the next one.
///
/// The interval to the next reduction is the base interval scaled by the square root of the
/// number of reductions so far. The adaptive scale additionally reacts to the measured fraction
/// of time spent reducing, smoothed to keep it from oscillating.
fn reduce_step(
    mut ctx: partial!(
        Context,
        mut ClauseAllocP,
        mut ClauseDbP,
        mut ImplGraphP,
        mut ScheduleP,
        mut StatsP,
        mut WatchlistsP,
        AssignmentP,
        SolverConfigP,
        TrailP,
    ),
) {
    let reduce_start = Instant::now();

    reduce(ctx.borrow());

    let (config, mut ctx) = ctx.split_part(SolverConfigP);
    let (stats, mut ctx) = ctx.split_part(StatsP);
    let schedule = ctx.part_mut(ScheduleP);

    schedule.reduce_time += reduce_start.elapsed();

    let scale = if config.reduce_adaptive {
        update_reduce_scale(schedule, config)
    } else {
        1.0
    };

    let interval = config.reduce_interval as f64 * scale * (stats.reductions as f64).sqrt();
    schedule.next_reduce = stats.conflicts + (interval as u64).max(1);
}

/// Adapt the reduce interval scale to the measured reduction overhead.
fn update_reduce_scale(schedule: &mut Schedule, config: &SolverConfig) -> f64 {
    let total = schedule
        .search_start
        .map(|start| start.elapsed())
        .unwrap_or_else(|| Duration::from_secs(0));

    let overhead = schedule.reduce_time.as_secs_f64() / total.as_secs_f64().max(1e-9);

    let mut target = schedule.reduce_scale;
    if overhead > 0.02 {
        target *= 1.25;
    } else if overhead < 0.005 {
        target *= 0.8;
    }
    target = target.max(0.70).min(1.50);

    // Smoothing keeps a single slow or fast reduction from swinging the interval
    schedule.reduce_scale = 0.85 * schedule.reduce_scale + 0.15 * target;

    1.0 + (schedule.reduce_scale - 1.0) * config.reduce_factor as f64 / 100.0
}

/// Restart if the active mode's policy asks for one and schedule the next restart.
fn restart_step(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut ScheduleP,
        mut StatsP,
        mut TrailP,
        mut VmtfP,
        mut VsidsP,
        SolverConfigP,
    ),
) {
    let (config, mut ctx) = ctx.split_part(SolverConfigP);

    let restart_now = match ctx.part(ScheduleP).mode {
        // In focused mode a restart additionally requires the recently learned clauses to be
        // worse than the long time average.
        SearchMode::Focused => {
            let schedule = ctx.part(ScheduleP);
            let margin = 1.0 + config.restart_margin as f64 / 100.0;
            schedule.glue_fast.get() > schedule.glue_slow.get() * margin
        }
        SearchMode::Stable => true,
    };

    if restart_now && ctx.part(TrailP).current_level() > 0 {
        let backtrack_to = if config.restart_reuse_trail {
            reused_trail_level(ctx.borrow())
        } else {
            0
        };

        backtrack(ctx.borrow(), backtrack_to);

        let stats = ctx.part_mut(StatsP);
        stats.restarts += 1;
        if backtrack_to > 0 {
            stats.reused_trails += 1;
        }
    }

    let interval = {
        let mut inner_ctx: partial!(Context, StatsP, mut ScheduleP) = ctx.borrow();
        let (stats, mut inner_ctx) = inner_ctx.split_part(StatsP);
        let schedule = inner_ctx.part_mut(ScheduleP);
        match schedule.mode {
            SearchMode::Stable => config.restart_stable_scale * schedule.luby.advance(),
            SearchMode::Focused => {
                if config.restart_adaptive {
                    schedule.restart_factor = adaptive_restart_factor(schedule, stats);
                    (config.restart_interval as f64 * schedule.restart_factor) as u64
                } else {
                    config.restart_interval
                }
            }
        }
    };

    let conflicts = ctx.part(StatsP).conflicts;
    ctx.part_mut(ScheduleP).next_restart = conflicts + interval.max(1);
}

/// Interval factor combining the glue trend and the decision rate.
///
/// A stable glue average and a high decision rate both point towards a productive search that
/// should be disturbed less often.
fn adaptive_restart_factor(schedule: &Schedule, stats: &Stats) -> f64 {
    let fast = schedule.glue_fast.get();
    let stability = if fast > 0.0 {
        schedule.glue_slow.get() / fast
    } else {
        1.0
    };

    let decision_rate = stats.decisions as f64 / stats.conflicts.max(1) as f64;

    (stability * (0.75 + decision_rate / 8.0)).max(0.5).min(3.0)
}

/// The deepest decision level whose decisions the active heuristic would make again.
///
/// Walking the trail from the first decision, a level survives the restart when its decision
/// variable still ranks above every currently unassigned variable. Everything deeper is undone.
fn reused_trail_level(
    mut ctx: partial!(
        Context,
        mut VmtfP,
        mut VsidsP,
        AssignmentP,
        ScheduleP,
        TrailP
    ),
) -> usize {
    let mode = ctx.part(ScheduleP).mode;
    let (trail, mut ctx) = ctx.split_part(TrailP);
    let (assignment, mut ctx) = ctx.split_part(AssignmentP);

    let mut level = 0;

    match mode {
        SearchMode::Focused => {
            let vmtf = ctx.part_mut(VmtfP);
            let best = match vmtf.next_unassigned(assignment) {
                Some(var) => vmtf.stamp(var),
                None => return 0,
            };

            while level < trail.current_level() {
                let decision = trail.decision(level + 1);
                if vmtf.stamp(decision.var()) > best {
                    level += 1;
                } else {
                    break;
                }
            }
        }
        SearchMode::Stable => {
            let vsids = ctx.part_mut(VsidsP);
            let best = match vsids.peek_unassigned(assignment) {
                Some(var) => var,
                None => return 0,
            };

            while level < trail.current_level() {
                let decision = trail.decision(level + 1);
                if vsids.ranks_above(decision.var(), best) {
                    level += 1;
                } else {
                    break;
                }
            }
        }
    }

    level
}

/// Switch between the focused and the stable search mode.
///
/// The glue averages restart from scratch, the target phases are re-established by the new mode
/// and the restart schedule of the new mode takes over.
fn switch_mode(
    mut ctx: partial!(
        Context,
        mut PhasesP,
        mut ScheduleP,
        StatsP,
        SolverConfigP
    ),
) {
    let (config, mut ctx) = ctx.split_part(SolverConfigP);
    let conflicts = ctx.part(StatsP).conflicts;
    let schedule = ctx.part_mut(ScheduleP);

    schedule.mode = match schedule.mode {
        SearchMode::Focused => SearchMode::Stable,
        SearchMode::Stable => SearchMode::Focused,
    };

    schedule.glue_fast = Ema::new(GLUE_FAST_WINDOW);
    schedule.glue_slow = Ema::new(GLUE_SLOW_WINDOW);
    schedule.next_mode_switch = conflicts + config.switch_interval;
    schedule.next_restart = conflicts
        + match schedule.mode {
            SearchMode::Focused => config.restart_interval,
            SearchMode::Stable => config.restart_stable_scale,
        };

    ctx.part_mut(PhasesP).reset_best();

    info!("switching to {:?} search", ctx.part(ScheduleP).mode());
}
