//! Per-tick orchestration of every policy.
//!
//! [`FleetEngine::decide`] is a pure function of the snapshot, the carried
//! memory and the injected random source. Policies run in a fixed order and
//! later policies overwrite earlier commands for the same unit:
//!
//! 1. trade planning
//! 2. engagement
//! 3. acquisition
//! 4. repair
//! 5. stall recovery
//! 6. defender designation
//!
//! When the season objective is met, formation flying replaces steps 1-5.
//!
//! # Example
//!
//! ```
//! use fleet_core::config::EngineConfig;
//! use fleet_core::engine::FleetEngine;
//! use fleet_core::memory::EngineMemory;
//! use fleet_core::snapshot::{PlayerAccount, WorldSnapshot};
//! use rand::rngs::SmallRng;
//! use rand::SeedableRng;
//!
//! let engine = FleetEngine::new(EngineConfig::default())?;
//! let snapshot = WorldSnapshot::new(1, 1).with_player(PlayerAccount::new(1, "us", 0, 0));
//! let mut rng = SmallRng::seed_from_u64(0);
//!
//! let decision = engine.decide(&snapshot, &EngineMemory::new(), &mut rng)?;
//! assert!(decision.batch.is_empty());
//! # Ok::<(), fleet_core::error::EngineError>(())
//! ```

use rand::Rng;

use crate::acquisition::{plan_purchase, Purchase};
use crate::classify::Assets;
use crate::command::CommandBatch;
use crate::config::EngineConfig;
use crate::engagement::{EngagementSelector, EngagementState};
use crate::error::Result;
use crate::maintenance::{designate_defender, plan_repairs, record_positions, unstick_traders};
use crate::memory::EngineMemory;
use crate::snapshot::{UnitId, WorldSnapshot};
use crate::spatial::SpatialContext;
use crate::trade::{TradePlanner, TraderPlan};
use crate::victory::{fly_formation, objective_met};

/// Counts describing one decision, for logging and inspection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecisionSummary {
    /// Snapshot tick.
    pub tick: u64,
    /// Traders that fled.
    pub fleeing_traders: usize,
    /// Traders given a new trade.
    pub trading: usize,
    /// Combat units attacking or sidestepping.
    pub engaged: usize,
    /// Construction placed this tick.
    pub purchase: Option<Purchase>,
    /// Units sent to repair.
    pub repairs: usize,
    /// Stalled traders sent home.
    pub unstuck: usize,
    /// Newly named home defender.
    pub defender: Option<UnitId>,
    /// Whether formation flying replaced the normal policies.
    pub objective_met: bool,
}

/// The output of one tick.
#[derive(Debug, Clone)]
pub struct Decision {
    /// Commands to submit, at most one per unit.
    pub batch: CommandBatch,
    /// Memory to carry into the next tick.
    pub memory: EngineMemory,
    /// What happened.
    pub summary: DecisionSummary,
}

/// The fleet decision engine.
#[derive(Debug, Clone)]
pub struct FleetEngine {
    config: EngineConfig,
}

impl FleetEngine {
    /// Create an engine after validating its configuration.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The engine configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Decide this tick's commands.
    ///
    /// On error the caller should keep `memory` and skip the tick.
    pub fn decide<R>(&self, snapshot: &WorldSnapshot, memory: &EngineMemory, rng: &mut R) -> Result<Decision>
    where
        R: Rng + ?Sized,
    {
        let config = &self.config;
        let assets = Assets::classify(snapshot, config)?;

        // Without a flagship nothing owns the sticky target.
        let sticky_target = if assets.flagship.is_some() {
            memory.live_sticky_target(snapshot)
        } else {
            None
        };
        let spatial = SpatialContext::compute(&assets, sticky_target, &config.spatial);

        let mut batch = CommandBatch::new();
        let mut next = memory.clone();
        next.sticky_target = sticky_target;
        let mut summary = DecisionSummary {
            tick: snapshot.tick,
            ..DecisionSummary::default()
        };

        if objective_met(snapshot, &assets, &config.victory) {
            summary.objective_met = true;
            fly_formation(snapshot, &assets, config, &mut batch)?;
        } else {
            let plans = TradePlanner::new(snapshot, &assets, &spatial, config).run(&mut batch)?;
            for plan in plans.values() {
                match plan {
                    TraderPlan::Flee(_) => summary.fleeing_traders += 1,
                    TraderPlan::Trade(_) => summary.trading += 1,
                    TraderPlan::Unchanged | TraderPlan::Idle => {}
                }
            }

            let report = EngagementSelector::new(snapshot, &assets, &spatial, config).run(sticky_target, &mut batch)?;
            next.sticky_target = report.sticky_target;
            summary.engaged = report.states.values().filter(|state| state.is_active()).count();

            let flagship_busy = report.sticky_target.is_some()
                || assets
                    .flagship
                    .is_some_and(|flagship| report.state(flagship.id) != EngagementState::Unengaged);
            summary.purchase = plan_purchase(snapshot, &assets, config, flagship_busy, rng, &mut batch)?;

            summary.repairs = plan_repairs(snapshot, &assets, config, &mut batch)?.len();
            summary.unstuck = unstick_traders(&assets, memory, &mut batch).len();
        }

        record_positions(&assets, &mut next, config);
        summary.defender = designate_defender(&assets, config, rng, &mut batch);

        if let Err(error) = batch.validate(snapshot) {
            tracing::warn!(tick = snapshot.tick, %error, "Dropping invalid batch");
            return Err(error);
        }

        tracing::info!(
            tick = summary.tick,
            commands = batch.len(),
            trading = summary.trading,
            fleeing = summary.fleeing_traders,
            engaged = summary.engaged,
            repairs = summary.repairs,
            unstuck = summary.unstuck,
            objective_met = summary.objective_met,
            "Tick decided"
        );

        Ok(Decision {
            batch,
            memory: next,
            summary,
        })
    }
}
