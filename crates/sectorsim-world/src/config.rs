// config.rs -- engine tunables backed by console variables

use sectorsim_common::common::com_dprintf;
use sectorsim_common::cvar::{cvar_get, cvar_init, cvar_variable_value};
use sectorsim_common::shared::{CVAR_ARCHIVE, CVAR_LATCH, CVAR_ZERO};

use crate::defs::{MAXDROPOFF, MAXSTEP, MELEERANGE, MISSILERANGE, SLIDEBUMPS, USERANGE};

/// Snapshot of the movement and query tunables. A world copies one of these
/// at construction; later cvar changes need a new snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldConfig {
    /// highest floor step a walker can climb
    pub max_step: f32,
    /// deepest ledge a walker will stand over
    pub max_dropoff: f32,
    pub slide_bumps: u32,
    pub use_range: f32,
    pub melee_range: f32,
    pub missile_range: f32,
    /// seed for the world's damage rolls
    pub rng_seed: u64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            max_step: MAXSTEP,
            max_dropoff: MAXDROPOFF,
            slide_bumps: SLIDEBUMPS,
            use_range: USERANGE,
            melee_range: MELEERANGE,
            missile_range: MISSILERANGE,
            rng_seed: 0x5EC7_0A51,
        }
    }
}

/// Register the engine cvars with their default values. Existing values
/// are left alone.
pub fn register_cvars() {
    cvar_init();
    let d = WorldConfig::default();
    cvar_get("sv_maxstep", &d.max_step.to_string(), CVAR_LATCH);
    cvar_get("sv_maxdropoff", &d.max_dropoff.to_string(), CVAR_LATCH);
    cvar_get("sv_slidebumps", &d.slide_bumps.to_string(), CVAR_LATCH);
    cvar_get("sv_userange", &d.use_range.to_string(), CVAR_ARCHIVE);
    cvar_get("sv_meleerange", &d.melee_range.to_string(), CVAR_ARCHIVE);
    cvar_get("sv_missilerange", &d.missile_range.to_string(), CVAR_ARCHIVE);
    cvar_get("developer", "0", CVAR_ZERO);
}

fn positive_or(name: &str, fallback: f32) -> f32 {
    let v = cvar_variable_value(name);
    if v > 0.0 {
        v
    } else {
        com_dprintf(&format!("{} is not positive, using {}\n", name, fallback));
        fallback
    }
}

impl WorldConfig {
    /// Read the registered cvars. Non-positive values fall back to defaults.
    pub fn from_cvars() -> Self {
        register_cvars();
        let d = WorldConfig::default();
        Self {
            max_step: positive_or("sv_maxstep", d.max_step),
            max_dropoff: positive_or("sv_maxdropoff", d.max_dropoff),
            slide_bumps: positive_or("sv_slidebumps", d.slide_bumps as f32) as u32,
            use_range: positive_or("sv_userange", d.use_range),
            melee_range: positive_or("sv_meleerange", d.melee_range),
            missile_range: positive_or("sv_missilerange", d.missile_range),
            rng_seed: d.rng_seed,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng_seed = seed;
        self
    }
}
