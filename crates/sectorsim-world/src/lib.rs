#![allow(dead_code, unused_variables, unused_assignments, unused_mut)]
#![allow(clippy::needless_return, clippy::too_many_arguments, clippy::collapsible_if,
         clippy::collapsible_else_if, clippy::field_reassign_with_default,
         clippy::manual_range_contains, clippy::single_match, clippy::comparison_chain,
         clippy::float_cmp, clippy::needless_range_loop, clippy::new_without_default)]
// World module -- sector geometry, object placement and the clipping queries

pub mod defs;
pub mod config;
pub mod level;
pub mod level_builder;
pub mod maputl;
pub mod mobj;
pub mod blockmap;
pub mod occupancy;
pub mod world;
pub mod traverse;
pub mod map_move;
pub mod change_sector;
pub mod slide;
pub mod sight;
pub mod attack;

pub use attack::{AimResult, ShotOutcome};
pub use change_sector::{PlanePart, PlaneResult};
pub use config::WorldConfig;
pub use level::{Level, LevelData, PointLocator};
pub use map_move::{BlockReason, MoveBlock, MoveCheck, MoveResult};
pub use mobj::{Mobj, MobjId, MobjSpawn};
pub use traverse::{Intercept, InterceptKind};
pub use world::{QueryMode, World, WorldEvent};
