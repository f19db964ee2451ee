//! Header-backed randomness
//!
//! The seed for a block is `Keccak512(randao_mix ‖ height)`. The mix comes
//! from the block header, so no transaction sender can pick it.

use crate::domain::{BlockContext, Seed};
use crate::ports::RandomnessSource;

#[derive(Clone, Copy, Debug, Default)]
pub struct HeaderRandomness;

impl RandomnessSource for HeaderRandomness {
    fn seed(&self, ctx: &BlockContext) -> Seed {
        Seed::from_parts(&[&ctx.randao_mix, &ctx.height.to_be_bytes()])
    }
}
