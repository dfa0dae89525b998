use cucumber::given;

use crate::cucumber::{ledger_world::LoyaltySystem, LedgerWorld};

#[given("a fresh install")]
async fn fresh_database(world: &mut LedgerWorld) {
    let system = LoyaltySystem::new().await;
    world.system = Some(system);
}
