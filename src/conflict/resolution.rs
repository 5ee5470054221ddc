//! War resolution: sector capture and reward distribution

use tracing::{info, warn};

use crate::conflict::engine::{display_state, notify_states, ConflictEngine};
use crate::conflict::war::{Side, WarId};
use crate::core::config::FrontierConfig;
use crate::core::types::{vars, CampKey, Currency, NameKey, Timestamp};
use crate::ports::Ports;
use crate::territory::state::{Transaction, TransactionKind};
use crate::territory::store::{TerritoryStore, TransferResult};

/// Why a war ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// A capital stayed broken for the whole hold window
    CapitalHeld,
    Surrender,
    /// A capital was already broken when war was declared
    CapitalAlreadyBroken,
    AdminStop,
    StateRemoved,
}

/// Outcome of a finished war
#[derive(Debug, Clone, PartialEq)]
pub struct WarResolution {
    pub war_id: WarId,
    /// Winning primary state; `None` when the war was cancelled
    pub winner: Option<NameKey>,
    pub loser: Option<NameKey>,
    pub reason: EndReason,
    pub transfers: Vec<TransferResult>,
    /// Flat reward plus loot share credited to each winning-side bank
    pub reward_per_state: Currency,
    pub loot_total: Currency,
}

impl ConflictEngine {
    /// End a war in favor of `winner`. Broken non-capital sectors of every
    /// losing-side state go to the winning primary, then the flat reward
    /// and the looted share of losing banks are split across the winners.
    #[allow(clippy::too_many_arguments)]
    pub fn end_war(
        &mut self,
        store: &mut TerritoryStore,
        war_id: WarId,
        winner: Side,
        reason: EndReason,
        now: Timestamp,
        config: &FrontierConfig,
        ports: &mut Ports,
    ) -> Option<WarResolution> {
        let war = self.wars.remove(&war_id)?;
        self.hold_timers.cancel_war(war_id);
        self.surrenders.cancel_where(|r| r.payload == war_id);

        let winner_primary = war.primary(winner).clone();
        let loser_primary = war.primary(winner.opposite()).clone();
        let winners: Vec<NameKey> = war
            .side(winner)
            .iter()
            .filter(|s| store.state(s).is_some())
            .cloned()
            .collect();
        let losers: Vec<NameKey> = war
            .side(winner.opposite())
            .iter()
            .filter(|s| store.state(s).is_some())
            .cloned()
            .collect();

        let transfers = if store.state(&winner_primary).is_some() {
            capture_broken_sectors(store, &losers, &winner_primary, now, config)
        } else {
            Vec::new()
        };

        let (reward_per_state, loot_total) = distribute_rewards(store, &winners, &losers, now, config);
        store.mark_dirty();

        info!(
            war = war_id,
            winner = %winner_primary,
            loser = %loser_primary,
            ?reason,
            captured = transfers.len(),
            reward_per_state,
            "war ended"
        );

        let message_vars = vars([
            ("winner", display_state(store, &winner_primary)),
            ("loser", display_state(store, &loser_primary)),
            ("captured", transfers.len().to_string()),
            ("reward", format!("{:.2}", reward_per_state)),
        ]);
        notify_states(store, ports, &winners, "war.won", &message_vars);
        notify_states(store, ports, &losers, "war.lost", &message_vars);

        Some(WarResolution {
            war_id,
            winner: Some(winner_primary),
            loser: Some(loser_primary),
            reason,
            transfers,
            reward_per_state,
            loot_total,
        })
    }
}

fn capture_broken_sectors(
    store: &mut TerritoryStore,
    losers: &[NameKey],
    winner: &NameKey,
    now: Timestamp,
    config: &FrontierConfig,
) -> Vec<TransferResult> {
    let mut transfers = Vec::new();
    for loser in losers {
        let broken: Vec<NameKey> = match store.state(loser) {
            Some(state) => state
                .sectors
                .keys()
                .filter(|sector| !state.is_capital(sector))
                .filter(|sector| {
                    store
                        .camp(&CampKey::from_keys(loser.clone(), (*sector).clone()))
                        .map_or(false, |c| c.is_broken())
                })
                .cloned()
                .collect(),
            None => continue,
        };
        for sector in broken {
            match store.transfer_sector(loser, winner, &sector) {
                Ok(result) => {
                    if let Some(camp) = store.camp_mut(&result.to) {
                        camp.restore_after_capture(now, config.maintenance_interval());
                    }
                    store.refresh_boundary(&result.to, &config.placement);
                    transfers.push(result);
                }
                Err(err) => warn!(from = %loser, %sector, ?err, "captured sector could not be transferred"),
            }
        }
    }
    transfers
}

/// Returns (credit per winning state, total looted)
fn distribute_rewards(
    store: &mut TerritoryStore,
    winners: &[NameKey],
    losers: &[NameKey],
    now: Timestamp,
    config: &FrontierConfig,
) -> (Currency, Currency) {
    if winners.is_empty() {
        return (0.0, 0.0);
    }
    let cap = config.states.transaction_log_cap;
    let fraction = (config.war.loot_percent / 100.0).clamp(0.0, 1.0);

    let mut loot_total = 0.0;
    for loser in losers {
        let Some(state) = store.state_mut(loser) else {
            continue;
        };
        let loot = state.bank * fraction;
        if loot > 0.0 && state.withdraw(loot) {
            state.record(
                Transaction {
                    at: now,
                    kind: TransactionKind::WarLootLost,
                    amount: loot,
                    actor: None,
                },
                cap,
            );
            loot_total += loot;
        }
    }

    let count = winners.len() as f64;
    let flat_share = config.war.reward_flat.max(0.0) / count;
    let loot_share = loot_total / count;
    for winner in winners {
        let Some(state) = store.state_mut(winner) else {
            continue;
        };
        state.deposit(flat_share + loot_share);
        if flat_share > 0.0 {
            state.record(
                Transaction {
                    at: now,
                    kind: TransactionKind::WarReward,
                    amount: flat_share,
                    actor: None,
                },
                cap,
            );
        }
        if loot_share > 0.0 {
            state.record(
                Transaction {
                    at: now,
                    kind: TransactionKind::WarLootGained,
                    amount: loot_share,
                    actor: None,
                },
                cap,
            );
        }
    }
    (flat_share + loot_share, loot_total)
}
