//! Event-sourced reduction of contract events into [`AppState`] snapshots.

use shared::{
    domain::{Address, AppState, Policy, PolicyId},
    protocol::ContractEvent,
    U256,
};

/// Fold one event into a fresh snapshot. `state` is never modified.
pub fn reduce(state: &AppState, event: &ContractEvent) -> AppState {
    match event {
        ContractEvent::SyncStatusSyncing => AppState {
            is_syncing: true,
            ..state.clone()
        },
        ContractEvent::SyncStatusSynced => AppState {
            is_syncing: false,
            ..state.clone()
        },
        ContractEvent::AddPolicy {
            beneficiary,
            block_inflation_rate,
            policy_id,
        } => with_policies(
            state,
            add_policy(state, *policy_id, *beneficiary, *block_inflation_rate),
        ),
        ContractEvent::RemovePolicy { policy_id } => {
            with_policies(state, remove_policy(&state.policies, *policy_id))
        }
        ContractEvent::ExecuteIssuance => {
            with_policies(state, mark_issuances_executed(&state.policies))
        }
        ContractEvent::Unrecognized => state.clone(),
    }
}

pub fn fold<'a, I>(state: AppState, events: I) -> AppState
where
    I: IntoIterator<Item = &'a ContractEvent>,
{
    events
        .into_iter()
        .fold(state, |current, event| reduce(&current, event))
}

fn with_policies(state: &AppState, policies: Vec<Policy>) -> AppState {
    AppState {
        policies,
        is_syncing: state.is_syncing,
        token_symbol: state.token_symbol.clone(),
    }
}

// A repeated id while the first is still active keeps the original entry.
fn add_policy(
    state: &AppState,
    id: PolicyId,
    beneficiary: Address,
    block_inflation_rate: U256,
) -> Vec<Policy> {
    let mut next = state.policies.clone();
    if !state.contains(id) {
        next.push(Policy {
            id,
            beneficiary,
            block_inflation_rate,
            executed: false,
        });
    }
    next
}

fn remove_policy(policies: &[Policy], id: PolicyId) -> Vec<Policy> {
    policies
        .iter()
        .filter(|policy| policy.id != id)
        .cloned()
        .collect()
}

fn mark_issuances_executed(policies: &[Policy]) -> Vec<Policy> {
    policies
        .iter()
        .map(|policy| Policy {
            executed: true,
            ..policy.clone()
        })
        .collect()
}
