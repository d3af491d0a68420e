//! The scripted atomic pledge — the heart of the engine (spec.md §4.3).
//!
//! Implemented as a single Redis `EVAL` so a pledge's read-modify-write
//! cycle against the snapshot, participants set, and geo index is one
//! visible transition: two concurrent pledges against the same order can
//! never both observe `total_pledge < amount_needed` and both succeed.

use bundl_types::{BundlError, Order, OrderId, UserId};
use redis::Script;
use redis::aio::ConnectionManager;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::keys::KeySpace;

const PLEDGE_SCRIPT: &str = r#"
local snapshot_key = KEYS[1]
local participants_key = KEYS[2]
local geo_key = KEYS[3]
local user_id = ARGV[1]
local pledge_amount = tonumber(ARGV[2])
local geo_member = ARGV[3]

local raw = redis.call('GET', snapshot_key)
if not raw then
    return cjson.encode({ok = false, reason = "not_found"})
end

local order = cjson.decode(raw)
if order.status ~= "Active" then
    return cjson.encode({ok = false, reason = "not_active"})
end

local amount_needed = tonumber(order.amount_needed)
local total_pledge = tonumber(order.total_pledge)
if total_pledge >= amount_needed then
    return cjson.encode({ok = false, reason = "already_complete"})
end

local is_new = order.pledge_map[user_id] == nil
local prior = order.pledge_map[user_id]
if prior == nil then prior = 0 else prior = tonumber(prior) end
order.pledge_map[user_id] = prior + pledge_amount
order.total_pledge = total_pledge + pledge_amount

if is_new then
    order.total_users = order.total_users + 1
    redis.call('SADD', participants_key, user_id)
end

local transitioned = false
if order.total_pledge >= amount_needed then
    order.status = "Completed"
    transitioned = true
    redis.call('DEL', snapshot_key)
    redis.call('DEL', participants_key)
    redis.call('ZREM', geo_key, geo_member)
else
    redis.call('SET', snapshot_key, cjson.encode(order), 'KEEPTTL')
end

return cjson.encode({ok = true, order = order, transitioned_to_completed = transitioned})
"#;

#[derive(Debug, Deserialize)]
struct RawPledgeResult {
    ok: bool,
    reason: Option<String>,
    order: Option<Order>,
    transitioned_to_completed: Option<bool>,
}

/// Outcome of the scripted pledge, mirroring spec.md §4.3 step 10.
#[derive(Debug, Clone)]
pub enum PledgeOutcome {
    Accepted { order: Order, transitioned_to_completed: bool },
    Rejected { reason: PledgeRejection },
}

/// Why a scripted pledge was rejected. Maps 1:1 to the `reason` field the
/// Lua script returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PledgeRejection {
    NotFound,
    NotActive,
    AlreadyComplete,
}

impl PledgeRejection {
    fn from_reason(reason: &str) -> Self {
        match reason {
            "not_found" => Self::NotFound,
            "not_active" => Self::NotActive,
            _ => Self::AlreadyComplete,
        }
    }
}

/// Execute the scripted pledge against `order_id` for `user_id`.
pub async fn pledge(
    conn: &mut ConnectionManager,
    keys: &KeySpace,
    order_id: OrderId,
    user_id: UserId,
    pledge_amount: Decimal,
) -> Result<PledgeOutcome, BundlError> {
    let script = Script::new(PLEDGE_SCRIPT);
    let raw: String = script
        .key(keys.snapshot(order_id))
        .key(keys.participants(order_id))
        .key(keys.geo_index())
        .arg(user_id.to_string())
        .arg(pledge_amount.to_string())
        .arg(keys.geo_member(order_id))
        .invoke_async(conn)
        .await
        .map_err(|e| BundlError::Io(e.to_string()))?;

    let parsed: RawPledgeResult = serde_json::from_str(&raw)?;

    if parsed.ok {
        let order = parsed.order.ok_or_else(|| {
            BundlError::Internal("scripted pledge returned ok=true without an order".to_string())
        })?;
        Ok(PledgeOutcome::Accepted {
            order,
            transitioned_to_completed: parsed.transitioned_to_completed.unwrap_or(false),
        })
    } else {
        let reason = parsed
            .reason
            .ok_or_else(|| BundlError::Internal("scripted pledge returned ok=false without a reason".to_string()))?;
        Ok(PledgeOutcome::Rejected { reason: PledgeRejection::from_reason(&reason) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_parses_known_reasons() {
        assert_eq!(PledgeRejection::from_reason("not_found"), PledgeRejection::NotFound);
        assert_eq!(PledgeRejection::from_reason("not_active"), PledgeRejection::NotActive);
        assert_eq!(PledgeRejection::from_reason("already_complete"), PledgeRejection::AlreadyComplete);
    }
}
