//! Vote processing.
//!
//! Per (blink, user) state is one of `none | liked | disliked`. Repeating the current
//! vote retracts it, the opposite vote switches. Counters and the per-user map are
//! updated together inside the store's per-blink critical section; counters saturate
//! at zero when stored data has drifted.

use metrics::counter;
use tracing::{debug, info};

use crate::error::{BlinkError, Result};
use crate::models::{BlinkRecord, VoteRecord, VoteType};
use crate::store::BlinkStore;

/// Which edge of the state machine a vote took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Cast(VoteType),
    Retract(VoteType),
    Switch { from: VoteType, to: VoteType },
}

impl Transition {
    pub fn label(&self) -> &'static str {
        match self {
            Transition::Cast(_) => "cast",
            Transition::Retract(_) => "retract",
            Transition::Switch { .. } => "switch",
        }
    }

    /// User's vote after the transition.
    pub fn resulting_vote(&self) -> Option<VoteType> {
        match *self {
            Transition::Cast(v) => Some(v),
            Transition::Retract(_) => None,
            Transition::Switch { to, .. } => Some(to),
        }
    }
}

/// Pure transition function over the previous vote of one user.
pub fn transition(previous: Option<VoteType>, action: VoteType) -> Transition {
    match previous {
        None => Transition::Cast(action),
        Some(prev) if prev == action => Transition::Retract(action),
        Some(prev) => Transition::Switch {
            from: prev,
            to: action,
        },
    }
}

fn bump(record: &mut BlinkRecord, vote: VoteType) {
    match vote {
        VoteType::Like => record.votes.likes = record.votes.likes.saturating_add(1),
        VoteType::Dislike => record.votes.dislikes = record.votes.dislikes.saturating_add(1),
    }
}

fn drop_one(record: &mut BlinkRecord, vote: VoteType) {
    match vote {
        VoteType::Like => record.votes.likes = record.votes.likes.saturating_sub(1),
        VoteType::Dislike => record.votes.dislikes = record.votes.dislikes.saturating_sub(1),
    }
}

/// Apply one vote to a record in place: counters and user map move together.
pub fn apply_to_record(record: &mut BlinkRecord, user_id: &str, action: VoteType) -> Transition {
    let previous = record.user_votes.get(user_id).copied();
    let t = transition(previous, action);
    match t {
        Transition::Cast(v) => {
            bump(record, v);
            record.user_votes.insert(user_id.to_string(), v);
        }
        Transition::Retract(v) => {
            drop_one(record, v);
            record.user_votes.remove(user_id);
        }
        Transition::Switch { from, to } => {
            drop_one(record, from);
            bump(record, to);
            record.user_votes.insert(user_id.to_string(), to);
        }
    }
    t
}

/// Validated vote request.
#[derive(Debug, Clone)]
pub struct VoteRequest {
    pub user_id: String,
    pub vote: VoteType,
    /// Client's belief about its previous vote; informational only.
    pub previous_hint: Option<VoteType>,
}

impl VoteRequest {
    /// Validate raw payload fields.
    pub fn parse(
        user_id: Option<&str>,
        vote_type: Option<&str>,
        previous: Option<&str>,
    ) -> Result<Self> {
        let user_id = user_id.map(str::trim).unwrap_or_default();
        if user_id.is_empty() {
            counter!("votes_rejected_total", "reason" => "missing_user").increment(1);
            return Err(BlinkError::InvalidInput("userId is required".into()));
        }
        let vote = match vote_type {
            Some(v) => v.parse::<VoteType>().inspect_err(|_| {
                counter!("votes_rejected_total", "reason" => "bad_vote_type").increment(1);
            })?,
            None => {
                counter!("votes_rejected_total", "reason" => "bad_vote_type").increment(1);
                return Err(BlinkError::InvalidInput("voteType is required".into()));
            }
        };
        let previous_hint = previous
            .map(str::trim)
            .filter(|p| !p.is_empty() && !p.eq_ignore_ascii_case("none") && *p != "null")
            .and_then(|p| p.parse::<VoteType>().ok());
        Ok(Self {
            user_id: user_id.to_string(),
            vote,
            previous_hint,
        })
    }
}

/// Outcome of a committed vote.
#[derive(Debug, Clone)]
pub struct VoteOutcome {
    pub record: BlinkRecord,
    pub transition: Transition,
}

impl VoteOutcome {
    pub fn votes(&self) -> VoteRecord {
        self.record.vote_record()
    }
}

/// Read-modify-write of one blink's votes as a single critical section.
pub async fn apply_vote(
    store: &dyn BlinkStore,
    blink_id: &str,
    req: &VoteRequest,
) -> Result<VoteOutcome> {
    let user = req.user_id.clone();
    let action = req.vote;
    let mut taken: Option<Transition> = None;
    let mut stored_previous: Option<VoteType> = None;

    let updated = store
        .update_atomic(
            blink_id,
            &mut |record: &mut BlinkRecord| {
                stored_previous = record.user_votes.get(&user).copied();
                taken = Some(apply_to_record(record, &user, action));
            },
        )
        .await?;

    let (record, transition) = match (updated, taken) {
        (Some(r), Some(t)) => (r, t),
        _ => {
            counter!("votes_rejected_total", "reason" => "not_found").increment(1);
            return Err(BlinkError::NotFound(format!("blink '{blink_id}'")));
        }
    };

    if req.previous_hint != stored_previous {
        debug!(
            target: "votes",
            blink_id,
            hint = ?req.previous_hint,
            stored = ?stored_previous,
            "client previousVote differs from stored vote"
        );
    }

    counter!("votes_applied_total", "transition" => transition.label()).increment(1);
    info!(
        target: "votes",
        blink_id,
        transition = transition.label(),
        likes = record.votes.likes,
        dislikes = record.votes.dislikes,
        "vote applied"
    );

    Ok(VoteOutcome { record, transition })
}
