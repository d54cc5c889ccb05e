//! Submission lifecycle: status vocabulary, legal transitions, visibility.
//!
//! Status strings are wire-level and must match the portal's database
//! exactly. Everything here is pure so the transition rules can be tested
//! without a database; handlers apply the results through guarded row
//! updates.

use crate::auth::Role;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current screening status of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Pending,
    UnderReview,
    RevisionsRequested,
    Accepted,
    Rejected,
    Flushed,
}

pub const ALL_STATUSES: [Status; 6] = [
    Status::Pending,
    Status::UnderReview,
    Status::RevisionsRequested,
    Status::Accepted,
    Status::Rejected,
    Status::Flushed,
];

/// Statuses visible in the public preprint pool.
pub const POOL_STATUSES: [Status; 2] = [Status::UnderReview, Status::Accepted];

/// Bilingual display label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusLabel {
    pub en: &'static str,
    pub cn: &'static str,
    pub color: &'static str,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::UnderReview => "under_review",
            Status::RevisionsRequested => "revisions_requested",
            Status::Accepted => "accepted",
            Status::Rejected => "rejected",
            Status::Flushed => "flushed",
        }
    }

    pub fn parse(s: &str) -> Option<Status> {
        ALL_STATUSES.into_iter().find(|status| status.as_str() == s)
    }

    /// Whether the submission is visible in the public preprint pool.
    pub fn in_pool(self) -> bool {
        POOL_STATUSES.contains(&self)
    }

    /// Author-facing label.
    pub fn label(self) -> StatusLabel {
        match self {
            Status::Pending => StatusLabel { en: "Screening", cn: "待预审", color: "bg-gray-100 text-gray-500" },
            Status::UnderReview => StatusLabel { en: "Scooper Review", cn: "铲屎官评审中", color: "bg-yellow-50 text-yellow-700" },
            Status::RevisionsRequested => StatusLabel { en: "Revisions Requested", cn: "需要修改", color: "bg-blue-50 text-blue-700" },
            Status::Accepted => StatusLabel { en: "Approved for Flush", cn: "批准冲水", color: "bg-green-50 text-green-700" },
            Status::Rejected => StatusLabel { en: "Clogged", cn: "堵塞了", color: "bg-red-50 text-red-700" },
            Status::Flushed => StatusLabel { en: "Desk Flushed", cn: "直接冲掉", color: "bg-red-50 text-red-500" },
        }
    }

    /// Label shown on the screening dashboard.
    pub fn editor_label(self) -> StatusLabel {
        match self {
            Status::Pending => StatusLabel { en: "Pending", cn: "待预审", color: "bg-amber-50 text-amber-700" },
            Status::UnderReview => StatusLabel { en: "In Tank", cn: "已入池", color: "bg-green-50 text-green-700" },
            Status::RevisionsRequested => StatusLabel { en: "Revisions", cn: "需修改", color: "bg-blue-50 text-blue-700" },
            Status::Accepted => StatusLabel { en: "Accepted", cn: "已接受", color: "bg-green-50 text-green-700" },
            Status::Rejected => StatusLabel { en: "Rejected", cn: "已拒绝", color: "bg-red-50 text-red-700" },
            Status::Flushed => StatusLabel { en: "Flushed", cn: "已冲掉", color: "bg-red-50 text-red-500" },
        }
    }
}

/// Why a requested transition was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    NotEditor,
    NotOwner,
    IllegalTransition { from: Status, to: Status },
    NotResubmittable { from: Status },
}

/// Legal editor moves: any decision out of `pending`, plus promoting an
/// in-tank submission to `accepted`.
pub fn editor_can_move(from: Status, to: Status) -> bool {
    match (from, to) {
        (Status::Pending, to) => to != Status::Pending,
        (Status::UnderReview, Status::Accepted) => true,
        _ => false,
    }
}

/// Full precondition check for an editor screening decision. Refusal means
/// nothing may be mutated.
pub fn check_decision(role: Role, from: Status, to: Status) -> Result<(), TransitionError> {
    if role != Role::Editor {
        return Err(TransitionError::NotEditor);
    }
    if editor_can_move(from, to) {
        Ok(())
    } else {
        Err(TransitionError::IllegalTransition { from, to })
    }
}

/// Precondition check for an author resubmission: owner only, and only out
/// of `revisions_requested`.
pub fn check_resubmission(
    owner: Option<Uuid>,
    actor: Uuid,
    current: Status,
) -> Result<(), TransitionError> {
    if owner != Some(actor) {
        return Err(TransitionError::NotOwner);
    }
    if current == Status::RevisionsRequested {
        Ok(())
    } else {
        Err(TransitionError::NotResubmittable { from: current })
    }
}

/// Which decisions produce an author email. Must stay aligned with the
/// template table in `notify`.
pub fn decision_notifies(decision: Status) -> bool {
    matches!(
        decision,
        Status::UnderReview | Status::RevisionsRequested | Status::Flushed
    )
}

/// Screening-dashboard tab partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueTab {
    Pending,
    Approved,
    Rejected,
    All,
}

impl QueueTab {
    pub fn parse(s: &str) -> QueueTab {
        match s {
            "approved" => QueueTab::Approved,
            "rejected" => QueueTab::Rejected,
            "all" => QueueTab::All,
            _ => QueueTab::Pending,
        }
    }

    /// Statuses in this tab; empty means no filter.
    pub fn statuses(self) -> &'static [Status] {
        match self {
            QueueTab::Pending => &[Status::Pending],
            QueueTab::Approved => &[Status::UnderReview, Status::Accepted],
            QueueTab::Rejected => &[Status::Rejected, Status::Flushed, Status::RevisionsRequested],
            QueueTab::All => &[],
        }
    }
}

/// Flavor category on every submission. Display-only, but the vocabulary is
/// closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Viscosity {
    #[serde(rename = "stringy")]
    Stringy,
    #[serde(rename = "semi")]
    Semi,
    #[serde(rename = "high-entropy")]
    HighEntropy,
}

impl Viscosity {
    pub fn as_str(self) -> &'static str {
        match self {
            Viscosity::Stringy => "stringy",
            Viscosity::Semi => "semi",
            Viscosity::HighEntropy => "high-entropy",
        }
    }

    pub fn parse(s: &str) -> Option<Viscosity> {
        match s {
            "stringy" => Some(Viscosity::Stringy),
            "semi" => Some(Viscosity::Semi),
            "high-entropy" => Some(Viscosity::HighEntropy),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Viscosity::Stringy => "Stringy / 拉丝型",
            Viscosity::Semi => "Semi-solid / 半固态",
            Viscosity::HighEntropy => "High-Entropy / 高熵态",
        }
    }
}

/// Reviewer recommendation vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Accept,
    MinorRevisions,
    MajorRevisions,
    Reject,
    Flush,
}

impl Recommendation {
    pub fn as_str(self) -> &'static str {
        match self {
            Recommendation::Accept => "accept",
            Recommendation::MinorRevisions => "minor_revisions",
            Recommendation::MajorRevisions => "major_revisions",
            Recommendation::Reject => "reject",
            Recommendation::Flush => "flush",
        }
    }

    pub fn parse(s: &str) -> Option<Recommendation> {
        match s {
            "accept" => Some(Recommendation::Accept),
            "minor_revisions" => Some(Recommendation::MinorRevisions),
            "major_revisions" => Some(Recommendation::MajorRevisions),
            "reject" => Some(Recommendation::Reject),
            "flush" => Some(Recommendation::Flush),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Recommendation::Accept => "Accept / 接受",
            Recommendation::MinorRevisions => "Minor Revisions / 小修",
            Recommendation::MajorRevisions => "Major Revisions / 大修",
            Recommendation::Reject => "Reject / 拒绝",
            Recommendation::Flush => "Emergency Flush / 紧急冲水",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_strings_round_trip() {
        for status in ALL_STATUSES {
            assert_eq!(Status::parse(status.as_str()), Some(status));
        }
        assert_eq!(Status::parse("garbage"), None);
        assert_eq!(Status::parse("PENDING"), None);
    }

    #[test]
    fn editor_decisions_only_leave_pending_or_promote() {
        for from in ALL_STATUSES {
            for to in ALL_STATUSES {
                let expected = (from == Status::Pending && to != Status::Pending)
                    || (from == Status::UnderReview && to == Status::Accepted);
                assert_eq!(editor_can_move(from, to), expected, "{from:?} -> {to:?}");
            }
        }
    }

    #[test]
    fn non_editors_cannot_decide() {
        for role in [Role::Author, Role::Reviewer] {
            assert_eq!(
                check_decision(role, Status::Pending, Status::UnderReview),
                Err(TransitionError::NotEditor)
            );
        }
        assert!(check_decision(Role::Editor, Status::Pending, Status::UnderReview).is_ok());
        assert_eq!(
            check_decision(Role::Editor, Status::Flushed, Status::Pending),
            Err(TransitionError::IllegalTransition {
                from: Status::Flushed,
                to: Status::Pending
            })
        );
    }

    #[test]
    fn resubmission_requires_owner_and_revisions_state() {
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();

        assert!(check_resubmission(Some(owner), owner, Status::RevisionsRequested).is_ok());
        assert_eq!(
            check_resubmission(Some(owner), stranger, Status::RevisionsRequested),
            Err(TransitionError::NotOwner)
        );
        // Anonymous submissions have no owner to resubmit as.
        assert_eq!(
            check_resubmission(None, stranger, Status::RevisionsRequested),
            Err(TransitionError::NotOwner)
        );
        for status in ALL_STATUSES {
            if status == Status::RevisionsRequested {
                continue;
            }
            assert_eq!(
                check_resubmission(Some(owner), owner, status),
                Err(TransitionError::NotResubmittable { from: status })
            );
        }
    }

    #[test]
    fn pool_is_exactly_under_review_and_accepted() {
        for status in ALL_STATUSES {
            let expected = matches!(status, Status::UnderReview | Status::Accepted);
            assert_eq!(status.in_pool(), expected);
        }
        assert!(POOL_STATUSES.iter().all(|s| s.in_pool()));
    }

    #[test]
    fn queue_tabs_partition_every_status_once() {
        let mut seen = Vec::new();
        for tab in [QueueTab::Pending, QueueTab::Approved, QueueTab::Rejected] {
            seen.extend_from_slice(tab.statuses());
        }
        seen.sort_by_key(|s| s.as_str());
        let mut all: Vec<_> = ALL_STATUSES.to_vec();
        all.sort_by_key(|s| s.as_str());
        assert_eq!(seen, all);
        assert!(QueueTab::All.statuses().is_empty());
        assert_eq!(QueueTab::parse("nonsense"), QueueTab::Pending);
    }

    #[test]
    fn only_templated_decisions_notify() {
        assert!(decision_notifies(Status::UnderReview));
        assert!(decision_notifies(Status::RevisionsRequested));
        assert!(decision_notifies(Status::Flushed));
        assert!(!decision_notifies(Status::Pending));
        assert!(!decision_notifies(Status::Accepted));
        assert!(!decision_notifies(Status::Rejected));
    }

    #[test]
    fn viscosity_vocabulary_is_closed() {
        for v in [Viscosity::Stringy, Viscosity::Semi, Viscosity::HighEntropy] {
            assert_eq!(Viscosity::parse(v.as_str()), Some(v));
        }
        assert_eq!(Viscosity::parse("runny"), None);
    }

    #[test]
    fn recommendation_vocabulary_is_closed() {
        for r in [
            Recommendation::Accept,
            Recommendation::MinorRevisions,
            Recommendation::MajorRevisions,
            Recommendation::Reject,
            Recommendation::Flush,
        ] {
            assert_eq!(Recommendation::parse(r.as_str()), Some(r));
        }
        assert_eq!(Recommendation::parse("maybe"), None);
    }
}
