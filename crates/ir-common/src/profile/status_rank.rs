use crate::model::ProfileStatus;

/// Rank given to any status outside the known review states.
pub const UNKNOWN_STATUS_RANK: i8 = -1;

/// Review states ordered from most to least advanced.
pub const STATUS_RANKS: [(ProfileStatus, i8); 6] = [
    (ProfileStatus::Approved, 5),
    (ProfileStatus::Submitted, 4),
    (ProfileStatus::NeedRevision, 3),
    (ProfileStatus::Rejected, 2),
    (ProfileStatus::Pending, 1),
    (ProfileStatus::Draft, 0),
];

pub fn status_rank(status: &ProfileStatus) -> i8 {
    STATUS_RANKS
        .iter()
        .find(|(known, _)| known == status)
        .map(|(_, rank)| *rank)
        .unwrap_or(UNKNOWN_STATUS_RANK)
}
