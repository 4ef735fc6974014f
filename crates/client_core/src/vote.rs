use shared::domain::{VoteDirection, VoteState};

/// State after the server confirms a vote in `requested` direction.
/// Repeating the current vote withdraws it; the opposite direction switches.
pub fn next_vote_state(current: VoteState, requested: VoteDirection) -> VoteState {
    match (current, requested) {
        (VoteState::None, VoteDirection::Up) => VoteState::Upvoted,
        (VoteState::None, VoteDirection::Down) => VoteState::Downvoted,
        (VoteState::Upvoted, VoteDirection::Up) => VoteState::None,
        (VoteState::Upvoted, VoteDirection::Down) => VoteState::Downvoted,
        (VoteState::Downvoted, VoteDirection::Up) => VoteState::Upvoted,
        (VoteState::Downvoted, VoteDirection::Down) => VoteState::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_table_holds_for_all_cells() {
        let cases = [
            (VoteState::None, VoteDirection::Up, VoteState::Upvoted),
            (VoteState::None, VoteDirection::Down, VoteState::Downvoted),
            (VoteState::Upvoted, VoteDirection::Up, VoteState::None),
            (VoteState::Upvoted, VoteDirection::Down, VoteState::Downvoted),
            (VoteState::Downvoted, VoteDirection::Up, VoteState::Upvoted),
            (VoteState::Downvoted, VoteDirection::Down, VoteState::None),
        ];
        for (current, requested, expected) in cases {
            assert_eq!(
                next_vote_state(current, requested),
                expected,
                "{current:?} x {requested:?}"
            );
        }
    }
}
