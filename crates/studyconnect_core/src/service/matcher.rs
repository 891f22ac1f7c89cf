//! Interest matcher.
//!
//! Pure affinity scoring between a requesting user's interest tags and the
//! interest tags of a group's members. No side effects, no failure modes.

use std::collections::BTreeSet;

/// Counts the members whose interest set shares at least one tag with the
/// requesting user's set. A non-empty intersection counts the member once
/// regardless of overlap size; tags compare case-sensitively on the exact
/// strings; an empty set on either side contributes no match.
pub fn shared_interest_members(
    user_interests: &BTreeSet<String>,
    member_interests: &[BTreeSet<String>],
) -> u32 {
    if user_interests.is_empty() {
        return 0;
    }

    member_interests
        .iter()
        .filter(|interests| !interests.is_disjoint(user_interests))
        .count() as u32
}

#[cfg(test)]
mod tests {
    use super::shared_interest_members;
    use std::collections::BTreeSet;

    fn tags(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn counts_each_overlapping_member_once() {
        let user = tags(&["chess", "go", "climbing"]);
        let members = [tags(&["chess", "go"]), tags(&["go"]), tags(&["baking"])];
        assert_eq!(shared_interest_members(&user, &members), 2);
    }

    #[test]
    fn empty_user_interests_match_nobody() {
        let members = [tags(&["chess"])];
        assert_eq!(shared_interest_members(&BTreeSet::new(), &members), 0);
    }

    #[test]
    fn empty_member_interests_do_not_match() {
        let user = tags(&["chess"]);
        let members = [BTreeSet::new(), tags(&["chess"])];
        assert_eq!(shared_interest_members(&user, &members), 1);
    }

    #[test]
    fn tags_compare_case_sensitively() {
        let user = tags(&["Chess"]);
        let members = [tags(&["chess"])];
        assert_eq!(shared_interest_members(&user, &members), 0);
    }

    #[test]
    fn no_members_yields_zero() {
        let user = tags(&["chess"]);
        assert_eq!(shared_interest_members(&user, &[]), 0);
    }
}
