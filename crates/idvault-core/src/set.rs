//! Set semantics over ordered `Vec`s.
//!
//! Claims and logins are persisted as arrays but behave as sets under their
//! value equality. These helpers keep insertion order and take the equality
//! as a closure so any definition can be plugged in.

/// Appends `item` unless an element equal under `eq` is already present.
///
/// Returns `true` if the vector changed.
pub fn add_distinct<T>(items: &mut Vec<T>, item: T, eq: impl Fn(&T, &T) -> bool) -> bool {
    if items.iter().any(|existing| eq(existing, &item)) {
        return false;
    }
    items.push(item);
    true
}

/// Removes every element equal to `item` under `eq`.
///
/// Returns the number of elements removed.
pub fn remove_matching<T>(items: &mut Vec<T>, item: &T, eq: impl Fn(&T, &T) -> bool) -> usize {
    let before = items.len();
    items.retain(|existing| !eq(existing, item));
    before - items.len()
}

/// Concatenates the sources, keeping the first occurrence of each element.
pub fn union_distinct<'a, T, I>(sources: I, eq: impl Fn(&T, &T) -> bool) -> Vec<T>
where
    T: Clone + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut out: Vec<T> = Vec::new();
    for item in sources {
        if !out.iter().any(|existing| eq(existing, item)) {
            out.push(item.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::claim::Claim;

    #[test]
    fn add_distinct_skips_equal_items() {
        let mut claims = vec![Claim::new("type", "value")];
        assert!(!add_distinct(&mut claims, Claim::new("TYPE", "VALUE"), Claim::matches));
        assert!(add_distinct(&mut claims, Claim::new("type", "other"), Claim::matches));
        assert_eq!(claims.len(), 2);
    }

    #[test]
    fn remove_matching_removes_all_equal_items() {
        let mut claims = vec![
            Claim::new("a", "1"),
            Claim::new("b", "2"),
            Claim::new("A", "1"),
        ];
        assert_eq!(remove_matching(&mut claims, &Claim::new("a", "1"), Claim::matches), 2);
        assert_eq!(claims, vec![Claim::new("b", "2")]);
    }

    #[test]
    fn remove_matching_without_match_is_noop() {
        let mut claims = vec![Claim::new("a", "1")];
        assert_eq!(remove_matching(&mut claims, &Claim::new("a", "2"), Claim::matches), 0);
        assert_eq!(claims.len(), 1);
    }

    #[test]
    fn union_keeps_first_occurrence_order() {
        let own = [Claim::new("c", "1"), Claim::new("c", "2")];
        let role = [Claim::new("C", "1"), Claim::new("c", "3")];
        let all = union_distinct(own.iter().chain(role.iter()), Claim::matches);
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].claim_type, "c");
        assert_eq!(all[2], Claim::new("c", "3"));
    }

    #[test]
    fn custom_equality_is_respected() {
        let exact = |a: &String, b: &String| a == b;
        let mut names = vec!["Admin".to_string()];
        assert!(add_distinct(&mut names, "admin".to_string(), exact));
        assert_eq!(names.len(), 2);
    }
}
