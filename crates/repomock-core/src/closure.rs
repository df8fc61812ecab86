//! Cycle-safe transitive closure over an arbitrary relation
//!
//! Both the type graph (supertype edges) and the membership graph
//! (member-of / has-member edges) are walked through this one helper. Input
//! graphs may contain cycles; the walk keeps an explicit visited set and an
//! explicit stack, so it always terminates and never recurses.

use std::collections::HashSet;
use std::convert::Infallible;
use std::hash::Hash;

/// Every identity reachable from `start` through `related`, `start` excluded
///
/// Results are in depth-first pre-order: the first related identity, then
/// everything reachable from it, then the second related identity, and so
/// on. Each identity appears once.
pub fn transitive_closure<T, F, I>(start: &T, mut related: F) -> Vec<T>
where
    T: Clone + Eq + Hash,
    F: FnMut(&T) -> I,
    I: IntoIterator<Item = T>,
{
    let result: Result<Vec<T>, Infallible> =
        try_transitive_closure(start, |node| Ok(related(node)));
    match result {
        Ok(reached) => reached,
        Err(never) => match never {},
    }
}

/// Fallible variant of [`transitive_closure`]
///
/// # Errors
///
/// Returns the first error produced by `related`; nothing reached so far is
/// returned in that case.
pub fn try_transitive_closure<T, E, F, I>(start: &T, mut related: F) -> Result<Vec<T>, E>
where
    T: Clone + Eq + Hash,
    F: FnMut(&T) -> Result<I, E>,
    I: IntoIterator<Item = T>,
{
    let mut visited: HashSet<T> = HashSet::new();
    visited.insert(start.clone());

    let mut reached = Vec::new();
    let mut stack: Vec<T> = push_order(related(start)?);

    while let Some(node) = stack.pop() {
        if !visited.insert(node.clone()) {
            continue;
        }
        let next = push_order(related(&node)?);
        reached.push(node);
        stack.extend(next);
    }

    Ok(reached)
}

/// Reverse so the first related identity is popped first
fn push_order<T, I: IntoIterator<Item = T>>(items: I) -> Vec<T> {
    let mut items: Vec<T> = items.into_iter().collect();
    items.reverse();
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn graph(edges: &[(&'static str, &'static str)]) -> HashMap<&'static str, Vec<&'static str>> {
        let mut g: HashMap<&'static str, Vec<&'static str>> = HashMap::new();
        for (from, to) in edges {
            g.entry(*from).or_default().push(*to);
        }
        g
    }

    fn walk(g: &HashMap<&'static str, Vec<&'static str>>, start: &'static str) -> Vec<&'static str> {
        transitive_closure(&start, |n| g.get(n).cloned().unwrap_or_default())
    }

    #[test]
    fn test_preorder_depth_first() {
        let g = graph(&[("a", "b"), ("a", "c"), ("b", "d"), ("c", "e")]);
        assert_eq!(walk(&g, "a"), vec!["b", "d", "c", "e"]);
    }

    #[test]
    fn test_two_cycle_terminates_and_excludes_start() {
        let g = graph(&[("a", "b"), ("b", "a")]);
        assert_eq!(walk(&g, "a"), vec!["b"]);
    }

    #[test]
    fn test_self_loop() {
        let g = graph(&[("a", "a")]);
        assert!(walk(&g, "a").is_empty());
    }

    #[test]
    fn test_diamond_deduplicates() {
        let g = graph(&[("u", "g1"), ("u", "g2"), ("g1", "top"), ("g2", "top")]);
        assert_eq!(walk(&g, "u"), vec!["g1", "top", "g2"]);
    }

    #[test]
    fn test_error_short_circuits() {
        let result: Result<Vec<i32>, String> = try_transitive_closure(&1, |n| {
            if *n == 2 {
                Err("boom".to_string())
            } else {
                Ok(vec![n + 1])
            }
        });
        assert_eq!(result, Err("boom".to_string()));
    }
}
