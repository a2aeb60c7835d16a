//! Treasure configurations and their integer hashes.
//!
//! A configuration is one flag per treasure tile (`true` = collected). The
//! hash sets bit `i` for every collected treasure `i`, so it is a bijection
//! between configurations of `count` treasures and `0..2^count`.

use crate::error::{MdpError, Result};

/// Each treasure doubles the number of layers; beyond this the world is
/// too large to enumerate.
pub const MAX_TREASURES: usize = 20;

pub fn treasure_hash(collected: &[bool]) -> usize {
    collected
        .iter()
        .enumerate()
        .filter(|&(_, &c)| c)
        .fold(0, |hash, (i, _)| hash | (1 << i))
}

pub fn treasure_state(hash: usize, count: usize) -> Vec<bool> {
    (0..count).map(|i| hash & (1 << i) != 0).collect()
}

/// Hash reached by collecting treasure `id` from layer `hash`.
pub fn collect(hash: usize, id: usize) -> usize {
    hash | (1 << id)
}

pub fn is_collected(hash: usize, id: usize) -> bool {
    hash & (1 << id) != 0
}

pub fn captured_count(hash: usize) -> usize {
    hash.count_ones() as usize
}

/// Number of layers needed for `count` treasures.
pub fn layer_count(count: usize) -> Result<usize> {
    if count > MAX_TREASURES {
        return Err(MdpError::invalid_parameter(
            "treasure_count".to_string(),
            format!("{} treasures exceed the limit of {}", count, MAX_TREASURES),
        ));
    }
    Ok(1 << count)
}

/// Every configuration of `count` treasures, ordered by hash.
pub fn enumerate_treasure_states(count: usize) -> Result<Vec<Vec<bool>>> {
    let layers = layer_count(count)?;
    Ok((0..layers).map(|h| treasure_state(h, count)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_hash_is_bijective() {
        let states = enumerate_treasure_states(4).unwrap();
        assert_eq!(states.len(), 16);
        let hashes: HashSet<usize> = states.iter().map(|s| treasure_hash(s)).collect();
        assert_eq!(hashes.len(), 16);
        for (h, state) in states.iter().enumerate() {
            assert_eq!(treasure_hash(state), h);
            assert_eq!(treasure_state(h, 4), *state);
        }
    }

    #[test]
    fn test_collect_only_grows() {
        for hash in 0..8 {
            for id in 0..3 {
                let next = collect(hash, id);
                assert!(next >= hash);
                assert!(is_collected(next, id));
                assert_eq!(collect(next, id), next);
            }
        }
        assert_eq!(captured_count(0b101), 2);
    }

    #[test]
    fn test_no_treasure_has_one_layer() {
        assert_eq!(enumerate_treasure_states(0).unwrap(), vec![Vec::<bool>::new()]);
        assert!(layer_count(MAX_TREASURES + 1).is_err());
    }
}
