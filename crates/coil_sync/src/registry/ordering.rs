//! Wraparound-safe chunk ordering.
//!
//! Local chunk ids are a 16-bit counter that wraps. Comparing two ids with
//! `<` breaks at the wrap, so every comparison goes through the modular
//! distance from the snake's current head id instead.

/// How many ids `id` lies behind `head`, modulo 2^16. The head itself is 0.
#[inline]
#[must_use]
pub const fn chunk_age(head: u16, id: u16) -> u16 {
    head.wrapping_sub(id)
}

/// Inserts `item` so that older chunks come first.
///
/// Scans from the back and inserts after the first element at least as old
/// as the new one. Returns the insertion index.
pub fn insert_ordered<T>(
    list: &mut Vec<T>,
    item: T,
    head: u16,
    id_of: impl Fn(&T) -> u16,
) -> usize {
    let age = chunk_age(head, id_of(&item));
    let index = list
        .iter()
        .rposition(|existing| chunk_age(head, id_of(existing)) >= age)
        .map_or(0, |i| i + 1);
    list.insert(index, item);
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ordered(head: u16, arrivals: &[u16]) -> Vec<u16> {
        let mut list = Vec::new();
        for &id in arrivals {
            insert_ordered(&mut list, id, head, |&x| x);
        }
        list
    }

    #[test]
    fn test_age_wraps() {
        assert_eq!(chunk_age(5, 5), 0);
        assert_eq!(chunk_age(5, 3), 2);
        assert_eq!(chunk_age(2, 65534), 4);
    }

    #[test]
    fn test_in_order_arrivals_append() {
        assert_eq!(ordered(10, &[7, 8, 9, 10]), [7, 8, 9, 10]);
    }

    #[test]
    fn test_late_arrival_lands_in_place() {
        assert_eq!(ordered(10, &[8, 10, 9, 6, 7]), [6, 7, 8, 9, 10]);
    }

    #[test]
    fn test_order_across_wrap() {
        assert_eq!(ordered(1, &[65535, 1, 65534, 0]), [65534, 65535, 0, 1]);
    }

    #[test]
    fn test_head_is_always_last() {
        let list = ordered(300, &[300, 299, 298]);
        assert_eq!(list.last(), Some(&300));
    }
}
