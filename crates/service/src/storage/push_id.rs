//! Time-ordered push keys in the Firebase format.
//!
//! A key is 20 characters: 8 encode the millisecond timestamp, 12 are random.
//! Keys generated within the same millisecond increment the random part, so
//! keys from one generator sort in creation order.

use std::sync::Mutex;

use chrono::Utc;
use rand::Rng;

const PUSH_CHARS: &[u8; 64] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

#[derive(Default)]
struct State {
    last_millis: u64,
    last_random: [u8; 12],
}

#[derive(Default)]
pub struct PushIdGenerator {
    state: Mutex<State>,
}

impl PushIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> String {
        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
        self.next_id_at(now)
    }

    fn next_id_at(&self, now: u64) -> String {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        // never step backwards if the wall clock does
        let millis = now.max(state.last_millis);
        if millis == state.last_millis && state.last_millis != 0 {
            increment(&mut state.last_random);
        } else {
            let mut rng = rand::thread_rng();
            for slot in state.last_random.iter_mut() {
                *slot = rng.gen_range(0..64);
            }
        }
        state.last_millis = millis;

        let mut id = [0u8; 20];
        let mut ts = millis;
        for i in (0..8).rev() {
            id[i] = PUSH_CHARS[(ts % 64) as usize];
            ts /= 64;
        }
        for (i, r) in state.last_random.iter().enumerate() {
            id[8 + i] = PUSH_CHARS[*r as usize];
        }
        id.iter().map(|&b| b as char).collect()
    }
}

fn increment(random: &mut [u8; 12]) {
    for slot in random.iter_mut().rev() {
        if *slot == 63 {
            *slot = 0;
        } else {
            *slot += 1;
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_have_push_shape() {
        let id = PushIdGenerator::new().next_id();
        assert_eq!(id.len(), 20);
        assert!(id.bytes().all(|b| PUSH_CHARS.contains(&b)));
    }

    #[test]
    fn same_millisecond_ids_are_ordered_and_unique() {
        let generator = PushIdGenerator::new();
        let ids: Vec<String> = (0..500).map(|_| generator.next_id_at(1_700_000_000_000)).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted, ids);
    }

    #[test]
    fn later_timestamps_sort_later() {
        let generator = PushIdGenerator::new();
        let a = generator.next_id_at(1_700_000_000_000);
        let b = generator.next_id_at(1_700_000_000_001);
        assert!(a < b);
        assert_eq!(&a[..7], &b[..7]);
    }

    #[test]
    fn clock_going_backwards_keeps_order() {
        let generator = PushIdGenerator::new();
        let a = generator.next_id_at(1_700_000_000_500);
        let b = generator.next_id_at(1_700_000_000_000);
        assert!(a < b);
    }

    #[test]
    fn increment_carries() {
        let mut r = [63u8; 12];
        r[0] = 1;
        increment(&mut r);
        assert_eq!(r[0], 2);
        assert!(r[1..].iter().all(|&v| v == 0));
    }
}
