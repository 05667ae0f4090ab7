use chrono::{DateTime, Months, Utc};
use rand::{seq::SliceRandom, Rng};

use crate::models::WatchedItem;

pub const MAX_SEEDS: usize = 5;
const MAX_HIGHLY_RATED: usize = 2;
const MAX_MOST_PLAYED: usize = 3;
const HIGH_RATING: i32 = 4;

/// Items played within the last month before `now`
pub fn recently_watched(watched: &[WatchedItem], now: DateTime<Utc>) -> Vec<WatchedItem> {
    let Some(since) = now.checked_sub_months(Months::new(1)) else {
        return Vec::new();
    };
    watched
        .iter()
        .filter(|item| item.last_play_date.is_some_and(|played| played >= since))
        .cloned()
        .collect()
}

/// Picks up to [`MAX_SEEDS`] items to base "more like this" discovery on
///
/// With more items than that: two random picks rated 4 or above, then the
/// most played of the rest, then random fill. No item is picked twice.
pub fn select_seeds<R: Rng>(recent: &[WatchedItem], rng: &mut R) -> Vec<WatchedItem> {
    if recent.len() <= MAX_SEEDS {
        return recent.to_vec();
    }

    let mut selected: Vec<usize> = Vec::with_capacity(MAX_SEEDS);

    let mut highly_rated: Vec<usize> = (0..recent.len())
        .filter(|&i| recent[i].rating >= HIGH_RATING)
        .collect();
    highly_rated.shuffle(rng);
    selected.extend(highly_rated.into_iter().take(MAX_HIGHLY_RATED));

    let mut most_played: Vec<usize> = (0..recent.len())
        .filter(|i| !selected.contains(i))
        .collect();
    most_played.sort_by(|a, b| recent[*b].play_count.cmp(&recent[*a].play_count));
    let room = (MAX_SEEDS - selected.len()).min(MAX_MOST_PLAYED);
    selected.extend(most_played.into_iter().take(room));

    let mut remaining: Vec<usize> = (0..recent.len())
        .filter(|i| !selected.contains(i))
        .collect();
    remaining.shuffle(rng);
    let room = MAX_SEEDS - selected.len();
    selected.extend(remaining.into_iter().take(room));

    selected.into_iter().map(|i| recent[i].clone()).collect()
}
