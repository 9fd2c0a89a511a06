use super::wave::Wave;

/// One left-to-right merge pass over waves sorted by start.
///
/// Neighbours merge when they overlap or the gap between them is shorter than
/// `min_gap` samples. Returns the merged list and whether anything changed.
pub fn join_pass(waves: &[Wave], min_gap: usize) -> (Vec<Wave>, bool) {
    let mut joined: Vec<Wave> = Vec::with_capacity(waves.len());
    let mut changed = false;

    for wave in waves {
        match joined.last_mut() {
            Some(last) if wave.start_idx() < last.end_idx().saturating_add(min_gap) => {
                *last = last.merged(wave);
                changed = true;
            }
            _ => joined.push(*wave),
        }
    }

    (joined, changed)
}

/// Merges waves of one frequency until no pass changes anything.
pub fn join(mut waves: Vec<Wave>, min_gap: usize) -> Vec<Wave> {
    waves.sort_by_key(Wave::start_idx);

    let mut passes = 0;
    loop {
        let (joined, changed) = join_pass(&waves, min_gap);
        waves = joined;
        passes += 1;
        if !changed {
            break;
        }
    }
    log::trace!("Joined into {} waves after {} passes", waves.len(), passes);
    waves
}

/// Drops waves shorter than `min_len`. Waves cut off by either end of the
/// signal only need `edge_min_len`.
pub fn discard_short(waves: Vec<Wave>, signal_len: usize, min_len: usize, edge_min_len: usize) -> Vec<Wave> {
    waves
        .into_iter()
        .filter(|wave| {
            let touches_edge = wave.start_idx() == 0 || wave.end_idx() >= signal_len;
            let required = if touches_edge { edge_min_len.min(min_len) } else { min_len };
            wave.length() >= required
        })
        .collect()
}
