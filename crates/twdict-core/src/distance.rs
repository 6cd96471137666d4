/// Levenshtein distance over chars, giving up once it exceeds `max_distance`.
///
/// One CJK character is one edit unit. Returns `None` when the distance is
/// greater than `max_distance`.
pub fn bounded_levenshtein(query: &[char], candidate: &str, max_distance: usize) -> Option<usize> {
    let candidate: Vec<char> = candidate.chars().collect();

    let len1 = query.len();
    let len2 = candidate.len();

    if len1.abs_diff(len2) > max_distance {
        return None;
    }

    if len1 == 0 {
        return Some(len2);
    }
    if len2 == 0 {
        return Some(len1);
    }

    let mut prev: Vec<usize> = (0..=len2).collect();
    let mut curr = vec![0usize; len2 + 1];

    for i in 1..=len1 {
        curr[0] = i;
        let mut row_min = curr[0];

        for j in 1..=len2 {
            let cost = usize::from(query[i - 1] != candidate[j - 1]);
            curr[j] = (prev[j] + 1)
                .min(curr[j - 1] + 1)
                .min(prev[j - 1] + cost);
            row_min = row_min.min(curr[j]);
        }

        if row_min > max_distance {
            return None;
        }

        std::mem::swap(&mut prev, &mut curr);
    }

    (prev[len2] <= max_distance).then_some(prev[len2])
}
