use itertools::Itertools;

const MAX_SUGGESTIONS: usize = 5;

/// Builds a `"{prefix} \"a\", \"b\"?"` hint from the options closest to the
/// input, or `None` when nothing is close enough to be worth suggesting.
pub(crate) fn make_suggestion<'a, I>(prefix: &str, options: I, input: &str) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut selected = options
        .into_iter()
        .filter_map(|option| {
            let distance = levenshtein_distance(input, option);
            let threshold = (input.len() / 2).max(option.len() / 2).max(1);
            (distance <= threshold).then_some((distance, option))
        })
        .collect::<Vec<_>>();
    selected.sort_unstable();

    if selected.is_empty() {
        return None;
    }

    let suggestions = selected
        .iter()
        .take(MAX_SUGGESTIONS)
        .map(|(_, option)| format!("\"{option}\""))
        .join(", ");
    Some(format!("{prefix} {suggestions}?"))
}

fn levenshtein_distance(s: &str, t: &str) -> usize {
    let s = s.chars().collect::<Vec<_>>();
    let t = t.chars().collect::<Vec<_>>();
    let mut previous = (0..=t.len()).collect::<Vec<_>>();
    let mut current = vec![0; t.len() + 1];

    for (i, sc) in s.iter().enumerate() {
        current[0] = i + 1;
        for (j, tc) in t.iter().enumerate() {
            let substitution = previous[j] + usize::from(sc != tc);
            current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[t.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggests_close_matches_only() {
        let options = ["barkVolume", "meowVolume", "name"];
        assert_eq!(
            make_suggestion("Did you mean", options, "barkVol"),
            Some("Did you mean \"barkVolume\"?".to_string())
        );
        assert_eq!(make_suggestion("Did you mean", options, "zzzzzzzz"), None);
    }

    #[test]
    fn closest_option_comes_first() {
        let options = ["named", "name"];
        let suggestion = make_suggestion("Did you mean", options, "nam").unwrap();
        assert_eq!(suggestion, "Did you mean \"name\", \"named\"?");
    }

    #[test]
    fn distance_basics() {
        assert_eq!(levenshtein_distance("", "abc"), 3);
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
        assert_eq!(levenshtein_distance("same", "same"), 0);
    }
}
