use crate::entity::Record;

/// Jaro-Winkler floor for treating two name keys as the same organisation.
const NAME_SIMILARITY_FLOOR: f64 = 0.85;

/// Normalize a string for fuzzy matching: lowercase + ASCII alphanumeric only.
pub fn normalize_key(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_lowercase()
}

/// Similarity of two names in `[0, 1]`, or `None` when they are not the
/// same party. Equal keys score 1.0; otherwise the Jaro-Winkler score of
/// the keys when it clears the floor (catches "Acme Corp" / "Acme Crop").
/// Keys shorter than 3 characters only match exactly.
pub fn name_similarity(a: &str, b: &str) -> Option<f64> {
    let key_a = normalize_key(a);
    let key_b = normalize_key(b);
    if key_a.is_empty() || key_b.is_empty() {
        return None;
    }
    if key_a == key_b {
        return Some(1.0);
    }
    if key_a.len() < 3 || key_b.len() < 3 {
        return None;
    }
    let score = strsim::jaro_winkler(&key_a, &key_b);
    (score >= NAME_SIMILARITY_FLOOR).then_some(score)
}

/// Resolve a free-text client reference to exactly one client record.
///
/// Each client scores the better of its name and company. An exact key
/// match always beats a fuzzy one. When two or more clients share the best
/// score the reference is ambiguous and nothing is returned.
pub fn resolve_client_name<'a>(reference: &str, clients: &'a [Record]) -> Option<&'a Record> {
    if reference.trim().is_empty() {
        return None;
    }
    let mut best: Option<(&Record, f64)> = None;
    let mut tied = false;
    for client in clients {
        let score = [client.name.as_deref(), client.company.as_deref()]
            .into_iter()
            .flatten()
            .filter_map(|candidate| name_similarity(reference, candidate))
            .fold(None, |acc: Option<f64>, s| Some(acc.map_or(s, |a| a.max(s))));
        let Some(score) = score else { continue };
        match best {
            Some((_, top)) if score < top => {}
            Some((_, top)) if score == top => tied = true,
            _ => {
                best = Some((client, score));
                tied = false;
            }
        }
    }
    if tied {
        log::debug!("Client reference '{}' is ambiguous", reference);
        return None;
    }
    best.map(|(client, _)| client)
}
