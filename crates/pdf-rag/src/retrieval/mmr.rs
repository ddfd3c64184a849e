//! Maximal marginal relevance reranking

/// Cosine similarity; 0.0 when either vector has zero norm
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Select up to `k` candidate indices balancing query relevance against redundancy
///
/// The first pick is the candidate most similar to the query. Each following pick
/// maximizes `lambda_mult * sim(query, c) - (1 - lambda_mult) * max(sim(c, selected))`.
/// Ties go to the lower index.
pub fn maximal_marginal_relevance(
    query: &[f32],
    candidates: &[&[f32]],
    k: usize,
    lambda_mult: f32,
) -> Vec<usize> {
    let limit = k.min(candidates.len());
    if limit == 0 {
        return Vec::new();
    }

    let query_sim: Vec<f32> = candidates
        .iter()
        .map(|c| cosine_similarity(query, c))
        .collect();

    let mut best = 0;
    for (i, score) in query_sim.iter().enumerate() {
        if *score > query_sim[best] {
            best = i;
        }
    }

    let mut selected = vec![best];
    // Highest similarity of each candidate to anything selected so far
    let mut redundancy: Vec<f32> = candidates
        .iter()
        .map(|c| cosine_similarity(c, candidates[best]))
        .collect();

    while selected.len() < limit {
        let mut best_score = f32::NEG_INFINITY;
        let mut idx_to_add = None;

        for (i, &relevance) in query_sim.iter().enumerate() {
            if selected.contains(&i) {
                continue;
            }
            let score = lambda_mult * relevance - (1.0 - lambda_mult) * redundancy[i];
            if score > best_score {
                best_score = score;
                idx_to_add = Some(i);
            }
        }

        let Some(next) = idx_to_add else { break };
        selected.push(next);

        for (i, candidate) in candidates.iter().enumerate() {
            let sim = cosine_similarity(candidate, candidates[next]);
            if sim > redundancy[i] {
                redundancy[i] = sim;
            }
        }
    }

    selected
}
