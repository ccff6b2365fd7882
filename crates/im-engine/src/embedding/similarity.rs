/// Raw cosine similarity in [-1.0, 1.0]. Mismatched dimensions and zero
/// vectors score 0.0 rather than erroring; both indicate a vector that
/// carries no usable signal.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        tracing::warn!(
            a_len = a.len(),
            b_len = b.len(),
            "embedding dimension mismatch; returning zero similarity"
        );
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

/// Cosine similarity mapped linearly from [-1, 1] onto the 0..=100 score
/// scale the rest of the pipeline works in.
pub fn similarity_score(a: &[f32], b: &[f32]) -> f64 {
    let cosine = f64::from(cosine_similarity(a, b));
    ((cosine + 1.0) / 2.0 * 100.0).clamp(0.0, 100.0)
}
