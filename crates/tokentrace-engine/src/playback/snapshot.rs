use serde::Serialize;
use tokentrace_types::{LayerDetail, SamplingConfig, SamplingMethod, SamplingPayload};

const SHOWN_CANDIDATES: usize = 8;
const SHOWN_CANDIDATES_TEMPERATURE: usize = 12;

/// Ranked candidates of one playback step, annotated per sampling method
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateSnapshot {
    pub step_index: usize,
    pub method: SamplingMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameter: Option<f64>,
    pub label: String,
    pub selected_token: Option<i64>,
    pub selected_text: String,
    pub candidates: Vec<Candidate>,
    /// Per-layer execution breakdown for this token, in trace order
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub layers: Vec<LayerDetail>,
    pub layer_time_us: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    /// 0-based position after ranking
    pub rank: usize,
    pub token: i64,
    pub text: String,
    pub probability: f64,
    pub selected: bool,
    /// Outside the method's cutoff; still listed
    pub eliminated: bool,
    /// `p / p_max`, temperature only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relative_weight: Option<f64>,
}

/// Build the snapshot for `step`.
///
/// `sampling` is the operator's configuration; without one, the method and
/// parameters the record itself reports are used.
pub fn build_snapshot(
    step_index: usize,
    step: &SamplingPayload,
    sampling: Option<&SamplingConfig>,
) -> CandidateSnapshot {
    let config = sampling
        .cloned()
        .unwrap_or_else(|| SamplingConfig::from_trace(&step.sampling_method, &step.sampling_params));

    let mut ranked: Vec<_> = step.candidates().collect();
    ranked.sort_by(|a, b| b.probability.total_cmp(&a.probability));

    let cap = match config.method {
        SamplingMethod::Temperature => SHOWN_CANDIDATES_TEMPERATURE,
        _ => SHOWN_CANDIDATES,
    };
    let kept = cutoff(&config, &ranked);
    let max_prob = ranked.first().map(|c| c.probability).unwrap_or(0.0);

    let mut candidates: Vec<Candidate> = ranked
        .iter()
        .take(cap)
        .enumerate()
        .map(|(rank, c)| Candidate {
            rank,
            token: c.token,
            text: c.text.to_string(),
            probability: c.probability,
            selected: false,
            eliminated: rank >= kept,
            relative_weight: (config.method == SamplingMethod::Temperature && max_prob > 0.0)
                .then(|| c.probability / max_prob),
        })
        .collect();

    let selected = match config.method {
        SamplingMethod::Greedy => Some(0),
        _ => step
            .selected_token
            .and_then(|token| candidates.iter().position(|c| c.token == token))
            .or(Some(0)),
    };
    if let Some(candidate) = selected.and_then(|i| candidates.get_mut(i)) {
        candidate.selected = true;
    }

    CandidateSnapshot {
        step_index,
        method: config.method,
        parameter: config.parameter(),
        label: config.label(),
        selected_token: step.selected_token,
        selected_text: step.selected_text().to_string(),
        candidates,
        layers: step.layer_details.clone(),
        layer_time_us: step.total_layer_time_us(),
    }
}

/// Number of leading ranked candidates the method keeps
fn cutoff(config: &SamplingConfig, ranked: &[tokentrace_types::CandidateRef<'_>]) -> usize {
    match config.method {
        SamplingMethod::Greedy | SamplingMethod::Temperature => ranked.len(),
        SamplingMethod::TopK => config.effective_top_k() as usize,
        SamplingMethod::TopP => {
            let p = config.effective_top_p();
            let mut cumulative = 0.0;
            ranked
                .iter()
                .position(|c| {
                    cumulative += c.probability;
                    cumulative >= p
                })
                .map(|i| i + 1)
                .unwrap_or(ranked.len())
        }
        SamplingMethod::MinP => {
            let max = ranked.first().map(|c| c.probability).unwrap_or(0.0);
            let threshold = config.effective_min_p() * max;
            ranked
                .iter()
                .take_while(|c| c.probability >= threshold)
                .count()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(selected: i64, candidates: &[(i64, &str, f64)]) -> SamplingPayload {
        SamplingPayload {
            selected_token: Some(selected),
            top_tokens: candidates.iter().map(|c| c.0).collect(),
            top_token_texts: candidates.iter().map(|c| c.1.to_string()).collect(),
            top_probs: candidates.iter().map(|c| c.2).collect(),
            ..Default::default()
        }
    }

    fn ten_candidates() -> SamplingPayload {
        let probs = [0.3, 0.2, 0.15, 0.1, 0.08, 0.06, 0.05, 0.03, 0.02, 0.01];
        let candidates: Vec<(i64, String, f64)> = probs
            .iter()
            .enumerate()
            .map(|(i, p)| (i as i64, format!("t{}", i), *p))
            .collect();
        let refs: Vec<(i64, &str, f64)> =
            candidates.iter().map(|(t, s, p)| (*t, s.as_str(), *p)).collect();
        step(3, &refs)
    }

    #[test]
    fn test_greedy_ranks_and_marks_first() {
        let payload = step(2, &[(1, "a", 0.2), (2, "b", 0.7), (3, "c", 0.1)]);
        let snapshot = build_snapshot(0, &payload, Some(&SamplingConfig::greedy()));

        let tokens: Vec<i64> = snapshot.candidates.iter().map(|c| c.token).collect();
        assert_eq!(tokens, vec![2, 1, 3]);
        assert!(snapshot.candidates[0].selected);
        assert_eq!(snapshot.label, "Greedy");
        assert_eq!(snapshot.parameter, None);
        assert!(snapshot.candidates.iter().all(|c| !c.eliminated));
    }

    #[test]
    fn test_cap_at_eight_and_twelve_for_temperature() {
        let payload = ten_candidates();
        assert_eq!(build_snapshot(0, &payload, None).candidates.len(), 8);

        let warm = build_snapshot(0, &payload, Some(&SamplingConfig::temperature(0.8)));
        assert_eq!(warm.candidates.len(), 10);
        assert_eq!(warm.label, "Temperature (T=0.8)");
        assert_eq!(warm.candidates[0].relative_weight, Some(1.0));
        assert_eq!(warm.candidates[1].relative_weight, Some(0.2 / 0.3));
    }

    #[test]
    fn test_top_k_eliminates_beyond_cutoff() {
        let snapshot = build_snapshot(0, &ten_candidates(), Some(&SamplingConfig::top_k(3)));

        let eliminated: Vec<bool> = snapshot.candidates.iter().map(|c| c.eliminated).collect();
        assert_eq!(eliminated, vec![false, false, false, true, true, true, true, true]);
        assert_eq!(snapshot.label, "Top-K (k=3)");
        // selected_token 3 sits at rank 3
        assert!(snapshot.candidates[3].selected);
    }

    #[test]
    fn test_top_p_cumulative_prefix() {
        let snapshot = build_snapshot(0, &ten_candidates(), Some(&SamplingConfig::top_p(0.6)));
        // 0.3 + 0.2 + 0.15 = 0.65 >= 0.6
        let kept = snapshot.candidates.iter().filter(|c| !c.eliminated).count();
        assert_eq!(kept, 3);
    }

    #[test]
    fn test_min_p_relative_threshold() {
        let snapshot = build_snapshot(0, &ten_candidates(), Some(&SamplingConfig::min_p(0.5)));
        // threshold 0.15
        let kept = snapshot.candidates.iter().filter(|c| !c.eliminated).count();
        assert_eq!(kept, 3);
        assert_eq!(snapshot.label, "Min-P (p=0.5)");
    }

    #[test]
    fn test_method_inferred_from_record() {
        let mut payload = ten_candidates();
        payload.sampling_method = "top_k".to_string();
        payload.sampling_params.insert("top_k".to_string(), 2.0);

        let snapshot = build_snapshot(0, &payload, None);
        assert_eq!(snapshot.method, SamplingMethod::TopK);
        assert_eq!(snapshot.label, "Top-K (k=2)");
    }

    #[test]
    fn test_missing_arrays_give_empty_snapshot() {
        let payload = SamplingPayload {
            selected_token: Some(5),
            ..Default::default()
        };
        let snapshot = build_snapshot(4, &payload, Some(&SamplingConfig::top_k(40)));
        assert!(snapshot.candidates.is_empty());
        assert_eq!(snapshot.step_index, 4);
        assert_eq!(snapshot.selected_text, "");
    }

    #[test]
    fn test_unlisted_selection_falls_back_to_first() {
        let payload = step(99, &[(1, "a", 0.6), (2, "b", 0.4)]);
        let snapshot = build_snapshot(0, &payload, Some(&SamplingConfig::top_k(40)));
        assert!(snapshot.candidates[0].selected);
        assert!(!snapshot.candidates[1].selected);
    }

    #[test]
    fn test_layer_breakdown_carried() {
        let mut payload = step(1, &[(1, "a", 1.0)]);
        payload.layer_details = vec![
            LayerDetail {
                layer_id: 0,
                layer_type: "attention".into(),
                operation: "forward".into(),
                execution_time_us: 120,
                ..Default::default()
            },
            LayerDetail {
                layer_id: 1,
                layer_type: "feed_forward".into(),
                operation: "forward".into(),
                execution_time_us: 80,
                ..Default::default()
            },
        ];

        let snapshot = build_snapshot(0, &payload, None);
        assert_eq!(snapshot.layers.len(), 2);
        assert_eq!(snapshot.layers[1].layer_type, "feed_forward");
        assert_eq!(snapshot.layer_time_us, 200);
    }

    #[test]
    fn test_mismatched_arrays_truncate_to_shortest() {
        let payload = SamplingPayload {
            selected_token: Some(1),
            top_tokens: vec![1, 2, 3],
            top_probs: vec![0.5, 0.3],
            top_token_texts: vec!["a".into(), "b".into(), "c".into()],
            ..Default::default()
        };
        assert_eq!(build_snapshot(0, &payload, None).candidates.len(), 2);
    }
}
