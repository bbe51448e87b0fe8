// Copyright 2025 Storymesh (https://github.com/storymesh)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Relevance signal primitives.
//!
//! Each function returns a score in `[0, 1]`. The engine blends them with
//! configurable weights; the refiner reuses the overlap and recency
//! signals with different parameters.

use chrono::Duration;
use std::collections::HashSet;

/// Shared distinct keywords as a fraction of the longer raw keyword list.
///
/// Dividing by the longer list penalizes overlap between texts of very
/// different lengths. Duplicates count toward the denominator only.
pub fn keyword_overlap(a: &[String], b: &[String]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let set_a: HashSet<&str> = a.iter().map(String::as_str).collect();
    let set_b: HashSet<&str> = b.iter().map(String::as_str).collect();
    let shared = set_a.intersection(&set_b).count();

    shared as f64 / a.len().max(b.len()) as f64
}

/// Shared distinct keywords as a fraction of the shorter raw keyword list.
///
/// The forgiving variant: a short follow-up question that reuses a few
/// words from a long earlier turn still scores high.
pub fn overlap_coefficient(a: &[String], b: &[String]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let set_a: HashSet<&str> = a.iter().map(String::as_str).collect();
    let set_b: HashSet<&str> = b.iter().map(String::as_str).collect();
    let shared = set_a.intersection(&set_b).count();

    shared as f64 / a.len().min(b.len()) as f64
}

/// Cheap stand-in for embedding similarity: word-set Jaccard blended with
/// a length ratio.
///
/// Words are lowercased whitespace tokens, punctuation intact. Jaccard
/// carries 0.7 of the result and the char-length ratio 0.3, so two texts
/// about the same topic at similar length score highest.
pub fn lexical_similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let lower_a = a.to_lowercase();
    let lower_b = b.to_lowercase();
    let words_a: HashSet<&str> = lower_a.split_whitespace().collect();
    let words_b: HashSet<&str> = lower_b.split_whitespace().collect();

    let shared = words_a.intersection(&words_b).count();
    let union = words_a.len() + words_b.len() - shared;
    let jaccard = if union == 0 {
        0.0
    } else {
        shared as f64 / union as f64
    };

    let len_a = a.chars().count();
    let len_b = b.chars().count();
    let length_ratio = len_a.min(len_b) as f64 / len_a.max(len_b) as f64;

    jaccard * 0.7 + length_ratio * 0.3
}

/// Linear decay from 1 at age zero to 0 at `horizon`, clamped to `[0, 1]`.
///
/// Negative ages (clock skew, future timestamps) score 1.
pub fn recency_score(age: Duration, horizon: Duration) -> f64 {
    let horizon_ms = horizon.num_milliseconds();
    if horizon_ms <= 0 {
        return 0.0;
    }

    let age_ms = age.num_milliseconds();
    (1.0 - age_ms as f64 / horizon_ms as f64).clamp(0.0, 1.0)
}
