use super::{EvaluationResult, Verdict};

/// Parses a load value in locale-invariant decimal form.
///
/// Surrounding whitespace is ignored. Non-finite values (`nan`, `inf`) are
/// not loads and yield `None`.
pub fn parse_load(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

/// Classifies a raw reading against the rated capacity.
///
/// `capacity` is `None` while the configured capacity is not a number, in
/// which case every reading is `InvalidValue`.
pub fn evaluate(raw: &str, capacity: Option<f64>) -> EvaluationResult {
    let verdict = match (parse_load(raw), capacity) {
        (Some(load), Some(capacity)) if load <= capacity => Verdict::Success,
        (Some(_), Some(_)) => Verdict::Fail,
        _ => Verdict::InvalidValue,
    };

    EvaluationResult::new(verdict, raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_against_capacity() {
        assert_eq!(evaluate("42.3", Some(50.0)).verdict, Verdict::Success);
        assert_eq!(evaluate("61.0", Some(50.0)).verdict, Verdict::Fail);
        assert_eq!(evaluate("abc", Some(50.0)).verdict, Verdict::InvalidValue);
    }

    #[test]
    fn load_equal_to_capacity_passes() {
        assert_eq!(evaluate("50", Some(50.0)).verdict, Verdict::Success);
        assert_eq!(evaluate("50.0001", Some(50.0)).verdict, Verdict::Fail);
    }

    #[test]
    fn non_numeric_capacity_invalidates_every_reading() {
        let result = evaluate("10", None);
        assert_eq!(result.verdict, Verdict::InvalidValue);
        assert_eq!(result.raw, "10");
    }

    #[test]
    fn non_numeric_text_is_invalid_for_any_capacity() {
        for capacity in [Some(-1.0), Some(0.0), Some(1e9), None] {
            for raw in ["", "abc", "12,5", "1.2.3", "nan", "inf", "--4"] {
                assert_eq!(
                    evaluate(raw, capacity).verdict,
                    Verdict::InvalidValue,
                    "raw={raw:?} capacity={capacity:?}"
                );
            }
        }
    }

    #[test]
    fn success_iff_load_not_above_capacity() {
        let loads = [-5.0, 0.0, 0.01, 12.5, 49.99, 50.0, 50.01, 1000.0];
        let capacities = [0.0, 12.5, 50.0, 999.0];
        for capacity in capacities {
            for load in loads {
                let verdict = evaluate(&load.to_string(), Some(capacity)).verdict;
                let expected = if load <= capacity {
                    Verdict::Success
                } else {
                    Verdict::Fail
                };
                assert_eq!(verdict, expected, "load={load} capacity={capacity}");
            }
        }
    }

    #[test]
    fn tolerates_surrounding_whitespace_and_exponents() {
        assert_eq!(parse_load(" 37.42\r"), Some(37.42));
        assert_eq!(parse_load("1e1"), Some(10.0));
        assert_eq!(parse_load("NaN"), None);
    }

    #[test]
    fn result_labels_match_banner_text() {
        assert_eq!(EvaluationResult::pending().label(), "Pending");
        assert_eq!(evaluate("1", Some(2.0)).label(), "RESULT: SUCCESS");
        assert_eq!(evaluate("3", Some(2.0)).label(), "RESULT: FAIL");
        assert_eq!(evaluate("x", Some(2.0)).label(), "RESULT: Invalid Load Value");
    }
}
