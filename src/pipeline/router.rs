//! Routing of extracted documents into a processing status.
//!
//! Rejected is reserved for human reviewers; the pipeline only ever
//! assigns Pending or Validated.

use crate::models::ProcessingStatus;
use crate::pipeline::validation::ValidationOutcome;

/// Decide the initial status for a freshly extracted document.
///
/// Any validation error forces Pending regardless of confidence.
/// Warnings do not block auto-validation.
pub fn derive_status(
    confidence: f32,
    outcome: &ValidationOutcome,
    auto_validate_threshold: f32,
) -> ProcessingStatus {
    if outcome.valid && confidence >= auto_validate_threshold {
        ProcessingStatus::Validated
    } else {
        ProcessingStatus::Pending
    }
}

/// Whether an extraction is clean enough to feed back into the knowledge
/// base as a few-shot example. Stricter than auto-validation only in the
/// confidence bar; warnings do not disqualify here either.
pub fn promotion_eligible(
    confidence: f32,
    outcome: &ValidationOutcome,
    min_promotion_confidence: f32,
) -> bool {
    outcome.valid && outcome.errors.is_empty() && confidence >= min_promotion_confidence
}

#[cfg(test)]
mod tests {
    use super::*;

    const AUTO_THRESHOLD: f32 = 0.8;
    const PROMOTION_THRESHOLD: f32 = 0.85;

    fn clean() -> ValidationOutcome {
        ValidationOutcome {
            valid: true,
            errors: vec![],
            warnings: vec![],
        }
    }

    fn with_errors() -> ValidationOutcome {
        ValidationOutcome {
            valid: false,
            errors: vec!["missing required field: bl_number".into()],
            warnings: vec![],
        }
    }

    fn with_warnings() -> ValidationOutcome {
        ValidationOutcome {
            valid: true,
            errors: vec![],
            warnings: vec!["unparseable date in eta: 'soon'".into()],
        }
    }

    #[test]
    fn high_confidence_clean_extraction_auto_validates() {
        assert_eq!(
            derive_status(0.95, &clean(), AUTO_THRESHOLD),
            ProcessingStatus::Validated
        );
    }

    #[test]
    fn threshold_is_inclusive() {
        assert_eq!(
            derive_status(0.8, &clean(), AUTO_THRESHOLD),
            ProcessingStatus::Validated
        );
        assert_eq!(
            derive_status(0.799, &clean(), AUTO_THRESHOLD),
            ProcessingStatus::Pending
        );
    }

    #[test]
    fn validation_errors_force_pending_at_any_confidence() {
        assert_eq!(
            derive_status(1.0, &with_errors(), AUTO_THRESHOLD),
            ProcessingStatus::Pending
        );
    }

    #[test]
    fn warnings_do_not_block_auto_validation() {
        assert_eq!(
            derive_status(0.9, &with_warnings(), AUTO_THRESHOLD),
            ProcessingStatus::Validated
        );
    }

    #[test]
    fn router_never_rejects() {
        for confidence in [0.0, 0.3, 0.79, 0.8, 0.99, 1.0] {
            for outcome in [clean(), with_errors(), with_warnings()] {
                let status = derive_status(confidence, &outcome, AUTO_THRESHOLD);
                assert_ne!(status, ProcessingStatus::Rejected);
            }
        }
    }

    #[test]
    fn promotion_requires_valid_high_confidence() {
        assert!(promotion_eligible(0.9, &clean(), PROMOTION_THRESHOLD));
        assert!(promotion_eligible(0.85, &clean(), PROMOTION_THRESHOLD));
        assert!(!promotion_eligible(0.84, &clean(), PROMOTION_THRESHOLD));
        assert!(!promotion_eligible(0.99, &with_errors(), PROMOTION_THRESHOLD));
    }

    #[test]
    fn warnings_do_not_block_promotion() {
        assert!(promotion_eligible(0.9, &with_warnings(), PROMOTION_THRESHOLD));
        assert!(!promotion_eligible(0.8, &with_warnings(), PROMOTION_THRESHOLD));
    }
}
