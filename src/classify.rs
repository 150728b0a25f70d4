//! Page-state classification.
//!
//! Re-run from scratch on every tick; transient DOM states during page
//! transitions are tolerated by simply re-polling.

use crate::snapshot::PageSnapshot;

/// What the page is currently showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    /// Nothing lesson-related on screen.
    Idle,
    /// The session-complete screen is up.
    LessonComplete,
    /// A challenge is on screen (or its advance control is ready).
    ChallengeInProgress,
}

impl std::fmt::Display for PageState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PageState::Idle => write!(f, "idle"),
            PageState::LessonComplete => write!(f, "lesson complete"),
            PageState::ChallengeInProgress => write!(f, "challenge in progress"),
        }
    }
}

/// Classify a snapshot. Order matters and first match wins:
///
/// 1. an enabled advance control means we are mid-challenge — finishing the
///    current interaction takes priority over everything else;
/// 2. the completion slide or the between-lessons continue control;
/// 3. a lesson path or any challenge widget;
/// 4. otherwise idle.
pub fn classify(snap: &PageSnapshot) -> PageState {
    if snap.advance_ready() {
        return PageState::ChallengeInProgress;
    }
    if snap.session_complete || snap.continue_button.is_some() {
        return PageState::LessonComplete;
    }
    if snap.path.contains("/lesson") || snap.advance.is_some() || snap.has_challenge_widgets() {
        return PageState::ChallengeInProgress;
    }
    PageState::Idle
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{ChoiceInfo, ElementRef};

    fn advance(enabled: bool) -> ElementRef {
        ElementRef {
            selector: "[data-test=\"player-next\"]".into(),
            enabled,
        }
    }

    fn continue_button() -> ElementRef {
        ElementRef {
            selector: "[data-test=\"continue-button\"]".into(),
            enabled: true,
        }
    }

    fn choice(selector: &str) -> ChoiceInfo {
        ChoiceInfo {
            selector: selector.into(),
            marked_correct: false,
            aria_label: None,
            record: None,
        }
    }

    #[test]
    fn test_blank_page_is_idle() {
        assert_eq!(classify(&PageSnapshot::default()), PageState::Idle);
    }

    #[test]
    fn test_enabled_advance_wins_over_everything() {
        // advance + completion slide + choices all present at once: the
        // ready advance control still takes precedence
        let snap = PageSnapshot {
            advance: Some(advance(true)),
            session_complete: true,
            continue_button: Some(continue_button()),
            choices: vec![choice("c1")],
            ..Default::default()
        };
        assert_eq!(classify(&snap), PageState::ChallengeInProgress);
    }

    #[test]
    fn test_disabled_advance_defers_to_completion() {
        let snap = PageSnapshot {
            advance: Some(advance(false)),
            session_complete: true,
            ..Default::default()
        };
        assert_eq!(classify(&snap), PageState::LessonComplete);
    }

    #[test]
    fn test_continue_button_alone_means_lesson_complete() {
        let snap = PageSnapshot {
            continue_button: Some(continue_button()),
            ..Default::default()
        };
        assert_eq!(classify(&snap), PageState::LessonComplete);
    }

    #[test]
    fn test_lesson_path_means_challenge() {
        let snap = PageSnapshot {
            path: "/lesson/unit-4".into(),
            ..Default::default()
        };
        assert_eq!(classify(&snap), PageState::ChallengeInProgress);
    }

    #[test]
    fn test_disabled_advance_still_means_challenge() {
        // mid-challenge, nothing selected yet: the control exists but is
        // disabled, and there is no completion marker
        let snap = PageSnapshot {
            advance: Some(advance(false)),
            ..Default::default()
        };
        assert_eq!(classify(&snap), PageState::ChallengeInProgress);
    }

    #[test]
    fn test_choices_off_lesson_path_still_mean_challenge() {
        let snap = PageSnapshot {
            path: "/practice".into(),
            choices: vec![choice("c1"), choice("c2")],
            ..Default::default()
        };
        assert_eq!(classify(&snap), PageState::ChallengeInProgress);
    }

    #[test]
    fn test_display() {
        assert_eq!(PageState::Idle.to_string(), "idle");
        assert_eq!(PageState::LessonComplete.to_string(), "lesson complete");
        assert_eq!(
            PageState::ChallengeInProgress.to_string(),
            "challenge in progress"
        );
    }
}
