//! Answer capture state machine.
//!
//! Pure state: no I/O happens here. Remote work (scoring, saving) is handed
//! out as tickets stamped with the capture epoch, and results come back
//! through `complete_*` calls that are ignored once the epoch has moved on.

use std::fmt;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::models::interview::QuestionAnswer;
use crate::response_parser::AnswerScore;

/// Answers shorter than this are rejected before any model call.
pub const MIN_ANSWER_CHARS: usize = 30;

const EMPTY_ANSWER_HINT: &str = "Start recording to see your answer here.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureState {
    Idle,
    Recording,
    Scoring,
    Scored,
    Saving,
    Saved,
}

impl fmt::Display for CaptureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CaptureState::Idle => "idle",
            CaptureState::Recording => "recording",
            CaptureState::Scoring => "scoring",
            CaptureState::Scored => "scored",
            CaptureState::Saving => "saving",
            CaptureState::Saved => "saved",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("Cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: CaptureState,
    },

    #[error("Your answer should be more than 30 characters.")]
    AnswerTooShort { length: usize },

    #[error("Invalid feedback data. Please record your answer again.")]
    InvalidFeedback,

    #[error("Transcript from capture {segment} arrived after capture {current} started")]
    StaleSegment { segment: u64, current: u64 },
}

/// Everything the scoring call needs, taken out of the session.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringTicket {
    pub epoch: u64,
    pub question: QuestionAnswer,
    pub user_answer: String,
}

/// Everything the save needs, taken out of the session.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveTicket {
    pub epoch: u64,
    pub interview_id: Uuid,
    pub question: QuestionAnswer,
    pub user_answer: String,
    pub score: AnswerScore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Camera {
    enabled: bool,
    failed: bool,
}

/// One question's capture workflow.
#[derive(Debug, Clone)]
pub struct AnswerCapture {
    pub session_id: Uuid,
    pub interview_id: Uuid,
    pub question_index: usize,
    pub question_count: usize,
    pub question: QuestionAnswer,
    state: CaptureState,
    segments: Vec<String>,
    epoch: u64,
    score: Option<AnswerScore>,
    camera: Camera,
    saved_answer_id: Option<Uuid>,
}

impl AnswerCapture {
    pub fn new(
        session_id: Uuid,
        interview_id: Uuid,
        question_index: usize,
        question_count: usize,
        question: QuestionAnswer,
    ) -> Self {
        Self {
            session_id,
            interview_id,
            question_index,
            question_count,
            question,
            state: CaptureState::Idle,
            segments: Vec::new(),
            epoch: 0,
            score: None,
            camera: Camera {
                enabled: false,
                failed: false,
            },
            saved_answer_id: None,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn score(&self) -> Option<&AnswerScore> {
        self.score.as_ref()
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.state, CaptureState::Scoring | CaptureState::Saving)
    }

    fn require(&self, expected: CaptureState, action: &'static str) -> Result<(), CaptureError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(CaptureError::InvalidTransition {
                action,
                state: self.state,
            })
        }
    }

    /// The accumulated transcript, segments joined by single spaces.
    pub fn answer(&self) -> String {
        self.segments.join(" ")
    }

    /// Idle → Recording. A buffer kept from a rejected attempt keeps growing.
    pub fn start_recording(&mut self) -> Result<u64, CaptureError> {
        self.require(CaptureState::Idle, "start recording")?;
        self.state = CaptureState::Recording;
        Ok(self.epoch)
    }

    /// Appends a transcript segment. Segments tagged with an older epoch
    /// belong to a capture that was reset and are refused.
    pub fn push_segment(&mut self, text: &str, epoch: Option<u64>) -> Result<(), CaptureError> {
        if let Some(segment) = epoch.filter(|e| *e != self.epoch) {
            return Err(CaptureError::StaleSegment {
                segment,
                current: self.epoch,
            });
        }
        self.require(CaptureState::Recording, "add a transcript segment")?;

        let text = text.trim();
        if !text.is_empty() {
            self.segments.push(text.to_string());
        }
        Ok(())
    }

    /// Recording → Scoring, or back to Idle (buffer kept) when the answer is
    /// too short to score.
    pub fn stop_recording(&mut self) -> Result<ScoringTicket, CaptureError> {
        self.require(CaptureState::Recording, "stop recording")?;

        let user_answer = self.answer();
        let length = user_answer.chars().count();
        if length < MIN_ANSWER_CHARS {
            self.state = CaptureState::Idle;
            return Err(CaptureError::AnswerTooShort { length });
        }

        self.state = CaptureState::Scoring;
        Ok(ScoringTicket {
            epoch: self.epoch,
            question: self.question.clone(),
            user_answer,
        })
    }

    /// Scoring → Scored. Returns `false` when the result belongs to a
    /// capture that has since been reset.
    pub fn complete_scoring(&mut self, epoch: u64, score: AnswerScore) -> bool {
        if epoch != self.epoch || self.state != CaptureState::Scoring {
            return false;
        }
        self.score = Some(score);
        self.state = CaptureState::Scored;
        true
    }

    /// Scored → Saving. Empty feedback is refused and the state stays Scored.
    pub fn begin_save(&mut self) -> Result<SaveTicket, CaptureError> {
        self.require(CaptureState::Scored, "save the answer")?;

        let score = match &self.score {
            Some(score) if !score.feedback.trim().is_empty() => score.clone(),
            _ => return Err(CaptureError::InvalidFeedback),
        };

        self.state = CaptureState::Saving;
        Ok(SaveTicket {
            epoch: self.epoch,
            interview_id: self.interview_id,
            question: self.question.clone(),
            user_answer: self.answer(),
            score,
        })
    }

    /// Saving → Saved.
    pub fn complete_save(&mut self, epoch: u64, answer_id: Uuid) -> bool {
        if epoch != self.epoch || self.state != CaptureState::Saving {
            return false;
        }
        self.saved_answer_id = Some(answer_id);
        self.state = CaptureState::Saved;
        true
    }

    /// Saving → Scored, after a duplicate hit or a store failure.
    pub fn abort_save(&mut self, epoch: u64) -> bool {
        if epoch != self.epoch || self.state != CaptureState::Saving {
            return false;
        }
        self.state = CaptureState::Scored;
        true
    }

    /// Hard reset: drop the buffer and any score, move to a new epoch and
    /// restart capture. Results still in flight for the old epoch are
    /// ignored when they land.
    pub fn record_again(&mut self) -> Result<u64, CaptureError> {
        if self.state == CaptureState::Idle && self.segments.is_empty() {
            return Err(CaptureError::InvalidTransition {
                action: "record again",
                state: self.state,
            });
        }
        self.segments.clear();
        self.score = None;
        self.saved_answer_id = None;
        self.epoch += 1;
        self.state = CaptureState::Recording;
        Ok(self.epoch)
    }

    pub fn toggle_camera(&mut self, enabled: bool) {
        self.camera = Camera {
            enabled,
            failed: false,
        };
    }

    /// The browser could not acquire the camera. Recording is unaffected.
    pub fn camera_failed(&mut self) {
        self.camera = Camera {
            enabled: false,
            failed: true,
        };
    }

    pub fn view(&self) -> CaptureView {
        let answer = self.answer();
        CaptureView {
            session_id: self.session_id,
            interview_id: self.interview_id,
            question_index: self.question_index,
            question_count: self.question_count,
            question: self.question.question.clone(),
            state: self.state,
            epoch: self.epoch,
            answer_text: if answer.is_empty() {
                EMPTY_ANSWER_HINT.to_string()
            } else {
                answer
            },
            busy: self.is_busy(),
            record_label: if self.state == CaptureState::Recording {
                "Stop Recording"
            } else {
                "Start Recording"
            },
            can_record_again: !(self.state == CaptureState::Idle && self.segments.is_empty()),
            can_save: self.state == CaptureState::Scored,
            saved_answer_id: self.saved_answer_id,
            camera: CameraView {
                enabled: self.camera.enabled,
                failed: self.camera.failed,
                preview: if self.camera.enabled {
                    CameraPreview::Live
                } else {
                    CameraPreview::Placeholder
                },
                toggle_label: if self.camera.enabled {
                    "Turn Off"
                } else {
                    "Turn On"
                },
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraPreview {
    Live,
    Placeholder,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CameraView {
    pub enabled: bool,
    pub failed: bool,
    pub preview: CameraPreview,
    pub toggle_label: &'static str,
}

/// What the browser renders for a capture session. The score itself stays
/// server-side until the feedback page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaptureView {
    pub session_id: Uuid,
    pub interview_id: Uuid,
    pub question_index: usize,
    pub question_count: usize,
    pub question: String,
    pub state: CaptureState,
    pub epoch: u64,
    pub answer_text: String,
    pub busy: bool,
    pub record_label: &'static str,
    pub can_record_again: bool,
    pub can_save: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_answer_id: Option<Uuid>,
    pub camera: CameraView,
}

#[cfg(test)]
mod tests {
    use super::*;

    const LONG_ANSWER: &str = "Ownership means every value has exactly one owner";

    fn capture() -> AnswerCapture {
        AnswerCapture::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            0,
            2,
            QuestionAnswer::new("What is ownership?", "Each value has a single owner."),
        )
    }

    fn scored() -> AnswerCapture {
        let mut capture = capture();
        capture.start_recording().unwrap();
        capture.push_segment(LONG_ANSWER, None).unwrap();
        let ticket = capture.stop_recording().unwrap();
        assert!(capture.complete_scoring(ticket.epoch, AnswerScore::new(7, "Good")));
        capture
    }

    #[test]
    fn test_segments_join_with_single_spaces() {
        let mut capture = capture();
        capture.start_recording().unwrap();
        capture.push_segment("  Ownership means ", None).unwrap();
        capture.push_segment("", None).unwrap();
        capture.push_segment("one owner", Some(0)).unwrap();
        assert_eq!(capture.answer(), "Ownership means one owner");
    }

    #[test]
    fn test_short_answer_returns_to_idle_keeping_buffer() {
        let mut capture = capture();
        capture.start_recording().unwrap();
        capture.push_segment("Too short", None).unwrap();

        let err = capture.stop_recording().unwrap_err();
        assert_eq!(err, CaptureError::AnswerTooShort { length: 9 });
        assert_eq!(capture.state(), CaptureState::Idle);
        assert_eq!(capture.answer(), "Too short");
        assert!(capture.score().is_none());
    }

    #[test]
    fn test_full_happy_path() {
        let mut capture = scored();
        assert_eq!(capture.state(), CaptureState::Scored);

        let ticket = capture.begin_save().unwrap();
        assert_eq!(ticket.user_answer, LONG_ANSWER);
        assert_eq!(ticket.score.ratings, 7);
        assert!(capture.is_busy());

        let id = Uuid::new_v4();
        assert!(capture.complete_save(ticket.epoch, id));
        assert_eq!(capture.state(), CaptureState::Saved);
        assert_eq!(capture.view().saved_answer_id, Some(id));
    }

    #[test]
    fn test_save_rejected_before_scoring_completes() {
        let mut capture = capture();
        capture.start_recording().unwrap();
        capture.push_segment(LONG_ANSWER, None).unwrap();
        capture.stop_recording().unwrap();
        assert!(capture.is_busy());

        let err = capture.begin_save().unwrap_err();
        assert!(matches!(
            err,
            CaptureError::InvalidTransition {
                state: CaptureState::Scoring,
                ..
            }
        ));
    }

    #[test]
    fn test_empty_feedback_stays_scored() {
        let mut capture = capture();
        capture.start_recording().unwrap();
        capture.push_segment(LONG_ANSWER, None).unwrap();
        let ticket = capture.stop_recording().unwrap();
        capture.complete_scoring(ticket.epoch, AnswerScore::new(5, "  "));

        assert_eq!(capture.begin_save().unwrap_err(), CaptureError::InvalidFeedback);
        assert_eq!(capture.state(), CaptureState::Scored);
    }

    #[test]
    fn test_abort_save_returns_to_scored() {
        let mut capture = scored();
        let ticket = capture.begin_save().unwrap();
        assert!(capture.abort_save(ticket.epoch));
        assert_eq!(capture.state(), CaptureState::Scored);
        assert!(capture.begin_save().is_ok());
    }

    #[test]
    fn test_record_again_discards_late_results() {
        let mut capture = capture();
        capture.start_recording().unwrap();
        capture.push_segment(LONG_ANSWER, None).unwrap();
        let ticket = capture.stop_recording().unwrap();

        let epoch = capture.record_again().unwrap();
        assert_eq!(epoch, ticket.epoch + 1);
        assert_eq!(capture.state(), CaptureState::Recording);
        assert!(capture.answer().is_empty());

        assert!(!capture.complete_scoring(ticket.epoch, AnswerScore::new(9, "late")));
        assert!(capture.score().is_none());
        assert_eq!(
            capture.push_segment("old words", Some(ticket.epoch)),
            Err(CaptureError::StaleSegment {
                segment: ticket.epoch,
                current: epoch
            })
        );
        capture.push_segment("new words", Some(epoch)).unwrap();
        assert_eq!(capture.answer(), "new words");
    }

    #[test]
    fn test_record_again_needs_something_to_reset() {
        let mut capture = capture();
        assert!(capture.record_again().is_err());
        assert!(!capture.view().can_record_again);
    }

    #[test]
    fn test_camera_failure_shows_placeholder() {
        let mut capture = capture();
        capture.toggle_camera(true);
        assert_eq!(capture.view().camera.preview, CameraPreview::Live);
        assert_eq!(capture.view().camera.toggle_label, "Turn Off");

        capture.camera_failed();
        let view = capture.view();
        assert_eq!(view.camera.preview, CameraPreview::Placeholder);
        assert!(view.camera.failed);

        capture.start_recording().unwrap();
        assert_eq!(capture.state(), CaptureState::Recording);
    }

    #[test]
    fn test_view_labels() {
        let mut capture = capture();
        let view = capture.view();
        assert_eq!(view.answer_text, EMPTY_ANSWER_HINT);
        assert_eq!(view.record_label, "Start Recording");
        assert!(!view.can_save);

        capture.start_recording().unwrap();
        assert_eq!(capture.view().record_label, "Stop Recording");
    }
}
