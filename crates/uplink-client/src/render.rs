//! Display region state machine.
//!
//! One region, one active view, replaced wholesale on every transition.
//! The machine holds nothing beyond its state and the rendered contents, so
//! re-applying an identical status is visually a no-op.

use maud::{Markup, PreEscaped, html};
use uplink_protocol::StatusMessage;

/// Localized in-progress text shown while the request is being sent.
const SENDING_TEXT: &str = "Envoi en cours ...";
/// Localized heading for the failure view.
const FAILED_TEXT: &str = "L'envoi a échoué";

/// Lifecycle of one upload as seen by the display region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderState {
    #[default]
    Idle,
    Submitting,
    Updating,
    Complete,
    Failed,
}

impl RenderState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RenderState::Complete | RenderState::Failed)
    }
}

/// Typed events driving the machine. Status pushes and the request's own
/// resolution are distinct variants so transitions can discriminate instead
/// of overwriting blindly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderEvent {
    SubmitStarted,
    Status(StatusMessage),
    UploadCompleted(String),
    UploadFailed(String),
    Reset,
}

/// The single owned mutable rendering target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayRegion {
    contents: String,
}

impl DisplayRegion {
    pub fn contents(&self) -> &str {
        &self.contents
    }

    fn replace(&mut self, contents: String) {
        self.contents = contents;
    }

    fn clear(&mut self) {
        self.contents.clear();
    }
}

/// State machine owning the display region.
#[derive(Debug, Default)]
pub struct RenderStateMachine {
    state: RenderState,
    region: DisplayRegion,
}

impl RenderStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RenderState {
        self.state
    }

    pub fn region(&self) -> &DisplayRegion {
        &self.region
    }

    pub fn contents(&self) -> &str {
        self.region.contents()
    }

    /// A new submission is only permitted from `Idle` or a terminal state.
    pub fn can_submit(&self) -> bool {
        matches!(self.state, RenderState::Idle) || self.state.is_terminal()
    }

    /// Apply one event. Returns whether the event was accepted; ignored
    /// events leave both the state and the region untouched. A `Status`
    /// arriving after a terminal state is ignored: a late push never
    /// overwrites the final result.
    pub fn apply(&mut self, event: RenderEvent) -> bool {
        match (self.state, event) {
            (state, RenderEvent::SubmitStarted) if state == RenderState::Idle || state.is_terminal() => {
                self.state = RenderState::Submitting;
                self.region.replace(sending_view());
                true
            }
            (RenderState::Submitting | RenderState::Updating, RenderEvent::Status(message)) => {
                self.state = RenderState::Updating;
                self.region.replace(status_view(&message));
                true
            }
            (RenderState::Submitting | RenderState::Updating, RenderEvent::UploadCompleted(body)) => {
                self.state = RenderState::Complete;
                // The response body is pre-rendered content, injected verbatim.
                self.region.replace(body);
                true
            }
            (RenderState::Submitting | RenderState::Updating, RenderEvent::UploadFailed(message)) => {
                self.state = RenderState::Failed;
                self.region.replace(failed_view(&message));
                true
            }
            (RenderState::Idle, RenderEvent::Reset) => true,
            (state, RenderEvent::Reset) if state.is_terminal() => {
                self.state = RenderState::Idle;
                self.region.clear();
                true
            }
            _ => false,
        }
    }
}

fn spinner(large: bool) -> Markup {
    html! {
        div class="spinner-border" style=[large.then_some("width: 3rem; height: 3rem;")] role="status" {
            span class="sr-only" { "Loading..." }
        }
    }
}

fn sending_view() -> String {
    let markup = html! {
        div class="text-center" {
            p { (SENDING_TEXT) }
            (spinner(true))
        }
    };
    markup.into_string()
}

fn status_view(message: &StatusMessage) -> String {
    let markup = html! {
        div class="text-center" {
            // Status text is rendered verbatim as HTML, per the channel contract.
            p { (PreEscaped(message.data.as_str())) }
            (spinner(false))
        }
    };
    markup.into_string()
}

fn failed_view(message: &str) -> String {
    let markup = html! {
        div class="text-center" {
            p class="text-danger" { (FAILED_TEXT) }
            p { (message) }
        }
    };
    markup.into_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(data: &str) -> RenderEvent {
        RenderEvent::Status(StatusMessage::new(data))
    }

    #[test]
    fn starts_idle_with_empty_region() {
        let machine = RenderStateMachine::new();
        assert_eq!(machine.state(), RenderState::Idle);
        assert!(machine.contents().is_empty());
        assert!(machine.can_submit());
    }

    #[test]
    fn submit_renders_sending_indicator() {
        let mut machine = RenderStateMachine::new();
        assert!(machine.apply(RenderEvent::SubmitStarted));
        assert_eq!(machine.state(), RenderState::Submitting);
        assert!(machine.contents().contains("Envoi en cours ..."));
        assert!(machine.contents().contains("spinner-border"));
        assert!(!machine.can_submit());
    }

    #[test]
    fn each_status_replaces_the_region_and_keeps_the_indicator() {
        let mut machine = RenderStateMachine::new();
        machine.apply(RenderEvent::SubmitStarted);

        assert!(machine.apply(status("Processing...")));
        assert_eq!(machine.state(), RenderState::Updating);
        assert!(machine.contents().contains("Processing..."));
        assert!(machine.contents().contains("spinner-border"));

        assert!(machine.apply(status("Almost done")));
        assert_eq!(machine.state(), RenderState::Updating);
        assert!(machine.contents().contains("Almost done"));
        assert!(!machine.contents().contains("Processing..."));
    }

    #[test]
    fn status_markup_is_injected_verbatim() {
        let mut machine = RenderStateMachine::new();
        machine.apply(RenderEvent::SubmitStarted);
        machine.apply(status("<b>50%</b>"));
        assert!(machine.contents().contains("<b>50%</b>"));
    }

    #[test]
    fn completion_replaces_the_region_with_the_raw_body() {
        let mut machine = RenderStateMachine::new();
        machine.apply(RenderEvent::SubmitStarted);
        machine.apply(status("Processing..."));
        machine.apply(status("Almost done"));

        let body = "<p>Done: report.pdf</p>".to_string();
        assert!(machine.apply(RenderEvent::UploadCompleted(body.clone())));
        assert_eq!(machine.state(), RenderState::Complete);
        assert_eq!(machine.contents(), body);
    }

    #[test]
    fn completion_straight_from_submitting_is_allowed() {
        let mut machine = RenderStateMachine::new();
        machine.apply(RenderEvent::SubmitStarted);
        assert!(machine.apply(RenderEvent::UploadCompleted("<p>ok</p>".to_string())));
        assert_eq!(machine.state(), RenderState::Complete);
    }

    #[test]
    fn failure_renders_an_error_view_instead_of_a_stuck_spinner() {
        let mut machine = RenderStateMachine::new();
        machine.apply(RenderEvent::SubmitStarted);
        assert!(machine.apply(RenderEvent::UploadFailed("connection refused".to_string())));
        assert_eq!(machine.state(), RenderState::Failed);
        assert!(machine.contents().contains("L'envoi a échoué"));
        assert!(machine.contents().contains("connection refused"));
        assert!(!machine.contents().contains("spinner-border"));
    }

    #[test]
    fn late_status_never_overwrites_a_terminal_result() {
        let mut machine = RenderStateMachine::new();
        machine.apply(RenderEvent::SubmitStarted);
        machine.apply(RenderEvent::UploadCompleted("<p>final</p>".to_string()));

        assert!(!machine.apply(status("stale update")));
        assert_eq!(machine.state(), RenderState::Complete);
        assert_eq!(machine.contents(), "<p>final</p>");

        let mut machine = RenderStateMachine::new();
        machine.apply(RenderEvent::SubmitStarted);
        machine.apply(RenderEvent::UploadFailed("boom".to_string()));
        assert!(!machine.apply(status("stale update")));
        assert_eq!(machine.state(), RenderState::Failed);
    }

    #[test]
    fn status_in_idle_is_ignored() {
        let mut machine = RenderStateMachine::new();
        assert!(!machine.apply(status("nobody asked")));
        assert_eq!(machine.state(), RenderState::Idle);
        assert!(machine.contents().is_empty());
    }

    #[test]
    fn resubmit_is_only_permitted_after_terminal_or_reset() {
        let mut machine = RenderStateMachine::new();
        machine.apply(RenderEvent::SubmitStarted);
        assert!(!machine.can_submit());
        assert!(!machine.apply(RenderEvent::SubmitStarted));

        machine.apply(RenderEvent::UploadCompleted("<p>done</p>".to_string()));
        assert!(machine.can_submit());
        assert!(machine.apply(RenderEvent::SubmitStarted));
        assert_eq!(machine.state(), RenderState::Submitting);
    }

    #[test]
    fn reset_returns_to_idle_and_clears_the_region() {
        let mut machine = RenderStateMachine::new();
        machine.apply(RenderEvent::SubmitStarted);
        machine.apply(RenderEvent::UploadCompleted("<p>done</p>".to_string()));

        assert!(machine.apply(RenderEvent::Reset));
        assert_eq!(machine.state(), RenderState::Idle);
        assert!(machine.contents().is_empty());

        // Reset from Idle is an accepted no-op; reset mid-flight is not.
        assert!(machine.apply(RenderEvent::Reset));
        machine.apply(RenderEvent::SubmitStarted);
        assert!(!machine.apply(RenderEvent::Reset));
        assert_eq!(machine.state(), RenderState::Submitting);
    }

    #[test]
    fn repeated_identical_statuses_are_idempotent() {
        let mut machine = RenderStateMachine::new();
        machine.apply(RenderEvent::SubmitStarted);
        machine.apply(status("Processing..."));
        let first = machine.contents().to_string();
        machine.apply(status("Processing..."));
        assert_eq!(machine.contents(), first);
    }
}
