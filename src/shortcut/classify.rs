use crate::event::EventType;
use crate::shortcut::{label_present, ActionKind, LabelCheck, StoryDetail, WebhookBody};

/// Maps a webhook plus the fetched story to a lifecycle event.
///
/// A finished story always closes, whatever the actions say. Otherwise a
/// create is `labeled` when it carries the incident label, and an update is
/// `labeled`/`unlabeled` depending on which side of the delta holds it. The
/// adds side is checked first, so a label that is still set on the story
/// reads as `labeled` even when the same update also lists it as removed.
/// Anything else touching the story is `opened`; no create or update at all
/// is `unknown`.
pub fn classify(body: &WebhookBody, story: &StoryDetail, incident_label_id: i64) -> EventType {
    if story.is_done() {
        return EventType::Closed;
    }

    let added = || label_present(&body.actions, incident_label_id, LabelCheck::Adds);

    if body.has_action(ActionKind::Create) {
        return if added() {
            EventType::Labeled
        } else {
            EventType::Opened
        };
    }

    if body.has_action(ActionKind::Update) {
        if added() {
            return EventType::Labeled;
        }
        if label_present(&body.actions, incident_label_id, LabelCheck::Removes) {
            return EventType::Unlabeled;
        }
        return EventType::Opened;
    }

    EventType::Unknown
}
