//! User-facing notification texts.
//!
//! Pure rendering only; all data is passed in so the functions stay
//! deterministic and testable. The dispatcher and the meeting service are
//! the only callers.

use roundtable_domain::constants::MAX_ROSTER_PREVIEW;
use roundtable_domain::{Meeting, MeetingMember, RecurringSlot, UserId};

fn header_block(meeting: &Meeting) -> String {
    let mut text = format!(
        "Meeting: {}\nLocation: {} - {}",
        meeting.name, meeting.city, meeting.venue
    );
    if let Some(address) = &meeting.venue_address {
        text.push_str(&format!("\nAddress: {address}"));
    }
    text.push_str(&format!(
        "\nDate: {}\nTime: {}",
        meeting.date.format("%A, %d.%m.%Y"),
        meeting.time.format("%H:%M")
    ));
    text
}

fn preference_line(slot: Option<&RecurringSlot>) -> String {
    slot.map(|s| format!("\nTime preference: {}", s.label())).unwrap_or_default()
}

/// Roster preview for the day-before reminder: up to [`MAX_ROSTER_PREVIEW`]
/// other participants, with a count of the remainder.
fn roster_block(roster: &[MeetingMember], recipient: UserId) -> String {
    let others: Vec<&MeetingMember> =
        roster.iter().filter(|member| member.user_id != recipient).collect();
    if others.is_empty() {
        return String::new();
    }

    let mut block = String::from("\n\nOther participants:\n");
    for (index, member) in others.iter().take(MAX_ROSTER_PREVIEW).enumerate() {
        let name = member.display_name.as_deref().unwrap_or("(name not shared)");
        block.push_str(&format!("{}. {}\n", index + 1, name));
    }
    if others.len() > MAX_ROSTER_PREVIEW {
        block.push_str(&format!("...and {} more\n", others.len() - MAX_ROSTER_PREVIEW));
    }
    block
}

/// Reminder sent the day before a confirmed meeting.
pub fn day_before_text(
    meeting: &Meeting,
    slot: Option<&RecurringSlot>,
    roster: &[MeetingMember],
    recipient: UserId,
) -> String {
    format!(
        "Reminder: you have a meeting tomorrow!\n\n{}{}{}\n\nPlease arrive 5-10 minutes early to get settled.\nWe look forward to seeing you there!",
        header_block(meeting),
        preference_line(slot),
        roster_block(roster, recipient),
    )
}

/// Reminder sent roughly one hour before a confirmed meeting.
pub fn hour_before_text(meeting: &Meeting, slot: Option<&RecurringSlot>) -> String {
    format!(
        "Reminder: your meeting starts in about an hour!\n\n{}{}\n\nPlease arrive 5-10 minutes early. Don't be late!",
        header_block(meeting),
        preference_line(slot),
    )
}

/// Sent to every roster member when a meeting is confirmed.
pub fn confirmation_text(meeting: &Meeting) -> String {
    format!(
        "Meeting confirmed: {}\n\n{}\n\nYou'll receive a reminder one day before and one hour before the meeting.",
        meeting.name,
        header_block(meeting),
    )
}

/// Sent to every roster member when a meeting is cancelled.
pub fn cancellation_text(meeting: &Meeting) -> String {
    format!(
        "Meeting cancelled: {}\n\nThe meeting in {} on {} at {} has been cancelled.\nWe apologize for any inconvenience.",
        meeting.name,
        meeting.city,
        meeting.date.format("%A, %d.%m.%Y"),
        meeting.time.format("%H:%M"),
    )
}

/// Sent to the applicant when an administrator decides their application.
pub fn application_decision_text(approved: bool, admin_note: Option<&str>) -> String {
    let mut text = if approved {
        "Your application has been approved!\n\nWe are matching you with other participants; you will be notified when you are added to a meeting.".to_string()
    } else {
        "Unfortunately, your application has not been approved at this time.\n\nYou are welcome to apply again for future meetings.".to_string()
    };
    if let Some(note) = admin_note {
        text.push_str(&format!("\n\nFeedback from the organizer: {note}"));
    }
    text
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime, Utc};
    use roundtable_domain::{MeetingStatus, Weekday};
    use uuid::Uuid;

    use super::*;

    fn meeting() -> Meeting {
        Meeting {
            id: Uuid::new_v4(),
            name: "Berlin roundtable #4".into(),
            date: NaiveDate::from_ymd_opt(2024, 6, 5).unwrap(),
            time: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            city: "Berlin".into(),
            venue: "Cafe Einstein".into(),
            venue_address: Some("Kurfürstenstraße 58".into()),
            status: MeetingStatus::Confirmed,
            created_by: Some(1),
            created_at: Utc::now(),
        }
    }

    fn member(user_id: i64, name: &str) -> MeetingMember {
        MeetingMember {
            meeting_id: Uuid::new_v4(),
            user_id,
            display_name: Some(name.into()),
            joined_at: Utc::now(),
            added_by: None,
        }
    }

    #[test]
    fn day_before_includes_venue_and_roster() {
        let slot = RecurringSlot::new(
            Weekday::Wednesday,
            NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(19, 0, 0).unwrap(),
            "Berlin",
        )
        .unwrap();
        let roster = vec![member(1, "Ada"), member(2, "Grace"), member(3, "Edsger")];

        let text = day_before_text(&meeting(), Some(&slot), &roster, 2);
        assert!(text.contains("meeting tomorrow"));
        assert!(text.contains("Cafe Einstein"));
        assert!(text.contains("Kurfürstenstraße 58"));
        assert!(text.contains("Wednesday 18:00-19:00"));
        assert!(text.contains("Ada"));
        assert!(text.contains("Edsger"));
        // The recipient is not listed back to themselves.
        assert!(!text.contains("Grace"));
    }

    #[test]
    fn roster_preview_is_capped() {
        let roster: Vec<MeetingMember> =
            (1..=8).map(|i| member(i, &format!("Member {i}"))).collect();
        let text = day_before_text(&meeting(), None, &roster, 99);
        assert!(text.contains("Member 5"));
        assert!(!text.contains("Member 6"));
        assert!(text.contains("...and 3 more"));
    }

    #[test]
    fn hour_before_mentions_the_hour() {
        let text = hour_before_text(&meeting(), None);
        assert!(text.contains("in about an hour"));
        assert!(text.contains("18:00"));
        assert!(!text.contains("Time preference"));
    }

    #[test]
    fn decision_text_carries_admin_note() {
        let text = application_decision_text(false, Some("group is full this round"));
        assert!(text.contains("not been approved"));
        assert!(text.contains("group is full this round"));

        let text = application_decision_text(true, None);
        assert!(text.contains("approved"));
        assert!(!text.contains("Feedback"));
    }
}
